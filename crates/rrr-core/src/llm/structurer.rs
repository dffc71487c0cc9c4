use super::{prompts, recover_json, ChatClient, ChatOptions};
use crate::collaborator::Structurer;
use crate::error::CollaboratorError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// [`Structurer`] backed by a chat model
#[derive(Debug, Clone)]
pub struct LlmStructurer {
    client: Arc<dyn ChatClient>,
    options: ChatOptions,
}

impl LlmStructurer {
    /// Structurer using `client` with the given sampling settings
    #[must_use]
    pub fn new(client: Arc<dyn ChatClient>, options: ChatOptions) -> Self {
        Self { client, options }
    }
}

#[async_trait]
impl Structurer for LlmStructurer {
    async fn structure(
        &self,
        source_text: &str,
        versions: &[String],
    ) -> Result<Value, CollaboratorError> {
        let prompt = prompts::structure_prompt(source_text, versions);
        let raw = self.client.complete(&prompt, self.options).await?;
        tracing::debug!(chars = raw.len(), "structurer replied");
        recover_json(&raw).ok_or_else(|| {
            let preview: String = raw.chars().take(200).collect();
            CollaboratorError::Malformed(format!("no JSON object in structurer output: {preview}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tests_support::Scripted;
    use serde_json::json;

    #[tokio::test]
    async fn recovers_fenced_json() {
        let client = Scripted::replying("Here:\n```json\n{\"metrics\": {}}\n```");
        let structurer = LlmStructurer::new(client.clone(), ChatOptions::default());
        let value = structurer.structure("text", &["1.0".into()]).await.unwrap();
        assert_eq!(value, json!({"metrics": {}}));
        assert!(client.last_prompt().contains("Release versions: 1.0"));
    }

    #[tokio::test]
    async fn prose_only_is_malformed() {
        let structurer =
            LlmStructurer::new(Scripted::replying("I cannot help"), ChatOptions::default());
        assert!(matches!(
            structurer.structure("text", &[]).await,
            Err(CollaboratorError::Malformed(_))
        ));
    }
}
