use super::{prompts, ChatClient, ChatOptions};
use crate::collaborator::ReportWriter;
use crate::error::CollaboratorError;
use async_trait::async_trait;
use rrr_metrics::MetricsDocument;
use std::sync::Arc;

/// [`ReportWriter`] backed by a chat model
#[derive(Debug, Clone)]
pub struct LlmReportWriter {
    client: Arc<dyn ChatClient>,
    options: ChatOptions,
}

impl LlmReportWriter {
    /// Report writer using `client`
    #[must_use]
    pub fn new(client: Arc<dyn ChatClient>, options: ChatOptions) -> Self {
        Self { client, options }
    }
}

#[async_trait]
impl ReportWriter for LlmReportWriter {
    async fn write_report(&self, metrics: &MetricsDocument) -> Result<String, CollaboratorError> {
        let json = serde_json::to_string_pretty(metrics)
            .map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
        let raw = self
            .client
            .complete(&prompts::report_prompt(&json), self.options)
            .await?;
        let report = strip_code_fences(&raw);
        if report.is_empty() {
            return Err(CollaboratorError::Malformed("empty report".into()));
        }
        Ok(report.to_string())
    }
}

/// Drop a wrapping ```` ``` ```` / ```` ```markdown ```` fence, if present
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string ("markdown", "md", ...) on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tests_support::Scripted;

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_code_fences("```markdown\n# Report\n```"), "# Report");
        assert_eq!(strip_code_fences("```\n| a |\n```\n"), "| a |");
        assert_eq!(strip_code_fences("  # Plain  "), "# Plain");
    }

    #[tokio::test]
    async fn empty_reply_is_malformed() {
        let writer = LlmReportWriter::new(Scripted::replying("```\n```"), ChatOptions::default());
        let metrics = MetricsDocument {
            metrics: indexmap::IndexMap::new(),
        };
        assert!(matches!(
            writer.write_report(&metrics).await,
            Err(CollaboratorError::Malformed(_))
        ));
    }
}
