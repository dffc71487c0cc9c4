//! Collaborator seams
//!
//! The pipeline never talks to PDFs, language models or chart libraries
//! directly; it calls these traits. Production adapters live in
//! [`crate::pdf`], [`crate::llm`] and [`crate::render`].

use crate::config::PipelineConfig;
use crate::error::{CollaboratorError, ExtractionError};
use crate::llm::{AzureChatClient, ChatClient, ChatOptions, LlmJudge, LlmReportWriter, LlmStructurer};
use crate::pdf::PdfExtractor;
use crate::render::SvgRenderer;
use crate::types::{Evaluation, ExtractedDocument, Visualization};
use async_trait::async_trait;
use rrr_metrics::MetricsDocument;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

/// Pulls text and hyperlinks out of one document
///
/// Extraction is blocking and CPU bound; the pipeline runs it on the
/// extraction pool, never on the async runtime.
pub trait DocumentExtractor: Send + Sync + Debug + 'static {
    /// Extract `path`
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, ExtractionError>;
}

/// Turns located table text into an untrusted metrics object
#[async_trait]
pub trait Structurer: Send + Sync + Debug {
    /// Structure `source_text` covering the given release `versions`
    async fn structure(
        &self,
        source_text: &str,
        versions: &[String],
    ) -> Result<serde_json::Value, CollaboratorError>;
}

/// Writes the narrative report
#[async_trait]
pub trait ReportWriter: Send + Sync + Debug {
    /// Markdown report for validated metrics
    async fn write_report(&self, metrics: &MetricsDocument) -> Result<String, CollaboratorError>;
}

/// Scores a report against its source
#[async_trait]
pub trait Evaluator: Send + Sync + Debug {
    /// Judge `report` against `source_text`
    async fn evaluate(
        &self,
        source_text: &str,
        report: &str,
    ) -> Result<Evaluation, CollaboratorError>;
}

/// Draws charts for validated metrics
#[async_trait]
pub trait Renderer: Send + Sync + Debug {
    /// Render every chart into `chart_set`, replacing whatever an earlier
    /// render of the same set produced; other sets are left untouched
    async fn render(
        &self,
        chart_set: &str,
        metrics: &MetricsDocument,
    ) -> Result<Vec<Visualization>, CollaboratorError>;
}

/// The full set of collaborators a pipeline runs with
#[derive(Debug, Clone)]
pub struct Collaborators {
    /// Document extraction
    pub extractor: Arc<dyn DocumentExtractor>,
    /// Structuring
    pub structurer: Arc<dyn Structurer>,
    /// Report writing
    pub report_writer: Arc<dyn ReportWriter>,
    /// Report evaluation
    pub evaluator: Arc<dyn Evaluator>,
    /// Chart rendering
    pub renderer: Arc<dyn Renderer>,
}

impl Collaborators {
    /// Production wiring: PDF extraction, Azure OpenAI for structuring,
    /// reporting and judging, SVG charts
    ///
    /// # Errors
    /// [`CollaboratorError::NotConfigured`] if the LLM settings are
    /// incomplete.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, CollaboratorError> {
        let client: Arc<dyn ChatClient> = Arc::new(AzureChatClient::new(&config.llm)?);
        let generation = ChatOptions::generation(&config.llm);
        Ok(Self {
            extractor: Arc::new(PdfExtractor),
            structurer: Arc::new(LlmStructurer::new(Arc::clone(&client), generation)),
            report_writer: Arc::new(LlmReportWriter::new(Arc::clone(&client), generation)),
            evaluator: Arc::new(LlmJudge::new(client, ChatOptions::judge(&config.llm))),
            renderer: Arc::new(SvgRenderer::new(
                config.visualizations_dir.clone(),
                config.visualizations_url.clone(),
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_wiring_requires_llm_settings() {
        let config = PipelineConfig::default();
        assert!(matches!(
            Collaborators::from_config(&config),
            Err(CollaboratorError::NotConfigured(_))
        ));

        let mut config = PipelineConfig::default();
        config.llm.endpoint = "https://llm.example".into();
        config.llm.deployment = "gpt-4o".into();
        config.llm.api_key = Some("secret".into());
        assert!(Collaborators::from_config(&config).is_ok());
    }
}
