//! RRR Core - release-readiness analysis pipeline
//!
//! Turns a folder of release-readiness PDFs into validated, trend-annotated
//! metrics, a markdown report, a judged quality score and SVG charts:
//! - extraction runs on a bounded worker pool
//! - the metrics table is located by marker text and structured by an LLM
//! - structured output is validated against the fixed metric schema
//! - complete results are cached by folder and document content
//!
//! # Example
//!
//! ```rust,ignore
//! use rrr_core::{Collaborators, Pipeline, PipelineConfig};
//! use rrr_cache::CacheStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::load(None)?;
//! let cache = Arc::new(CacheStore::open(&config.cache)?);
//! let pipeline = Pipeline::new(config.clone(), Collaborators::from_config(&config)?, cache);
//!
//! let response = pipeline.analyze("reports/25.x").await?;
//! println!("{} ({:?})", response.payload.evaluation.score, response.cache.status);
//! # Ok(())
//! # }
//! ```

pub mod collaborator;
pub mod config;
pub mod discovery;
pub mod error;
pub mod llm;
pub mod pdf;
pub mod pipeline;
pub mod pool;
pub mod render;
pub mod types;

pub use collaborator::{
    Collaborators, DocumentExtractor, Evaluator, Renderer, ReportWriter, Structurer,
};
pub use config::{
    ConfigError, LlmConfig, PipelineConfig, ENV_LLM_API_KEY, ENV_LLM_API_VERSION,
    ENV_LLM_DEPLOYMENT, ENV_LLM_ENDPOINT,
};
pub use discovery::{discover_documents, display_name};
pub use error::{
    CollaboratorError, ErrorKind, ExtractionError, InputError, PipelineError, Result,
};
pub use llm::{AzureChatClient, ChatClient, ChatOptions, LlmJudge, LlmReportWriter, LlmStructurer};
pub use pdf::{PdfExtractor, LINK_CONTEXT_CHARS};
pub use pipeline::{order_and_annotate, Pipeline, Stage};
pub use pool::{ExtractionPool, PoolStats};
pub use render::SvgRenderer;
pub use types::{
    AnalysisPayload, AnalysisResponse, CacheInfo, Evaluation, ExtractedDocument, Hyperlink,
    ScoreBand, Visualization,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
