//! Error types for the analysis pipeline
//!
//! Every failure reaches the caller as one [`PipelineError`], which
//! classifies itself into an [`ErrorKind`]:
//! - input problems (bad folder, no documents)
//! - extraction and table-location failures, naming the document
//! - schema validation failures, listing every violation
//! - collaborator failures, naming the stage
//!
//! Cache failures never appear here; the cache degrades to a miss.

use crate::pipeline::Stage;
use rrr_metrics::{LocateError, ValidationReport};
use serde::Serialize;
use std::path::PathBuf;

/// Main pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Request input is unusable
    #[error("invalid input: {0}")]
    Input(#[from] InputError),

    /// A document could not be read or parsed
    #[error("extraction failed for '{document}': {source}")]
    Extraction {
        /// Document file name
        document: String,
        /// Underlying error
        #[source]
        source: ExtractionError,
    },

    /// A document does not contain the metrics table
    #[error("metrics table not found in '{document}': {source}")]
    Locate {
        /// Document file name
        document: String,
        /// Underlying error
        #[source]
        source: LocateError,
    },

    /// Structured output violates the metric schema
    #[error("structured metrics failed validation: {0}")]
    Validation(ValidationReport),

    /// A downstream collaborator failed
    #[error("{stage} failed: {source}")]
    Collaborator {
        /// Stage that called the collaborator
        stage: Stage,
        /// Underlying error
        #[source]
        source: CollaboratorError,
    },

    /// Worker task died
    #[error("worker failure: {0}")]
    Worker(String),
}

impl PipelineError {
    /// Wrap a collaborator failure with its stage
    #[inline]
    #[must_use]
    pub fn collaborator(stage: Stage, source: CollaboratorError) -> Self {
        Self::Collaborator { stage, source }
    }

    /// Classification of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) => ErrorKind::Input,
            Self::Extraction { .. } | Self::Locate { .. } => ErrorKind::Extraction,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Collaborator { .. } => ErrorKind::Collaborator,
            Self::Worker(_) => ErrorKind::Internal,
        }
    }

    /// Document the error concerns, if any
    #[must_use]
    pub fn document(&self) -> Option<&str> {
        match self {
            Self::Extraction { document, .. } | Self::Locate { document, .. } => Some(document),
            Self::Input(InputError::Unreadable { path, .. }) => {
                path.file_name().and_then(|n| n.to_str())
            }
            _ => None,
        }
    }

    /// Machine-readable details
    #[must_use]
    pub fn details(&self) -> Vec<String> {
        match self {
            Self::Validation(report) => report.errors().iter().map(ToString::to_string).collect(),
            _ => Vec::new(),
        }
    }
}

/// Coarse error classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller supplied something unusable
    Input,
    /// A document could not be processed
    Extraction,
    /// Structured output failed the schema
    Validation,
    /// A collaborator failed
    Collaborator,
    /// Bug or runtime failure
    Internal,
}

impl ErrorKind {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Extraction => "extraction",
            Self::Validation => "validation",
            Self::Collaborator => "collaborator",
            Self::Internal => "internal",
        }
    }

    /// HTTP status for this class
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Input => 400,
            Self::Extraction | Self::Validation => 422,
            Self::Collaborator => 502,
            Self::Internal => 500,
        }
    }

    /// Whether the caller is at fault
    #[inline]
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        matches!(self, Self::Input | Self::Extraction | Self::Validation)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Problems with the request itself
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// No folder given
    #[error("folder path is empty")]
    EmptyPath,

    /// Folder does not exist
    #[error("folder not found: {}", .0.display())]
    FolderNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Folder holds no PDF documents
    #[error("no PDF documents found in {}", .0.display())]
    NoDocuments(PathBuf),

    /// A document or the folder could not be read
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Document extraction failures
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// File could not be read
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not a readable PDF
    #[error("pdf parsing failed: {0}")]
    Pdf(String),

    /// Extractor panicked
    #[error("extractor panicked")]
    Panicked,
}

/// Collaborator (LLM, renderer) failures
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// Transport-level failure
    #[error("request failed: {0}")]
    Request(String),

    /// Non-success response
    #[error("service returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Response could not be interpreted
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Local filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Collaborator is not configured
    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Status {
                status: status.as_u16(),
                body: e.to_string(),
            },
            None => Self::Request(e.to_string()),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rrr_metrics::{ValidationError, START_MARKER};

    #[test]
    fn kinds_map_to_statuses() {
        let input = PipelineError::from(InputError::EmptyPath);
        assert_eq!(input.kind(), ErrorKind::Input);
        assert_eq!(input.kind().http_status(), 400);

        let validation =
            PipelineError::Validation(ValidationReport::new(vec![ValidationError::MissingMetrics]));
        assert_eq!(validation.kind(), ErrorKind::Validation);
        assert_eq!(validation.details(), vec!["missing top-level 'metrics' key".to_string()]);

        let collab = PipelineError::collaborator(
            Stage::Structuring,
            CollaboratorError::Malformed("no json".into()),
        );
        assert_eq!(collab.kind(), ErrorKind::Collaborator);
        assert!(!collab.kind().is_client_error());
        assert_eq!(collab.to_string(), "structuring failed: malformed response: no json");
    }

    #[test]
    fn locate_errors_name_document_and_marker() {
        let err = PipelineError::Locate {
            document: "RRR_25.1.pdf".into(),
            source: LocateError::MarkerNotFound {
                marker: START_MARKER.into(),
            },
        };
        assert_eq!(err.kind(), ErrorKind::Extraction);
        assert_eq!(err.document(), Some("RRR_25.1.pdf"));
        assert!(err.to_string().contains(START_MARKER));
    }
}
