//! Cache errors
//!
//! Every cache failure is recoverable from the pipeline's point of view: a
//! failed read is a miss and a failed write only means the next identical
//! request computes again.

/// Errors from the cache store and its backends
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// SQLite failure
    #[error("cache storage error during {operation}: {source}")]
    Storage {
        /// What was being attempted
        operation: &'static str,
        /// Underlying error
        #[source]
        source: rusqlite::Error,
    },

    /// Filesystem failure, e.g. creating the database directory
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload could not be encoded or decoded
    #[error("cache payload encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Blocking task panicked or was cancelled
    #[error("cache task failed: {0}")]
    Task(String),

    /// Backend refused the operation
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

impl CacheError {
    /// Wrap a SQLite error with the operation that produced it
    #[inline]
    #[must_use]
    pub fn storage(operation: &'static str, source: rusqlite::Error) -> Self {
        Self::Storage { operation, source }
    }
}

/// Result alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
