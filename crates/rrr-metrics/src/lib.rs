//! RRR Metrics
//!
//! Pure, deterministic building blocks for release-readiness analysis.
//!
//! # Core Concepts
//!
//! - [`locate`]: carves the metrics table out of extracted report text
//! - [`MetricsDocument`]: the fixed metric schema as a tagged union of
//!   split / flat / client series
//! - [`validate`] / [`MetricsDocument::from_value`]: the trust boundary for
//!   structured output
//! - [`trend`]: directional trend classification between two readings
//!
//! # Example
//!
//! ```rust,ignore
//! use rrr_metrics::{locate, MetricsDocument, START_MARKER, END_MARKER};
//!
//! let table = locate(&text, START_MARKER, END_MARKER)?;
//! let doc = MetricsDocument::from_value(&structured)?;
//! ```

#![warn(unreachable_pub)]

// Core modules
mod locator;
mod path;
mod schema;
mod trend;
mod validator;
mod version;

// Re-exports
pub use locator::{locate, LocateError, RawMetricsTable, END_MARKER, START_MARKER};
pub use path::FieldPath;
pub use schema::{
    ClientPoint, MetricKind, MetricPoint, MetricSeries, MetricsDocument, SplitSeries, Status,
    StatusParseError, CLIENT_METRIC, FLAT_METRICS, REQUIRED_CLIENTS, SPLIT_METRICS,
};
pub use trend::{
    annotate_client_series, annotate_series, pass_rate, trend, Trend, FLAT_ABS_EPSILON,
    FLAT_PCT_THRESHOLD,
};
pub use validator::{validate, ValidationError, ValidationReport, MIN_SERIES_LEN};
pub use version::{compare_versions, version_from_name};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
