//! Core data types for the analysis pipeline

use chrono::{DateTime, Utc};
use rrr_cache::CacheStatus;
use rrr_metrics::MetricsDocument;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A link annotation found in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperlink {
    /// Target URI
    pub url: String,
    /// Page text surrounding the link
    pub context: String,
    /// 1-based page number
    pub page: u32,
    /// File name of the document
    pub source_file: String,
}

/// Text and links pulled out of one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// File name
    pub name: String,
    /// Full text
    pub text: String,
    /// Link annotations in page order
    pub hyperlinks: Vec<Hyperlink>,
}

/// Quality band of an evaluation score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    /// Above 75
    Good,
    /// Above 50
    Fair,
    /// 50 or below
    Poor,
}

impl ScoreBand {
    /// Band for a 0–100 score
    #[must_use]
    pub const fn of(score: u8) -> Self {
        if score > 75 {
            Self::Good
        } else if score > 50 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

/// Independent judgement of a generated report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Score, 0–100
    pub score: u8,
    /// Short free-text verdict
    pub evaluation: String,
    /// Band the score falls in
    pub band: ScoreBand,
}

impl Evaluation {
    /// Build from a score and verdict, clamping the score to 0–100
    #[must_use]
    pub fn new(score: i64, evaluation: impl Into<String>) -> Self {
        let score = u8::try_from(score.clamp(0, 100)).unwrap_or(100);
        Self {
            score,
            evaluation: evaluation.into(),
            band: ScoreBand::of(score),
        }
    }
}

/// A rendered chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visualization {
    /// Metric the chart shows
    pub metric: String,
    /// Path relative to the visualizations directory
    pub file_name: String,
    /// URL the chart is served under
    pub url: String,
}

/// Everything produced by one analysis; this is what gets cached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    /// Validated, sorted and trend-annotated metrics
    pub metrics: MetricsDocument,
    /// Markdown report
    pub report: String,
    /// Rendered charts
    pub visualizations: Vec<Visualization>,
    /// Judge verdict on the report
    pub evaluation: Evaluation,
    /// Links found across all documents
    pub hyperlinks: Vec<Hyperlink>,
}

/// Cache details attached to a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    /// Hit or miss
    pub status: CacheStatus,
    /// Abbreviated cache key
    pub key: String,
    /// When the payload was computed
    pub created_at: DateTime<Utc>,
}

/// Result of analysing one folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// The analysis
    #[serde(flatten)]
    pub payload: AnalysisPayload,
    /// Where it came from
    pub cache: CacheInfo,
}

impl AnalysisResponse {
    /// Whether this response was served from the cache
    #[inline]
    #[must_use]
    pub fn is_hit(&self) -> bool {
        self.cache.status == CacheStatus::Hit
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bands() {
        assert_eq!(ScoreBand::of(76), ScoreBand::Good);
        assert_eq!(ScoreBand::of(75), ScoreBand::Fair);
        assert_eq!(ScoreBand::of(51), ScoreBand::Fair);
        assert_eq!(ScoreBand::of(50), ScoreBand::Poor);
    }

    #[test]
    fn evaluation_clamps() {
        assert_eq!(Evaluation::new(140, "x").score, 100);
        assert_eq!(Evaluation::new(-3, "x").score, 0);
        assert_eq!(Evaluation::new(88, "x").band, ScoreBand::Good);
    }
}
