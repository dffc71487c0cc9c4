//! Fixed release-readiness metric schema
//!
//! The schema is product specific: eleven named metrics, each with a known
//! series shape. [`MetricsDocument`] is only ever built through the validator,
//! so a value of this type always satisfies the schema rules.

use crate::validator::{self, ValidationReport};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Defect-class metrics split into ATLS and BTLS sub-series
pub const SPLIT_METRICS: [&str; 5] = [
    "Open ALL RRR Defects",
    "Open Security Defects",
    "All Open Defects (T-1)",
    "All Security Open Defects",
    "Load/Performance",
];

/// Customer acceptance testing metric, keyed by client
pub const CLIENT_METRIC: &str = "Customer Specific Testing (UAT)";

/// Clients every UAT series must report
pub const REQUIRED_CLIENTS: [&str; 3] = ["RBS", "Tesco", "Belk"];

/// Coverage and rate metrics with a single series
pub const FLAT_METRICS: [&str; 5] = [
    "E2E Test Coverage",
    "Automation Test Coverage",
    "Unit Test Coverage",
    "Defect Closure Rate",
    "Regression Issues",
];

/// Shape of a metric's series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// `{"ATLS": [...], "BTLS": [...]}`
    Split,
    /// `[...]`
    Flat,
    /// `{"<client>": [...], ...}`
    Client,
}

impl MetricKind {
    /// Expected shape for a metric name, `None` for names outside the schema
    #[must_use]
    pub fn of(name: &str) -> Option<Self> {
        if SPLIT_METRICS.contains(&name) {
            Some(Self::Split)
        } else if FLAT_METRICS.contains(&name) {
            Some(Self::Flat)
        } else if name == CLIENT_METRIC {
            Some(Self::Client)
        } else {
            None
        }
    }

    /// All schema metric names in canonical order
    pub fn all_names() -> impl Iterator<Item = &'static str> {
        SPLIT_METRICS
            .iter()
            .copied()
            .chain(std::iter::once(CLIENT_METRIC))
            .chain(FLAT_METRICS.iter().copied())
    }
}

/// Release status of a single reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// No concerns
    OnTrack,
    /// Watch closely
    MediumRisk,
    /// Blocks release readiness
    Risk,
    /// Needs a human look
    NeedsReview,
}

impl Status {
    /// Canonical wire form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnTrack => "ON_TRACK",
            Self::MediumRisk => "MEDIUM_RISK",
            Self::Risk => "RISK",
            Self::NeedsReview => "NEEDS_REVIEW",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: '{0}'")]
pub struct StatusParseError(pub String);

impl FromStr for Status {
    type Err = StatusParseError;

    /// Case-insensitive; spaces and hyphens count as underscores, so
    /// `"Medium Risk"` parses as [`Status::MediumRisk`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();
        match normalized.as_str() {
            "ON_TRACK" => Ok(Self::OnTrack),
            "MEDIUM_RISK" => Ok(Self::MediumRisk),
            "RISK" => Ok(Self::Risk),
            "NEEDS_REVIEW" => Ok(Self::NeedsReview),
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}

/// A numeric reading for one release version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Release version label, e.g. `"25.1"`
    pub version: String,
    /// Non-negative reading
    pub value: f64,
    /// Release status
    pub status: Status,
    /// Rendered trend against the previous version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<String>,
}

/// A pass/fail reading for one client and release version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPoint {
    /// Release version label
    pub version: String,
    /// Passed test cases
    pub pass_count: u64,
    /// Failed test cases
    pub fail_count: u64,
    /// Release status
    pub status: Status,
    /// Rendered pass-rate trend against the previous version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<String>,
}

/// ATLS / BTLS pair of series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSeries {
    /// Above-the-line support series
    #[serde(rename = "ATLS")]
    pub atls: Vec<MetricPoint>,
    /// Below-the-line support series
    #[serde(rename = "BTLS")]
    pub btls: Vec<MetricPoint>,
}

/// One metric's data, in the shape its [`MetricKind`] dictates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricSeries {
    /// ATLS / BTLS split
    Split(SplitSeries),
    /// Per-client pass/fail series
    Client(IndexMap<String, Vec<ClientPoint>>),
    /// Single series
    Flat(Vec<MetricPoint>),
}

impl MetricSeries {
    /// Shape of this series
    #[inline]
    #[must_use]
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Split(_) => MetricKind::Split,
            Self::Client(_) => MetricKind::Client,
            Self::Flat(_) => MetricKind::Flat,
        }
    }

    /// Number of readings across all sub-series
    #[must_use]
    pub fn point_count(&self) -> usize {
        match self {
            Self::Split(s) => s.atls.len() + s.btls.len(),
            Self::Client(clients) => clients.values().map(Vec::len).sum(),
            Self::Flat(points) => points.len(),
        }
    }
}

/// Validated, typed metrics document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsDocument {
    /// Metric name → series, in canonical schema order
    pub metrics: IndexMap<String, MetricSeries>,
}

impl MetricsDocument {
    /// Validate untrusted structured output and convert it
    ///
    /// # Errors
    /// Returns every schema violation found in `value`.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ValidationReport> {
        validator::parse(value)
    }

    /// Look up a metric by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MetricSeries> {
        self.metrics.get(name)
    }

    /// Split series for a defect-class metric
    #[must_use]
    pub fn split(&self, name: &str) -> Option<&SplitSeries> {
        match self.metrics.get(name) {
            Some(MetricSeries::Split(s)) => Some(s),
            _ => None,
        }
    }

    /// Flat series for a coverage/rate metric
    #[must_use]
    pub fn flat(&self, name: &str) -> Option<&[MetricPoint]> {
        match self.metrics.get(name) {
            Some(MetricSeries::Flat(points)) => Some(points),
            _ => None,
        }
    }

    /// Per-client series of the UAT metric
    #[must_use]
    pub fn clients(&self) -> Option<&IndexMap<String, Vec<ClientPoint>>> {
        match self.metrics.get(CLIENT_METRIC) {
            Some(MetricSeries::Client(c)) => Some(c),
            _ => None,
        }
    }

    /// Distinct version labels present anywhere in the document
    #[must_use]
    pub fn versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = Vec::new();
        let mut push = |v: &str| {
            if !versions.iter().any(|seen| seen == v) {
                versions.push(v.to_string());
            }
        };
        for series in self.metrics.values() {
            match series {
                MetricSeries::Split(s) => {
                    s.atls.iter().chain(&s.btls).for_each(|p| push(&p.version));
                }
                MetricSeries::Client(c) => {
                    c.values().flatten().for_each(|p| push(&p.version));
                }
                MetricSeries::Flat(points) => points.iter().for_each(|p| push(&p.version)),
            }
        }
        versions.sort_by(|a, b| crate::version::compare_versions(a, b));
        versions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eleven_metrics_in_schema() {
        assert_eq!(MetricKind::all_names().count(), 11);
        assert_eq!(MetricKind::of("Load/Performance"), Some(MetricKind::Split));
        assert_eq!(MetricKind::of(CLIENT_METRIC), Some(MetricKind::Client));
        assert_eq!(MetricKind::of("Unit Test Coverage"), Some(MetricKind::Flat));
        assert_eq!(MetricKind::of("Velocity"), None);
    }

    #[test]
    fn status_parse_normalizes() {
        assert_eq!("ON_TRACK".parse::<Status>().unwrap(), Status::OnTrack);
        assert_eq!("Medium Risk".parse::<Status>().unwrap(), Status::MediumRisk);
        assert_eq!("needs-review".parse::<Status>().unwrap(), Status::NeedsReview);
        assert_eq!(" risk ".parse::<Status>().unwrap(), Status::Risk);
        assert!("HIGH RISK".parse::<Status>().is_err());
    }

    #[test]
    fn status_serde_uses_wire_form() {
        let json = serde_json::to_string(&Status::MediumRisk).unwrap();
        assert_eq!(json, "\"MEDIUM_RISK\"");
        assert_eq!(Status::NeedsReview.to_string(), "NEEDS_REVIEW");
    }

    #[test]
    fn untagged_series_deserialize_by_shape() {
        let split: MetricSeries = serde_json::from_str(
            r#"{"ATLS":[{"version":"1.0","value":1,"status":"RISK"}],"BTLS":[]}"#,
        )
        .unwrap();
        assert_eq!(split.kind(), MetricKind::Split);

        let client: MetricSeries = serde_json::from_str(
            r#"{"RBS":[{"version":"1.0","pass_count":3,"fail_count":1,"status":"ON_TRACK"}]}"#,
        )
        .unwrap();
        assert_eq!(client.kind(), MetricKind::Client);
        assert_eq!(client.point_count(), 1);

        let flat: MetricSeries = serde_json::from_str(
            r#"[{"version":"1.0","value":80.5,"status":"ON_TRACK","trend":"→"}]"#,
        )
        .unwrap();
        assert_eq!(flat.kind(), MetricKind::Flat);
    }
}
