//! Schema validator
//!
//! Checks untrusted structured output against the fixed metric schema and, if
//! every rule holds, produces the typed [`MetricsDocument`]. All violations
//! are collected; validation never stops at the first one.
//!
//! Rules:
//! 1. `metrics` is present and is a mapping
//! 2. every split metric holds a mapping with `ATLS` and `BTLS`
//! 3. every numeric series has at least [`MIN_SERIES_LEN`] well-formed items
//!    and at least one non-zero value
//! 4. the UAT metric holds every required client, each with a well-formed
//!    pass/fail series containing at least one non-zero count
//! 5. every flat metric is present and checked as in rule 3

use crate::path::FieldPath;
use crate::schema::{
    ClientPoint, MetricPoint, MetricSeries, MetricsDocument, SplitSeries, Status, CLIENT_METRIC,
    FLAT_METRICS, REQUIRED_CLIENTS, SPLIT_METRICS,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};

/// Minimum number of readings in any series
pub const MIN_SERIES_LEN: usize = 2;

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No top-level `metrics` key
    #[error("missing top-level 'metrics' key")]
    MissingMetrics,

    /// `metrics` is not a mapping
    #[error("'metrics' must be a mapping, found {found}")]
    MetricsNotObject {
        /// JSON type found instead
        found: &'static str,
    },

    /// An expected metric is absent
    #[error("missing metric '{metric}'")]
    MissingMetric {
        /// Metric name
        metric: String,
    },

    /// A split metric lacks ATLS or BTLS
    #[error("metric '{metric}' is missing sub-series '{sub}'")]
    MissingSubSeries {
        /// Metric name
        metric: String,
        /// `ATLS` or `BTLS`
        sub: String,
    },

    /// The UAT metric lacks a required client
    #[error("metric '{metric}' is missing client '{client}'")]
    MissingClient {
        /// Metric name
        metric: String,
        /// Client name
        client: String,
    },

    /// A value has the wrong JSON type
    #[error("{path}: expected {expected}, found {found}")]
    WrongShape {
        /// Location
        path: FieldPath,
        /// Expected shape
        expected: &'static str,
        /// JSON type found instead
        found: &'static str,
    },

    /// A series is too short
    #[error("{path}: expected at least {min} entries, found {found}")]
    TooFewEntries {
        /// Location
        path: FieldPath,
        /// Required minimum
        min: usize,
        /// Actual length
        found: usize,
    },

    /// Every reading in a series is zero
    #[error("{path}: every entry is zero")]
    AllZero {
        /// Location
        path: FieldPath,
    },

    /// Missing or blank version label
    #[error("{path}: missing or empty version")]
    InvalidVersion {
        /// Location
        path: FieldPath,
    },

    /// Missing, non-numeric or negative `value`
    #[error("{path}: invalid value ({reason})")]
    InvalidValue {
        /// Location
        path: FieldPath,
        /// What is wrong
        reason: &'static str,
    },

    /// Missing, fractional or negative pass/fail count
    #[error("{path}: invalid count ({reason})")]
    InvalidCount {
        /// Location
        path: FieldPath,
        /// What is wrong
        reason: &'static str,
    },

    /// Status outside the allowed set
    #[error("{path}: invalid status '{found}'")]
    InvalidStatus {
        /// Location
        path: FieldPath,
        /// Raw status text
        found: String,
    },
}

impl ValidationError {
    /// Schema rule (1–5) this error belongs to
    #[must_use]
    pub fn rule(&self) -> u8 {
        match self {
            Self::MissingMetrics | Self::MetricsNotObject { .. } => 1,
            Self::MissingSubSeries { .. } => 2,
            Self::MissingClient { .. } => 4,
            Self::MissingMetric { metric } => {
                if FLAT_METRICS.contains(&metric.as_str()) {
                    5
                } else if metric == CLIENT_METRIC {
                    4
                } else {
                    2
                }
            }
            Self::WrongShape { path, .. }
            | Self::TooFewEntries { path, .. }
            | Self::AllZero { path }
            | Self::InvalidVersion { path }
            | Self::InvalidValue { path, .. }
            | Self::InvalidCount { path, .. }
            | Self::InvalidStatus { path, .. } => {
                // paths are rooted at `metrics.<name>`
                if path.key_at(1) == Some(CLIENT_METRIC) {
                    4
                } else {
                    3
                }
            }
        }
    }
}

/// Every violation found in a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport(Vec<ValidationError>);

impl ValidationReport {
    /// Wrap a list of errors
    #[inline]
    #[must_use]
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }

    /// Violations in discovery order
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// Number of violations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the report is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the list of violations
    #[inline]
    #[must_use]
    pub fn into_errors(self) -> Vec<ValidationError> {
        self.0
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} schema violation(s)", self.0.len())?;
        for (i, e) in self.0.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { "; " })?;
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

impl IntoIterator for ValidationReport {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Check `doc` against the schema
///
/// # Errors
/// Returns a report listing every violation.
pub fn validate(doc: &Value) -> Result<(), ValidationReport> {
    parse(doc).map(|_| ())
}

pub(crate) fn parse(doc: &Value) -> Result<MetricsDocument, ValidationReport> {
    let mut collector = Collector::default();
    match collector.document(doc) {
        Some(parsed) if collector.errors.is_empty() => Ok(parsed),
        _ => Err(ValidationReport(collector.errors)),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

#[derive(Default)]
struct Collector {
    errors: Vec<ValidationError>,
}

impl Collector {
    fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    fn document(&mut self, doc: &Value) -> Option<MetricsDocument> {
        let Some(metrics) = doc.as_object().and_then(|root| root.get("metrics")) else {
            self.push(ValidationError::MissingMetrics);
            return None;
        };
        let Some(metrics) = metrics.as_object() else {
            self.push(ValidationError::MetricsNotObject {
                found: type_name(metrics),
            });
            return None;
        };

        let base = FieldPath::root().key("metrics");
        let mut out = IndexMap::new();

        for name in SPLIT_METRICS {
            let Some(value) = self.require(metrics, name) else {
                continue;
            };
            if let Some(series) = self.split(&base.key(name), name, value) {
                out.insert(name.to_string(), MetricSeries::Split(series));
            }
        }

        if let Some(value) = self.require(metrics, CLIENT_METRIC) {
            if let Some(clients) = self.clients(&base.key(CLIENT_METRIC), value) {
                out.insert(CLIENT_METRIC.to_string(), MetricSeries::Client(clients));
            }
        }

        for name in FLAT_METRICS {
            let Some(value) = self.require(metrics, name) else {
                continue;
            };
            if let Some(points) = self.points(&base.key(name), value) {
                out.insert(name.to_string(), MetricSeries::Flat(points));
            }
        }

        Some(MetricsDocument { metrics: out })
    }

    fn require<'a>(&mut self, metrics: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
        let value = metrics.get(name);
        if value.is_none() {
            self.push(ValidationError::MissingMetric {
                metric: name.to_string(),
            });
        }
        value
    }

    fn mapping<'a>(
        &mut self,
        path: &FieldPath,
        value: &'a Value,
        expected: &'static str,
    ) -> Option<&'a Map<String, Value>> {
        let map = value.as_object();
        if map.is_none() {
            self.push(ValidationError::WrongShape {
                path: path.clone(),
                expected,
                found: type_name(value),
            });
        }
        map
    }

    fn sequence<'a>(&mut self, path: &FieldPath, value: &'a Value) -> Option<&'a Vec<Value>> {
        let items = value.as_array();
        match items {
            None => self.push(ValidationError::WrongShape {
                path: path.clone(),
                expected: "sequence",
                found: type_name(value),
            }),
            Some(items) if items.len() < MIN_SERIES_LEN => {
                self.push(ValidationError::TooFewEntries {
                    path: path.clone(),
                    min: MIN_SERIES_LEN,
                    found: items.len(),
                });
            }
            Some(_) => {}
        }
        items
    }

    fn split(&mut self, path: &FieldPath, metric: &str, value: &Value) -> Option<SplitSeries> {
        let map = self.mapping(path, value, "mapping with ATLS and BTLS")?;
        let sub = |collector: &mut Self, key: &str| match map.get(key) {
            Some(series) => collector.points(&path.key(key), series),
            None => {
                collector.push(ValidationError::MissingSubSeries {
                    metric: metric.to_string(),
                    sub: key.to_string(),
                });
                None
            }
        };
        let atls = sub(self, "ATLS");
        let btls = sub(self, "BTLS");
        Some(SplitSeries {
            atls: atls?,
            btls: btls?,
        })
    }

    fn clients(
        &mut self,
        path: &FieldPath,
        value: &Value,
    ) -> Option<IndexMap<String, Vec<ClientPoint>>> {
        let map = self.mapping(path, value, "mapping of clients")?;
        let mut out = IndexMap::new();
        let mut complete = true;
        for client in REQUIRED_CLIENTS {
            match map.get(client) {
                Some(series) => match self.client_points(&path.key(client), series) {
                    Some(points) => {
                        out.insert(client.to_string(), points);
                    }
                    None => complete = false,
                },
                None => {
                    complete = false;
                    self.push(ValidationError::MissingClient {
                        metric: CLIENT_METRIC.to_string(),
                        client: client.to_string(),
                    });
                }
            }
        }
        complete.then_some(out)
    }

    fn points(&mut self, path: &FieldPath, value: &Value) -> Option<Vec<MetricPoint>> {
        let items = self.sequence(path, value)?;
        let before = self.errors.len();
        let points: Vec<MetricPoint> = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| self.point(&path.index(i), item))
            .collect();
        let items_ok = self.errors.len() == before;
        if items_ok && !points.is_empty() && points.iter().all(|p| p.value == 0.0) {
            self.push(ValidationError::AllZero { path: path.clone() });
        }
        (items_ok && items.len() >= MIN_SERIES_LEN).then_some(points)
    }

    fn client_points(&mut self, path: &FieldPath, value: &Value) -> Option<Vec<ClientPoint>> {
        let items = self.sequence(path, value)?;
        let before = self.errors.len();
        let points: Vec<ClientPoint> = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| self.client_point(&path.index(i), item))
            .collect();
        let items_ok = self.errors.len() == before;
        if items_ok
            && !points.is_empty()
            && points.iter().all(|p| p.pass_count == 0 && p.fail_count == 0)
        {
            self.push(ValidationError::AllZero { path: path.clone() });
        }
        (items_ok && items.len() >= MIN_SERIES_LEN).then_some(points)
    }

    fn point(&mut self, path: &FieldPath, item: &Value) -> Option<MetricPoint> {
        let obj = self.mapping(path, item, "mapping")?;
        let version = self.version(path, obj);
        let value = match obj.get("value").and_then(Value::as_f64) {
            Some(v) if v >= 0.0 => Some(v),
            Some(_) => self.invalid_value(path, "negative"),
            None if obj.contains_key("value") => self.invalid_value(path, "not a number"),
            None => self.invalid_value(path, "missing"),
        };
        let status = self.status(path, obj);
        Some(MetricPoint {
            version: version?,
            value: value?,
            status: status?,
            trend: trend_text(obj),
        })
    }

    fn client_point(&mut self, path: &FieldPath, item: &Value) -> Option<ClientPoint> {
        let obj = self.mapping(path, item, "mapping")?;
        let version = self.version(path, obj);
        let pass_count = self.count(path, obj, "pass_count");
        let fail_count = self.count(path, obj, "fail_count");
        let status = self.status(path, obj);
        Some(ClientPoint {
            version: version?,
            pass_count: pass_count?,
            fail_count: fail_count?,
            status: status?,
            trend: trend_text(obj),
        })
    }

    fn version(&mut self, path: &FieldPath, obj: &Map<String, Value>) -> Option<String> {
        let version = match obj.get("version") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            // Models sometimes emit `25.1` as a bare number.
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        if version.is_none() {
            self.push(ValidationError::InvalidVersion {
                path: path.key("version"),
            });
        }
        version
    }

    fn invalid_value<T>(&mut self, path: &FieldPath, reason: &'static str) -> Option<T> {
        self.push(ValidationError::InvalidValue {
            path: path.key("value"),
            reason,
        });
        None
    }

    fn count(&mut self, path: &FieldPath, obj: &Map<String, Value>, field: &str) -> Option<u64> {
        let raw = obj.get(field);
        let reason = match raw {
            Some(v) if v.as_u64().is_some() => return v.as_u64(),
            Some(v) if v.as_i64().is_some_and(|n| n < 0) => "negative",
            Some(v) if v.as_f64().is_some_and(|n| n < 0.0) => "negative",
            Some(v) if v.is_number() => "not an integer",
            Some(_) => "not a number",
            None => "missing",
        };
        self.push(ValidationError::InvalidCount {
            path: path.key(field),
            reason,
        });
        None
    }

    fn status(&mut self, path: &FieldPath, obj: &Map<String, Value>) -> Option<Status> {
        let raw = obj.get("status");
        let parsed = raw.and_then(Value::as_str).and_then(|s| s.parse().ok());
        if parsed.is_none() {
            self.push(ValidationError::InvalidStatus {
                path: path.key("status"),
                found: match raw {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => "<missing>".to_string(),
                },
            });
        }
        parsed
    }
}

fn trend_text(obj: &Map<String, Value>) -> Option<String> {
    obj.get("trend").and_then(Value::as_str).map(str::to_string)
}
