//! Trend engine
//!
//! Classifies the movement between two consecutive readings as up, down or
//! flat. Series passed to the annotators must already be in ascending version
//! order; nothing here sorts.

use crate::schema::{ClientPoint, MetricPoint};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Absolute change below which two readings are considered equal
pub const FLAT_ABS_EPSILON: f64 = 0.01;

/// Relative change (in percent) below which a movement is considered flat
pub const FLAT_PCT_THRESHOLD: f64 = 1.0;

/// Direction of change between two readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "direction", content = "percent", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    /// Increase by the given percentage
    Up(f64),
    /// Decrease by the given percentage
    Down(f64),
    /// No meaningful change
    Flat,
}

impl Trend {
    /// Magnitude in percent, `None` for [`Trend::Flat`]
    #[inline]
    #[must_use]
    pub fn percent(&self) -> Option<f64> {
        match self {
            Self::Up(p) | Self::Down(p) => Some(*p),
            Self::Flat => None,
        }
    }

    /// Whether this is [`Trend::Flat`]
    #[inline]
    #[must_use]
    pub fn is_flat(&self) -> bool {
        matches!(self, Self::Flat)
    }
}

impl Display for Trend {
    /// `↑ (10%)`, `↓ (12.5%)` or `→`
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up(p) => write!(f, "↑ ({}%)", format_percent(*p)),
            Self::Down(p) => write!(f, "↓ ({}%)", format_percent(*p)),
            Self::Flat => f.write_str("→"),
        }
    }
}

fn format_percent(p: f64) -> String {
    let rounded = format!("{p:.1}");
    rounded
        .strip_suffix(".0")
        .map_or(rounded.clone(), str::to_string)
}

/// Classify the change from `previous` to `current`
#[must_use]
pub fn trend(current: f64, previous: f64) -> Trend {
    if previous == 0.0 || (current - previous).abs() < FLAT_ABS_EPSILON {
        return Trend::Flat;
    }
    let pct = (current - previous) / previous * 100.0;
    if pct.abs() < FLAT_PCT_THRESHOLD {
        Trend::Flat
    } else if pct > 0.0 {
        Trend::Up(pct.abs())
    } else {
        Trend::Down(pct.abs())
    }
}

/// Pass rate in percent; zero when no tests ran
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pass_rate(pass_count: u64, fail_count: u64) -> f64 {
    let total = pass_count.saturating_add(fail_count);
    if total == 0 {
        0.0
    } else {
        pass_count as f64 / total as f64 * 100.0
    }
}

/// Set `trend` on every point but the first, pairing consecutive readings
pub fn annotate_series(points: &mut [MetricPoint]) {
    if let Some(first) = points.first_mut() {
        first.trend = None;
    }
    for i in 1..points.len() {
        let label = trend(points[i].value, points[i - 1].value);
        points[i].trend = Some(label.to_string());
    }
}

/// Set `trend` on every client point but the first, using pass rates
pub fn annotate_client_series(points: &mut [ClientPoint]) {
    if let Some(first) = points.first_mut() {
        first.trend = None;
    }
    for i in 1..points.len() {
        let current = pass_rate(points[i].pass_count, points[i].fail_count);
        let previous = pass_rate(points[i - 1].pass_count, points[i - 1].fail_count);
        points[i].trend = Some(trend(current, previous).to_string());
    }
}
