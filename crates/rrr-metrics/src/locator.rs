//! Table locator
//!
//! Carves the critical-metrics table out of raw report text using two literal
//! header markers.

use std::fmt::{self, Display, Formatter};

/// Header that opens the critical-metrics table in a release-readiness report
pub const START_MARKER: &str = "Release Readiness Critical Metrics (Previous/Current):";

/// Header of the section that follows the metrics table
pub const END_MARKER: &str = "Release Readiness Functional teams Deliverables Checklist:";

/// A trimmed span of report text bounded by the start and end markers
///
/// The span starts with the start marker itself and stops right before the
/// end marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMetricsTable {
    text: String,
    marker_len: usize,
}

impl RawMetricsTable {
    /// Full table text, start marker included
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Table content without the start marker
    #[inline]
    #[must_use]
    pub fn body(&self) -> &str {
        self.text.get(self.marker_len..).unwrap_or_default().trim()
    }

    /// Consume into the full table text
    #[inline]
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

impl Display for RawMetricsTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Errors produced while locating the metrics table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    /// A marker does not occur anywhere in the text
    #[error("marker not found: '{marker}'")]
    MarkerNotFound {
        /// The missing marker
        marker: String,
    },

    /// The end marker does not come after the start marker
    #[error("marker order error: '{end}' appears before '{start}'")]
    MarkerOrder {
        /// Start marker
        start: String,
        /// End marker
        end: String,
    },

    /// Nothing but whitespace between the markers
    #[error("empty metrics table between '{start}' and '{end}'")]
    EmptyTable {
        /// Start marker
        start: String,
        /// End marker
        end: String,
    },
}

impl LocateError {
    /// Marker named by this error (the start marker for order/empty errors)
    #[must_use]
    pub fn marker(&self) -> &str {
        match self {
            Self::MarkerNotFound { marker } => marker,
            Self::MarkerOrder { start, .. } | Self::EmptyTable { start, .. } => start,
        }
    }
}

/// Locate the table between `start_marker` and `end_marker`
///
/// Both markers are searched from the beginning of `text`; the first
/// occurrence of each wins.
///
/// # Errors
/// - [`LocateError::MarkerNotFound`] if either marker is absent
/// - [`LocateError::MarkerOrder`] if the end marker does not follow the
///   start marker
/// - [`LocateError::EmptyTable`] if only whitespace sits between them
pub fn locate(
    text: &str,
    start_marker: &str,
    end_marker: &str,
) -> Result<RawMetricsTable, LocateError> {
    let start = text
        .find(start_marker)
        .ok_or_else(|| LocateError::MarkerNotFound {
            marker: start_marker.to_string(),
        })?;
    let end = text
        .find(end_marker)
        .ok_or_else(|| LocateError::MarkerNotFound {
            marker: end_marker.to_string(),
        })?;

    // The end marker must begin after the start marker has fully ended.
    if end < start + start_marker.len() {
        return Err(LocateError::MarkerOrder {
            start: start_marker.to_string(),
            end: end_marker.to_string(),
        });
    }

    let table = RawMetricsTable {
        text: text[start..end].trim().to_string(),
        marker_len: start_marker.trim_start().len(),
    };

    if table.body().is_empty() {
        return Err(LocateError::EmptyTable {
            start: start_marker.to_string(),
            end: end_marker.to_string(),
        });
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const START: &str = "BEGIN TABLE:";
    const END: &str = "END TABLE:";

    #[test]
    fn locate_returns_trimmed_table() {
        let text = "intro\nBEGIN TABLE:\n  row 1\n  row 2\n\nEND TABLE: trailer";
        let table = locate(text, START, END).unwrap();
        assert_eq!(table.text(), "BEGIN TABLE:\n  row 1\n  row 2");
        assert_eq!(table.body(), "row 1\n  row 2");
    }

    #[test]
    fn locate_with_report_markers() {
        let text = format!("{START_MARKER}\nDefects 10 8\n{END_MARKER}\nChecklist");
        let table = locate(&text, START_MARKER, END_MARKER).unwrap();
        assert!(table.text().starts_with(START_MARKER));
        assert_eq!(table.body(), "Defects 10 8");
    }

    #[test]
    fn missing_start_marker() {
        let err = locate("rows\nEND TABLE:", START, END).unwrap_err();
        assert_eq!(
            err,
            LocateError::MarkerNotFound {
                marker: START.to_string()
            }
        );
    }

    #[test]
    fn missing_end_marker() {
        let err = locate("BEGIN TABLE: rows", START, END).unwrap_err();
        assert_eq!(
            err,
            LocateError::MarkerNotFound {
                marker: END.to_string()
            }
        );
    }

    #[test]
    fn reversed_markers_fail() {
        let err = locate("END TABLE: rows BEGIN TABLE: more", START, END).unwrap_err();
        assert!(matches!(err, LocateError::MarkerOrder { .. }));
    }

    #[test]
    fn end_marker_found_before_start_even_if_repeated_later() {
        // The end marker is taken from the whole text, not from after the start.
        let text = "END TABLE: BEGIN TABLE: rows END TABLE:";
        assert!(matches!(
            locate(text, START, END),
            Err(LocateError::MarkerOrder { .. })
        ));
    }

    #[test]
    fn whitespace_only_table_is_empty() {
        let err = locate("BEGIN TABLE:  \n\t END TABLE:", START, END).unwrap_err();
        assert!(matches!(err, LocateError::EmptyTable { .. }));
    }

    #[test]
    fn adjacent_markers_are_empty() {
        let err = locate("BEGIN TABLE:END TABLE:", START, END).unwrap_err();
        assert!(matches!(err, LocateError::EmptyTable { .. }));
    }

    #[test]
    fn error_names_marker() {
        let err = locate("", START, END).unwrap_err();
        assert_eq!(err.marker(), START);
        assert!(err.to_string().contains("BEGIN TABLE:"));
    }

    fn filler() -> impl Strategy<Value = String> {
        "[a-z0-9 \n]{0,40}"
    }

    fn content() -> impl Strategy<Value = String> {
        "[a-z0-9 \n]{0,20}[a-z0-9][a-z0-9 \n]{0,20}"
    }

    proptest! {
        #[test]
        fn well_formed_text_yields_content(prefix in filler(), body in content(), suffix in filler()) {
            let text = format!("{prefix}{START}{body}{END}{suffix}");
            let table = locate(&text, START, END).unwrap();
            prop_assert_eq!(table.body(), body.trim());
            let expected = format!("{START}{body}");
            prop_assert_eq!(table.text(), expected.trim());
        }

        #[test]
        fn missing_marker_is_reported(prefix in filler(), body in content()) {
            let no_end = format!("{prefix}{START}{body}");
            let no_start = format!("{prefix}{body}{END}");
            prop_assert_eq!(
                locate(&no_end, START, END).unwrap_err(),
                LocateError::MarkerNotFound { marker: END.to_string() }
            );
            prop_assert_eq!(
                locate(&no_start, START, END).unwrap_err(),
                LocateError::MarkerNotFound { marker: START.to_string() }
            );
        }

        #[test]
        fn reversed_markers_never_yield_table(prefix in filler(), body in content(), suffix in filler()) {
            let text = format!("{prefix}{END}{body}{START}{suffix}");
            prop_assert!(locate(&text, START, END).is_err());
        }
    }
}
