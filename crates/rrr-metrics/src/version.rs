//! Release version labels
//!
//! Versions such as `25.1`, `25.10` or `1.0.3` compare numerically segment by
//! segment; labels that are not dotted numbers fall back to string order.

use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;

fn version_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\d+(?:\.\d+)+").ok())
        .as_ref()
}

fn numeric_segments(version: &str) -> Option<Vec<u64>> {
    let trimmed = version.trim().trim_start_matches(['v', 'V']);
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .split('.')
        .map(|segment| segment.parse::<u64>().ok())
        .collect()
}

/// Compare two version labels
///
/// Numeric labels order before non-numeric ones; missing trailing segments
/// count as zero (`1.0` == `1.0.0`), with the raw string as a tie breaker so
/// the order stays total.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (numeric_segments(a), numeric_segments(b)) {
        (Some(x), Some(y)) => {
            let len = x.len().max(y.len());
            (0..len)
                .map(|i| {
                    let l = x.get(i).copied().unwrap_or(0);
                    let r = y.get(i).copied().unwrap_or(0);
                    l.cmp(&r)
                })
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(b))
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Derive a version label from a document name
///
/// Takes the first dotted number (`RRR_25.1_final.pdf` → `25.1`), falling back
/// to the name without its extension.
#[must_use]
pub fn version_from_name(name: &str) -> String {
    if let Some(m) = version_pattern().and_then(|re| re.find(name)) {
        return m.as_str().to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn numeric_segments_compare_numerically() {
        assert_eq!(compare_versions("25.2", "25.10"), Ordering::Less);
        assert_eq!(compare_versions("1.1", "1.0"), Ordering::Greater);
        assert_eq!(compare_versions("v2.0", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.0", "1.0"), Ordering::Equal);
    }

    #[test]
    fn shorter_version_is_padded() {
        assert_eq!(compare_versions("1.0", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn numeric_before_free_form() {
        assert_eq!(compare_versions("9.9", "beta"), Ordering::Less);
        assert_eq!(compare_versions("alpha", "beta"), Ordering::Less);
    }

    #[test]
    fn version_from_file_names() {
        assert_eq!(version_from_name("RRR_25.1.pdf"), "25.1");
        assert_eq!(version_from_name("release-1.10.2-final.PDF"), "1.10.2");
        assert_eq!(version_from_name("baseline.pdf"), "baseline");
        assert_eq!(version_from_name("noext"), "noext");
    }

    proptest! {
        #[test]
        fn comparison_is_antisymmetric(a in "[0-9]{1,3}(\\.[0-9]{1,3}){0,2}", b in "[0-9]{1,3}(\\.[0-9]{1,3}){0,2}") {
            prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
        }

        #[test]
        fn sorting_yields_ascending_numeric_majors(mut majors in proptest::collection::vec(0u64..500, 1..20)) {
            let mut labels: Vec<String> = majors.iter().map(|m| format!("{m}.0")).collect();
            labels.sort_by(|a, b| compare_versions(a, b));
            majors.sort_unstable();
            let expected: Vec<String> = majors.iter().map(|m| format!("{m}.0")).collect();
            prop_assert_eq!(labels, expected);
        }
    }
}
