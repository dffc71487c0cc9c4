//! Field paths for locating schema violations
//!
//! Provides [`FieldPath`] for addressing a value inside a structured metrics
//! document, e.g. `metrics."Open Security Defects".ATLS[1].value`.

use std::fmt::{self, Display, Formatter};

/// One step in a [`FieldPath`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Path to a value within a metrics document
///
/// Paths are built fluently and rendered in a dotted form with quoted keys
/// when a key contains characters other than alphanumerics and `_`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    /// Empty path (document root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Extend with an object key
    #[inline]
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Key(key.into()));
        Self(segments)
    }

    /// Extend with a sequence index
    #[inline]
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(index));
        Self(segments)
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root path
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First key segment, i.e. the top-level field
    #[must_use]
    pub fn first_key(&self) -> Option<&str> {
        self.0.iter().find_map(|s| match s {
            Segment::Key(k) => Some(k.as_str()),
            Segment::Index(_) => None,
        })
    }

    /// Key at segment `position`, `None` if that segment is an index or absent
    #[must_use]
    pub fn key_at(&self, position: usize) -> Option<&str> {
        match self.0.get(position)? {
            Segment::Key(k) => Some(k.as_str()),
            Segment::Index(_) => None,
        }
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("$");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(k) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    if k.chars().all(|c| c.is_alphanumeric() || c == '_') {
                        f.write_str(k)?;
                    } else {
                        write!(f, "\"{k}\"")?;
                    }
                }
                Segment::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_display() {
        assert_eq!(FieldPath::root().to_string(), "$");
        assert!(FieldPath::root().is_empty());
    }

    #[test]
    fn nested_display_quotes_spaced_keys() {
        let path = FieldPath::root()
            .key("metrics")
            .key("Open Security Defects")
            .key("ATLS")
            .index(1)
            .key("value");
        assert_eq!(
            path.to_string(),
            "metrics.\"Open Security Defects\".ATLS[1].value"
        );
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn builders_do_not_mutate_parent() {
        let parent = FieldPath::root().key("metrics");
        let child = parent.key("x");
        assert_eq!(parent.len(), 1);
        assert_eq!(child.len(), 2);
        assert_eq!(child.first_key(), Some("metrics"));
    }
}
