//! Content hashing primitives
//!
//! Provides [`ContentHash`], the 32-byte Blake3 digest both halves of a
//! [`CacheKey`](crate::CacheKey) are built from.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte content hash (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Wrap raw digest bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Build from a byte slice
    ///
    /// # Errors
    /// Returns [`HashError::InvalidLength`] unless the slice is exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| HashError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Blake3 digest of `data`
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Order-independent digest over a set of byte strings
    ///
    /// Each part is hashed on its own, the part digests are sorted and the
    /// result is the digest of their concatenation, so reordering the parts
    /// never changes the outcome.
    #[must_use]
    pub fn combine_unordered<I, B>(parts: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        Self::fold_sorted(
            parts
                .into_iter()
                .map(|part| Self::compute(part.as_ref()))
                .collect(),
        )
    }

    /// Digest of a named byte string: `name || 0x00 || data`
    #[must_use]
    pub fn compute_named(name: &str, data: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
        hasher.update(data);
        Self(*hasher.finalize().as_bytes())
    }

    /// Order-independent digest over named byte strings
    ///
    /// Like [`combine_unordered`](Self::combine_unordered), but each part's
    /// name is hashed with it, so renaming a part changes the outcome.
    #[must_use]
    pub fn combine_named<I, N, B>(parts: I) -> Self
    where
        I: IntoIterator<Item = (N, B)>,
        N: AsRef<str>,
        B: AsRef<[u8]>,
    {
        Self::fold_sorted(
            parts
                .into_iter()
                .map(|(name, data)| Self::compute_named(name.as_ref(), data.as_ref()))
                .collect(),
        )
    }

    fn fold_sorted(mut digests: Vec<Self>) -> Self {
        digests.sort_unstable();
        let mut hasher = blake3::Hasher::new();
        for digest in &digests {
            hasher.update(digest.as_bytes());
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// First 16 hex characters, for logs
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slice(&hex::decode(s)?)
    }
}

impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let hex = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        hex.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors parsing a [`ContentHash`]
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Wrong number of bytes
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Required length
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// Not valid hex
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn compute_is_deterministic() {
        assert_eq!(ContentHash::compute(b"rrr"), ContentHash::compute(b"rrr"));
        assert_ne!(ContentHash::compute(b"rrr"), ContentHash::compute(b"rrs"));
    }

    #[test]
    fn display_parses_back() {
        let hash = ContentHash::compute(b"report");
        let parsed: ContentHash = hash.to_string().parse().unwrap();
        assert_eq!(hash, parsed);
        assert!(hash.to_string().starts_with(&hash.short()));
        assert_eq!(hash.short().len(), 16);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        assert!(matches!(
            ContentHash::from_slice(&[0u8; 31]),
            Err(HashError::InvalidLength { expected: 32, actual: 31 })
        ));
    }

    #[test]
    fn serde_uses_hex_string() {
        let hash = ContentHash::compute(b"x");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{hash}\""));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn combine_depends_on_every_part() {
        let a = ContentHash::combine_unordered([b"one".as_slice(), b"two"]);
        let b = ContentHash::combine_unordered([b"one".as_slice(), b"tw0"]);
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn combine_ignores_order(mut parts in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 1..8)) {
            let forward = ContentHash::combine_unordered(&parts);
            parts.reverse();
            prop_assert_eq!(forward, ContentHash::combine_unordered(&parts));
        }
    }
}
