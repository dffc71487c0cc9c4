//! Composite cache keys

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Key of one cached analysis
///
/// Pairs a hash of the normalized folder path with an order-independent
/// digest of every input document's bytes. The same folder spelled with a
/// different case, separator style or trailing slash maps to the same key;
/// changing any byte of any document yields a different one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    folder: ContentHash,
    content: ContentHash,
}

impl CacheKey {
    /// Assemble from precomputed halves
    #[inline]
    #[must_use]
    pub const fn new(folder: ContentHash, content: ContentHash) -> Self {
        Self { folder, content }
    }

    /// Key for `folder` containing `documents`
    #[must_use]
    pub fn compute<I, B>(folder: &str, documents: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        Self {
            folder: ContentHash::compute(normalize_folder(folder).as_bytes()),
            content: ContentHash::combine_unordered(documents),
        }
    }

    /// Key for `folder` containing `(file name, bytes)` documents
    ///
    /// File names are part of the content digest: renaming a document
    /// yields a different key even when its bytes are unchanged.
    #[must_use]
    pub fn compute_named<I, N, B>(folder: &str, documents: I) -> Self
    where
        I: IntoIterator<Item = (N, B)>,
        N: AsRef<str>,
        B: AsRef<[u8]>,
    {
        Self {
            folder: ContentHash::compute(normalize_folder(folder).as_bytes()),
            content: ContentHash::combine_named(documents),
        }
    }

    /// Folder-path component
    #[inline]
    #[must_use]
    pub const fn folder(&self) -> &ContentHash {
        &self.folder
    }

    /// Document-content component
    #[inline]
    #[must_use]
    pub const fn content(&self) -> &ContentHash {
        &self.content
    }

    /// Abbreviated form for logs
    #[must_use]
    pub fn short(&self) -> String {
        format!("{}:{}", self.folder.short(), self.content.short())
    }

    /// Short form usable as a single path segment
    #[must_use]
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.folder.short(), self.content.short())
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.folder, self.content)
    }
}

/// Canonical spelling of a folder path
///
/// Trims whitespace, turns `\` into `/`, collapses repeated separators, drops
/// trailing separators and lowercases.
#[must_use]
pub fn normalize_folder(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    let mut out = String::with_capacity(unified.len());
    let mut last_slash = false;
    for c in unified.chars() {
        if c == '/' {
            if !last_slash {
                out.push('/');
            }
            last_slash = true;
        } else {
            out.extend(c.to_lowercase());
            last_slash = false;
        }
    }
    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}
