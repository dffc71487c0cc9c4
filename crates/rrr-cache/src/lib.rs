//! RRR Cache
//!
//! Content-addressed, time-expiring store for analysis results.
//!
//! # Core Concepts
//!
//! - [`CacheKey`]: folder-path hash plus an order-independent digest of every
//!   input document
//! - [`CacheStore`]: moka hot layer over a durable [`CacheBackend`], with TTL
//!   expiry against an injected [`Clock`]
//! - [`CacheStore::get_or_compute`]: at most one in-flight computation per key
//!
//! # Example
//!
//! ```rust,ignore
//! use rrr_cache::{CacheConfig, CacheKey, CacheStore};
//!
//! let store: CacheStore<Payload> = CacheStore::open(&CacheConfig::default())?;
//! let key = CacheKey::compute("/reports/q1", &documents);
//! let cached = store.get_or_compute(&key, || analyze()).await?;
//! ```

#![warn(unreachable_pub)]

mod backend;
mod clock;
mod error;
mod hash;
mod key;
mod store;

pub use backend::{CacheBackend, MemoryBackend, SqliteBackend, StoredEntry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, Result};
pub use hash::{ContentHash, HashError};
pub use key::{normalize_folder, CacheKey};
pub use store::{
    CacheConfig, CacheEntry, CacheStats, CacheStatus, CacheStore, Cached, DEFAULT_HOT_CAPACITY,
    DEFAULT_TTL, SECS_PER_DAY,
};
