//! Persistent caching layer with stale-read fallback.
//!
//! This module provides a provider-agnostic caching mechanism that:
//! - Stores JSON values with a creation time and an expiry time
//! - Serves fresh reads only before expiry, stale reads at any age
//! - Evicts the lexicographically smallest half of its keys when the store is full
//! - Provides basic offline mode (serve stale cache when every fetch fails)

mod layer;
mod persistent;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use persistent::{PersistentCache, DEFAULT_NAMESPACE};
pub use storage::{KvStore, MemoryStore, NoopStore, SqliteStore};
pub use traits::{CacheEntry, CacheResult, CacheSource, Clock, ManualClock, SystemClock};
