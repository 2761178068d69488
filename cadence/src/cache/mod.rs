//! Memoization of derived datasets.
//!
//! Data-derivation routines fingerprint their input, consult a
//! [`DataCache`] and only recompute on a miss:
//!
//! ```text
//! records ──► Fingerprint ──► DataCache::get ──hit──► derived value
//!                                   │
//!                                  miss ──► compute ──► DataCache::set
//! ```
//!
//! Expiry is time-based. A single [`CacheSweeper`] owns the only cleanup
//! timer and visits every registered cache, so creating caches never leaks
//! timers.

mod data_cache;
mod fingerprint;
mod sweeper;

pub use data_cache::{CacheEntry, DataCache, Sweepable, DEFAULT_CACHE_TTL_MS};
pub use fingerprint::{Fingerprint, Keyed};
pub use sweeper::{CacheSweeper, SweepResult, DEFAULT_SWEEP_INTERVAL_MS};
