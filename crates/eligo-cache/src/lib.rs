//! Lookup cache with LRU eviction, per-entry TTL and single-flight computation.
//!
//! This crate provides the memoizing layer in front of the lookup engine:
//! - LRU eviction to bound the number of remembered identifiers
//! - Separate TTLs for positive and negative answers
//! - Single-flight: concurrent requests for one key share one computation
//!
//! # Example
//!
//! ```rust,ignore
//! use eligo_cache::{CacheConfig, LookupCache};
//!
//! let config = CacheConfig::default()
//!     .with_capacity(100)
//!     .with_negative_ttl(Duration::from_secs(900));
//!
//! let cache: LookupCache<Answer, Failure> = LookupCache::new(config);
//! let answer = cache.get_or_compute("12345", || fetch("12345")).await?;
//! ```

mod cache;
mod config;
mod expiry;

pub use cache::{CacheEntry, CacheStats, CacheValue, LookupCache};
pub use config::CacheConfig;
pub use expiry::ExpiryTracker;
