//! Configuration for the lookup cache.

use std::time::Duration;

/// Default maximum number of distinct identifiers to remember.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default TTL for positive answers (none - kept until LRU eviction).
pub const DEFAULT_POSITIVE_TTL: Option<Duration> = None;

/// Default TTL for negative answers (15 minutes).
///
/// A negative answer may come from a flaky remote rather than a genuinely
/// unknown identifier, so it is retried after this window.
pub const DEFAULT_NEGATIVE_TTL: Option<Duration> = Some(Duration::from_secs(15 * 60));

/// Configuration for the lookup cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries before LRU eviction.
    pub capacity: usize,

    /// Time-to-live for positive entries, measured from insertion.
    pub positive_ttl: Option<Duration>,

    /// Time-to-live for negative entries, measured from insertion.
    pub negative_ttl: Option<Duration>,

    /// Whether to run periodic cleanup of expired entries.
    /// If false, expired entries are only dropped on access.
    pub enable_cleanup_task: bool,

    /// Interval for the cleanup task (if enabled).
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            positive_ttl: DEFAULT_POSITIVE_TTL,
            negative_ttl: DEFAULT_NEGATIVE_TTL,
            enable_cleanup_task: true,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the TTL for positive entries.
    pub fn with_positive_ttl(mut self, ttl: Duration) -> Self {
        self.positive_ttl = Some(ttl);
        self
    }

    /// Set the TTL for negative entries.
    pub fn with_negative_ttl(mut self, ttl: Duration) -> Self {
        self.negative_ttl = Some(ttl);
        self
    }

    /// Keep negative entries until LRU eviction, like positive ones.
    pub fn without_negative_ttl(mut self) -> Self {
        self.negative_ttl = None;
        self
    }

    /// Enable or disable the background cleanup task.
    pub fn with_cleanup_task(mut self, enabled: bool) -> Self {
        self.enable_cleanup_task = enabled;
        self
    }

    /// Set the cleanup interval.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// TTL that applies to an entry of the given polarity.
    pub fn ttl_for(&self, negative: bool) -> Option<Duration> {
        if negative {
            self.negative_ttl
        } else {
            self.positive_ttl
        }
    }

    /// Whether any entry can expire at all.
    pub fn expires(&self) -> bool {
        self.positive_ttl.is_some() || self.negative_ttl.is_some()
    }
}
