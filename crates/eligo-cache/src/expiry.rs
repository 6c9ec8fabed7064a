//! Deadline tracking for entry expiration.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Tracks expiry deadlines for cache entries.
///
/// Deadlines are fixed at insertion; reading an entry does not extend it.
/// Keys without a deadline never expire.
#[derive(Debug, Default)]
pub struct ExpiryTracker {
    deadlines: HashMap<String, Instant>,
}

impl ExpiryTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the TTL for a key, replacing any previous deadline.
    ///
    /// `None` clears the deadline so the key never expires.
    pub fn set(&mut self, key: &str, ttl: Option<Duration>) {
        match ttl {
            Some(ttl) => {
                self.deadlines.insert(key.to_string(), Instant::now() + ttl);
            }
            None => {
                self.deadlines.remove(key);
            }
        }
    }

    /// Check if a key has passed its deadline.
    pub fn is_expired(&self, key: &str) -> bool {
        self.deadlines
            .get(key)
            .is_some_and(|deadline| Instant::now() >= *deadline)
    }

    /// Remaining lifetime of a key, if it has a deadline.
    pub fn remaining(&self, key: &str) -> Option<Duration> {
        self.deadlines
            .get(key)
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Stop tracking a key.
    pub fn remove(&mut self, key: &str) {
        self.deadlines.remove(key);
    }

    /// Get all expired keys.
    pub fn get_expired(&self) -> Vec<String> {
        let now = Instant::now();
        self.deadlines
            .iter()
            .filter(|(_, deadline)| now >= **deadline)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Remove all expired keys and return them.
    pub fn drain_expired(&mut self) -> Vec<String> {
        let expired = self.get_expired();
        for key in &expired {
            self.deadlines.remove(key);
        }
        expired
    }

    /// Number of keys with a deadline.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Check if no key has a deadline.
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Clear all deadlines.
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_no_ttl_never_expires() {
        let mut tracker = ExpiryTracker::new();
        tracker.set("12345", None);

        assert!(!tracker.is_expired("12345"));
        assert!(tracker.get_expired().is_empty());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_expiration() {
        let mut tracker = ExpiryTracker::new();
        tracker.set("12345", Some(Duration::from_millis(10)));

        thread::sleep(Duration::from_millis(20));

        assert!(tracker.is_expired("12345"));
        assert_eq!(tracker.get_expired(), vec!["12345".to_string()]);
    }

    #[test]
    fn test_set_replaces_deadline() {
        let mut tracker = ExpiryTracker::new();
        tracker.set("12345", Some(Duration::from_millis(10)));
        tracker.set("12345", None);

        thread::sleep(Duration::from_millis(20));

        assert!(!tracker.is_expired("12345"));
    }

    #[test]
    fn test_drain_expired() {
        let mut tracker = ExpiryTracker::new();
        tracker.set("a1", Some(Duration::from_millis(10)));
        tracker.set("b2", Some(Duration::from_millis(10)));
        tracker.set("c3", Some(Duration::from_secs(60)));

        thread::sleep(Duration::from_millis(20));

        let mut expired = tracker.drain_expired();
        expired.sort();
        assert_eq!(expired, vec!["a1".to_string(), "b2".to_string()]);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_remaining() {
        let mut tracker = ExpiryTracker::new();
        tracker.set("a1", Some(Duration::from_secs(60)));

        let remaining = tracker.remaining("a1").unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(50));
        assert_eq!(tracker.remaining("missing"), None);
    }
}
