//! Duplicate-notification suppression.
//!
//! [`SuppressionMap`] remembers which notification keys were delivered
//! recently and answers "was this key sent inside the duplicate
//! window". It owns an explicit key → expiry mapping driven by an
//! injectable [`Clock`], so tests control time deterministically and
//! shutdown is a plain [`cleanup`](SuppressionMap::cleanup) with no
//! timers left behind.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Monotonic time source. Injected so the duplicate window can be
/// tested without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Production clock.
#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic tests.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.base + offset
    }
}

/// Identity of one notification for dedupe purposes.
///
/// Keyed on `(destination, user, watched channel)`: two different
/// users joining the same channel are distinct keys, as are the same
/// user surfacing in two destination channels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SuppressionKey {
    pub destination_channel_id: String,
    pub user_id: String,
    pub watched_channel_id: String,
}

/// TTL-windowed map of recently delivered notification keys.
///
/// Process-local and unbounded in key count, but expired entries are
/// pruned opportunistically on every mark.
pub struct SuppressionMap {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<SuppressionKey, Instant>>,
}

impl SuppressionMap {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_system_clock(ttl: Duration) -> Self {
        Self::new(ttl, Arc::new(SystemClock))
    }

    /// Whether `key` was marked within the duplicate window.
    pub fn is_suppressed(&self, key: &SuppressionKey) -> bool {
        let now = self.clock.now();
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).is_some_and(|expiry| *expiry > now)
    }

    /// Record a delivery for `key`, replacing any earlier expiry.
    ///
    /// A re-send inside the window extends the window; last successful
    /// send wins.
    pub fn mark(&self, key: SuppressionKey) {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, expiry| *expiry > now);
        entries.insert(key, now + self.ttl);
    }

    /// Drop every pending entry. Deterministic teardown for shutdown.
    pub fn cleanup(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Number of live entries (expired-but-unpruned included).
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(dest: &str) -> SuppressionKey {
        SuppressionKey {
            destination_channel_id: dest.into(),
            user_id: "400".into(),
            watched_channel_id: "200".into(),
        }
    }

    fn map() -> (Arc<ManualClock>, SuppressionMap) {
        let clock = Arc::new(ManualClock::new());
        let map = SuppressionMap::new(Duration::from_millis(5000), clock.clone());
        (clock, map)
    }

    #[test]
    fn marked_key_is_suppressed_until_the_window_elapses() {
        let (clock, map) = map();
        let k = key("300");

        assert!(!map.is_suppressed(&k));
        map.mark(k.clone());
        assert!(map.is_suppressed(&k));

        clock.advance(Duration::from_millis(4999));
        assert!(map.is_suppressed(&k));
        clock.advance(Duration::from_millis(2));
        assert!(!map.is_suppressed(&k));
    }

    #[test]
    fn remark_extends_the_window() {
        let (clock, map) = map();
        let k = key("300");

        map.mark(k.clone());
        clock.advance(Duration::from_millis(4000));
        map.mark(k.clone());
        clock.advance(Duration::from_millis(4000));
        // 8s after the first mark, 4s after the second: still inside.
        assert!(map.is_suppressed(&k));
    }

    #[test]
    fn keys_differing_in_any_component_are_independent() {
        let (_, map) = map();
        map.mark(key("300"));
        assert!(!map.is_suppressed(&key("301")));

        let other_user = SuppressionKey {
            user_id: "401".into(),
            ..key("300")
        };
        assert!(!map.is_suppressed(&other_user));
    }

    #[test]
    fn mark_prunes_expired_entries() {
        let (clock, map) = map();
        map.mark(key("300"));
        map.mark(key("301"));
        clock.advance(Duration::from_millis(6000));
        map.mark(key("302"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn cleanup_clears_everything() {
        let (_, map) = map();
        map.mark(key("300"));
        map.mark(key("301"));
        map.cleanup();
        assert!(map.is_empty());
        assert!(!map.is_suppressed(&key("300")));
    }
}
