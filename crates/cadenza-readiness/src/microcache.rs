#![forbid(unsafe_code)]

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

/// Short-TTL suppression of redundant filesystem checks for rapid repeat
/// segment requests. Keys are `"{session_id}:{segment_name}"`.
pub(crate) struct Microcache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Instant>>,
}

impl Microcache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a fresh entry exists for `key`.
    pub(crate) fn hit(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .get(key)
            .is_some_and(|expires| *expires > now)
    }

    /// Record a successful check; prunes expired entries opportunistically.
    pub(crate) fn store(&self, key: &str) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, expires| *expires > now);
        entries.insert(key.to_string(), now + self.ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entries_hit_until_ttl() {
        let cache = Microcache::new(Duration::from_millis(50));
        assert!(!cache.hit("s:chunk-0-00001.m4s"));
        cache.store("s:chunk-0-00001.m4s");
        assert!(cache.hit("s:chunk-0-00001.m4s"));
        std::thread::sleep(Duration::from_millis(60));
        assert!(!cache.hit("s:chunk-0-00001.m4s"));
    }

    #[test]
    fn store_prunes_expired_entries() {
        let cache = Microcache::new(Duration::from_millis(10));
        cache.store("a");
        std::thread::sleep(Duration::from_millis(20));
        cache.store("b");
        assert_eq!(cache.entries.lock().len(), 1);
    }
}
