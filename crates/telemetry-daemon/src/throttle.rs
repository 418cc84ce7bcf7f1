//! Per-key log throttle backing the daemon's `logMu`-guarded
//! `lastLogAt: map<event_key, timestamp>`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Default)]
pub struct LogThrottle {
    last_log_at: Mutex<HashMap<&'static str, Instant>>,
}

impl LogThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` at most once per `interval` for a given `key`.
    pub fn should_log(&self, key: &'static str, interval: Duration) -> bool {
        let mut map = self.last_log_at.lock();
        let now = Instant::now();
        match map.get(key) {
            Some(last) if now.duration_since(*last) < interval => false,
            _ => {
                map.insert(key, now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_then_throttles() {
        let throttle = LogThrottle::new();
        assert!(throttle.should_log("poll_cycle", Duration::from_secs(60)));
        assert!(!throttle.should_log("poll_cycle", Duration::from_secs(60)));
    }

    #[test]
    fn keys_are_independent() {
        let throttle = LogThrottle::new();
        assert!(throttle.should_log("a", Duration::from_secs(60)));
        assert!(throttle.should_log("b", Duration::from_secs(60)));
    }
}
