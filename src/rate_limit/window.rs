//! Fixed-window request counter.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::RateLimiter;
use crate::config::RATE_LIMIT_WINDOW;

/// Allows at most `max_requests` per key in each window.
///
/// A key's window starts with its first request and resets once `window` has
/// elapsed. Expired keys are pruned whenever the map is touched, so memory
/// stays proportional to the number of recently active clients.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, (Instant, u32)>>,
}

impl FixedWindowLimiter {
    /// Limiter admitting `max_requests` per `window`. Zero disables limiting.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        FixedWindowLimiter {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Limiter with the standard one-minute window.
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, RATE_LIMIT_WINDOW)
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        if self.max_requests == 0 {
            return true;
        }

        // A panic while holding the lock cannot leave the counters inconsistent
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        windows.retain(|_, (start, _)| now.duration_since(*start) < self.window);

        let entry = windows.entry(key.to_string()).or_insert((now, 0));
        if entry.1 >= self.max_requests {
            log::debug!("Rate limit reached for client '{key}'");
            return false;
        }
        entry.1 += 1;
        true
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_allows_up_to_limit_then_blocks() {
        let limiter = FixedWindowLimiter::per_minute(3);
        assert!(limiter.allow("client-a"));
        assert!(limiter.allow("client-a"));
        assert!(limiter.allow("client-a"));
        assert!(!limiter.allow("client-a"));
        assert!(!limiter.allow("client-a"));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = FixedWindowLimiter::per_minute(1);
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        assert!(limiter.allow("b"));
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let limiter = FixedWindowLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.allow_at("a", start));
        assert!(limiter.allow_at("a", start + Duration::from_secs(10)));
        assert!(!limiter.allow_at("a", start + Duration::from_secs(59)));
        assert!(limiter.allow_at("a", start + Duration::from_secs(60)));
    }

    #[test]
    fn test_stale_keys_are_pruned() {
        let limiter = FixedWindowLimiter::new(5, Duration::from_secs(1));
        let start = Instant::now();
        for key in ["a", "b", "c"] {
            limiter.allow_at(key, start);
        }
        assert_eq!(limiter.tracked_keys(), 3);
        limiter.allow_at("d", start + Duration::from_secs(2));
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_zero_disables_limiting() {
        let limiter = FixedWindowLimiter::per_minute(0);
        for _ in 0..100 {
            assert!(limiter.allow("a"));
        }
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_shared_across_threads() {
        let limiter = Arc::new(FixedWindowLimiter::per_minute(50));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || (0..20).filter(|_| limiter.allow("shared")).count())
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 50);
    }
}
