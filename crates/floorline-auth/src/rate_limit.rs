//! Per-email sliding-window login limiter. In-process and advisory; the real
//! security boundary is the KDF, not this counter.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct LoginRateLimiter {
    window: Duration,
    max_attempts: usize,
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(15 * 60), 5)
    }
}

impl LoginRateLimiter {
    pub fn new(window: Duration, max_attempts: usize) -> Self {
        Self {
            window,
            max_attempts,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Records an attempt and reports whether it is allowed. The failed
    /// attempt itself counts toward the window.
    pub fn check_and_record(&self, email: &str) -> bool {
        let now = Instant::now();
        let mut attempts = self.attempts.lock().unwrap();
        let entry = attempts.entry(email.to_ascii_lowercase()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);
        if entry.len() >= self.max_attempts {
            return false;
        }
        entry.push(now);
        true
    }

    /// A successful login clears the window for that email.
    pub fn reset(&self, email: &str) {
        self.attempts
            .lock()
            .unwrap()
            .remove(&email.to_ascii_lowercase());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixth_attempt_in_window_is_blocked() {
        let limiter = LoginRateLimiter::new(Duration::from_secs(60), 5);
        for _ in 0..5 {
            assert!(limiter.check_and_record("Staff@Example.com"));
        }
        // case-insensitive key
        assert!(!limiter.check_and_record("staff@example.com"));
    }

    #[test]
    fn window_expiry_readmits() {
        let limiter = LoginRateLimiter::new(Duration::from_millis(10), 1);
        assert!(limiter.check_and_record("a@b.c"));
        assert!(!limiter.check_and_record("a@b.c"));
        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.check_and_record("a@b.c"));
    }

    #[test]
    fn success_resets_the_window() {
        let limiter = LoginRateLimiter::new(Duration::from_secs(60), 2);
        assert!(limiter.check_and_record("a@b.c"));
        assert!(limiter.check_and_record("a@b.c"));
        limiter.reset("a@b.c");
        assert!(limiter.check_and_record("a@b.c"));
    }
}
