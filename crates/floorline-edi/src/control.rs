use std::sync::atomic::{AtomicI64, Ordering};

/// Process-wide interchange control number source. Seeded at boot from the
/// highest number already recorded, so restarts never reuse one.
#[derive(Debug)]
pub struct InterchangeCounter {
    next: AtomicI64,
}

impl InterchangeCounter {
    pub fn new(seed: i64) -> Self {
        Self {
            next: AtomicI64::new(seed.max(1)),
        }
    }

    pub fn next(&self) -> i64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_is_monotonic() {
        let counter = InterchangeCounter::new(100);
        assert_eq!(counter.next(), 100);
        assert_eq!(counter.next(), 101);
    }

    #[test]
    fn zero_seed_starts_at_one() {
        let counter = InterchangeCounter::new(0);
        assert_eq!(counter.next(), 1);
    }
}
