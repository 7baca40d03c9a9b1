use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Enforces a minimum delay between consecutive operations.
///
/// Callers are serialized: the lock is held while sleeping, so two threads
/// calling [`RateLimiter::acquire`] at once leave at least `min_delay` apart.
#[derive(Debug)]
pub struct RateLimiter {
    min_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub const fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_request: Mutex::new(None),
        }
    }

    pub const fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Blocks until `min_delay` has passed since the previous call returned.
    /// An idle limiter returns immediately.
    pub fn acquire(&self) {
        let mut last = self.last_request.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(wait) = last.and_then(|at| self.min_delay.checked_sub(at.elapsed())) {
            if !wait.is_zero() {
                log::trace!("Throttling for {}ms", wait.as_millis());
                std::thread::sleep(wait);
            }
        }

        *last = Some(Instant::now());
    }

    pub fn last_request(&self) -> Option<Instant> {
        *self.last_request.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn first_acquire_does_not_wait() {
        let limiter = RateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();

        limiter.acquire();

        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(limiter.last_request().is_some());
    }

    #[test]
    fn consecutive_acquires_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(80));

        limiter.acquire();
        let first = limiter.last_request().unwrap();
        limiter.acquire();
        let second = limiter.last_request().unwrap();

        assert!(second - first >= Duration::from_millis(80));
    }

    #[test]
    fn idle_period_is_not_owed() {
        let limiter = RateLimiter::new(Duration::from_millis(40));

        limiter.acquire();
        std::thread::sleep(Duration::from_millis(60));

        let start = Instant::now();
        limiter.acquire();

        assert!(start.elapsed() < Duration::from_millis(30));
    }

    #[test]
    fn concurrent_callers_are_serialized() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(50)));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || limiter.acquire())
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // First call is free, the other two each wait a full delay.
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
