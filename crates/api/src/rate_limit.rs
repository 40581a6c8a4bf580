use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: Duration },
}

/// Sliding-window request counter keyed by client.
#[derive(Debug, Clone)]
pub struct ClientRateLimiter {
    inner: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    window: Duration,
    max_requests: usize,
}

impl ClientRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests,
        }
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut guard = self.inner.lock();
        let queue = guard.entry(key.to_string()).or_default();

        while let Some(front) = queue.front() {
            if now.duration_since(*front) >= self.window {
                queue.pop_front();
            } else {
                break;
            }
        }

        if queue.len() >= self.max_requests {
            let retry_after = queue
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            return RateDecision::Limited { retry_after };
        }

        queue.push_back(now);
        RateDecision::Allowed
    }

    /// Drops clients with no requests inside the window.
    pub fn prune(&self) {
        let now = Instant::now();
        self.inner.lock().retain(|_, queue| {
            queue
                .back()
                .is_some_and(|latest| now.duration_since(*latest) < self.window)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_after_max_requests_within_window() {
        let limiter = ClientRateLimiter::new(Duration::from_secs(60), 2);
        let start = Instant::now();

        assert_eq!(limiter.check_at("a", start), RateDecision::Allowed);
        assert_eq!(limiter.check_at("a", start), RateDecision::Allowed);
        assert!(matches!(
            limiter.check_at("a", start + Duration::from_secs(10)),
            RateDecision::Limited { retry_after } if retry_after == Duration::from_secs(50)
        ));
        assert_eq!(limiter.check_at("b", start), RateDecision::Allowed);
    }

    #[test]
    fn window_slides_forward() {
        let limiter = ClientRateLimiter::new(Duration::from_secs(1), 1);
        let start = Instant::now();

        assert_eq!(limiter.check_at("a", start), RateDecision::Allowed);
        assert_ne!(limiter.check_at("a", start), RateDecision::Allowed);
        assert_eq!(
            limiter.check_at("a", start + Duration::from_secs(1)),
            RateDecision::Allowed
        );
    }
}
