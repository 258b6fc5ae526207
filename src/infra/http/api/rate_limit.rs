use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::util::lock::mutex_lock;

/// Sliding-window request counter keyed by client and route.
#[derive(Debug, Clone)]
pub struct ApiRateLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Arc<DashMap<String, Vec<Instant>>>,
    last_sweep: Arc<Mutex<Instant>>,
}

impl ApiRateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            buckets: Arc::new(DashMap::new()),
            last_sweep: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Record a request from `client` on `route`. Returns whether it is
    /// admitted and how many requests remain in the current window.
    pub fn allow(&self, client: &str, route: &str) -> (bool, u32) {
        self.allow_at(client, route, Instant::now())
    }

    fn allow_at(&self, client: &str, route: &str, now: Instant) -> (bool, u32) {
        self.sweep_expired(now);

        let bucket_key = format!("{client}:{route}");
        let window = self.window;

        let mut entry = self.buckets.entry(bucket_key).or_default();
        entry.retain(|instant| now.saturating_duration_since(*instant) < window);

        let used = u32::try_from(entry.len()).unwrap_or(u32::MAX);
        let remaining = self.max_requests.saturating_sub(used);
        if remaining == 0 {
            return (false, 0);
        }

        entry.push(now);
        (true, remaining - 1)
    }

    /// Drop buckets whose newest request left the window. Runs at most once
    /// per window.
    fn sweep_expired(&self, now: Instant) {
        let window = self.window;
        {
            let mut last_sweep =
                mutex_lock(&self.last_sweep, "infra::http::api::rate_limit", "sweep");
            if now.saturating_duration_since(*last_sweep) < window {
                return;
            }
            *last_sweep = now;
        }
        self.buckets.retain(|_, requests| {
            requests
                .last()
                .is_some_and(|newest| now.saturating_duration_since(*newest) < window)
        });
    }

    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_per_client_and_refills_after_window() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 2);
        let start = Instant::now();

        assert_eq!(limiter.allow_at("10.0.0.1", "/contact", start), (true, 1));
        assert_eq!(limiter.allow_at("10.0.0.1", "/contact", start), (true, 0));
        assert_eq!(limiter.allow_at("10.0.0.1", "/contact", start), (false, 0));
        assert!(limiter.allow_at("10.0.0.2", "/contact", start).0);

        let later = start + Duration::from_secs(61);
        assert_eq!(limiter.allow_at("10.0.0.1", "/contact", later), (true, 1));
    }

    #[test]
    fn idle_clients_are_forgotten_once_the_window_passes() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(1), 5);
        let start = Instant::now();

        for n in 0..10_000u32 {
            let client = format!("10.{}.{}.{}", n >> 16, (n >> 8) & 0xff, n & 0xff);
            assert!(limiter.allow_at(&client, "/contact", start).0);
        }
        assert_eq!(limiter.buckets.len(), 10_000);

        let later = start + Duration::from_secs(3600);
        assert!(limiter.allow_at("192.0.2.1", "/contact", later).0);
        assert_eq!(limiter.buckets.len(), 1);
    }

    #[test]
    fn active_clients_survive_a_sweep() {
        let limiter = ApiRateLimiter::new(Duration::from_secs(60), 2);
        let start = Instant::now();

        limiter.allow_at("10.0.0.1", "/contact", start);
        let later = start + Duration::from_secs(59);
        limiter.allow_at("10.0.0.2", "/contact", later);
        assert_eq!(limiter.allow_at("10.0.0.2", "/contact", later), (true, 0));

        let sweep_time = start + Duration::from_secs(61);
        assert_eq!(
            limiter.allow_at("10.0.0.2", "/contact", sweep_time),
            (false, 0)
        );
        assert_eq!(limiter.buckets.len(), 1);
    }
}
