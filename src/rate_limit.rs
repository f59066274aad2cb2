use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sliding-window limiter keyed by arbitrary strings. State is per process.
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    hits: Arc<DashMap<String, VecDeque<Instant>>>,
    pub enabled: bool,
}

impl InMemoryRateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self { hits: Arc::new(DashMap::new()), enabled }
    }

    /// Records a hit for `key` and reports whether it fits in the window.
    pub fn check(&self, key: &str, limit: usize, window: Duration) -> bool {
        if !self.enabled {
            return true;
        }
        let now = Instant::now();
        let mut q = self.hits.entry(key.to_string()).or_default();
        while q.front().is_some_and(|t| now.duration_since(*t) >= window) {
            q.pop_front();
        }
        if q.len() >= limit {
            return false;
        }
        q.push_back(now);
        true
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// New help requests per user. Env: `RL_REQUEST_LIMIT` / `RL_REQUEST_WINDOW` (secs)
    pub request_limit: usize,
    pub request_window: Duration,
    /// Chat and support messages per user. Env: `RL_MESSAGE_LIMIT` / `RL_MESSAGE_WINDOW`
    pub message_limit: usize,
    pub message_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            request_limit: 3,
            request_window: Duration::from_secs(300),
            message_limit: 30,
            message_window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        fn num(name: &str, default: u64) -> u64 {
            std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
        }
        let d = Self::default();
        Self {
            request_limit: num("RL_REQUEST_LIMIT", d.request_limit as u64) as usize,
            request_window: Duration::from_secs(num("RL_REQUEST_WINDOW", d.request_window.as_secs())),
            message_limit: num("RL_MESSAGE_LIMIT", d.message_limit as u64) as usize,
            message_window: Duration::from_secs(num("RL_MESSAGE_WINDOW", d.message_window.as_secs())),
        }
    }
}

/// Per-action guard used by handlers; keys are user ids.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self {
        Self { limiter, cfg }
    }

    pub fn allow_request(&self, uid: &str) -> bool {
        self.limiter.check(&format!("request:{uid}"), self.cfg.request_limit, self.cfg.request_window)
    }

    pub fn allow_message(&self, uid: &str) -> bool {
        self.limiter.check(&format!("message:{uid}"), self.cfg.message_limit, self.cfg.message_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_expires_old_hits() {
        let rl = InMemoryRateLimiter::new(true);
        let window = Duration::from_millis(30);
        assert!(rl.check("k", 2, window));
        assert!(rl.check("k", 2, window));
        assert!(!rl.check("k", 2, window));
        std::thread::sleep(Duration::from_millis(40));
        assert!(rl.check("k", 2, window));
    }

    #[test]
    fn actions_are_counted_separately() {
        let cfg = RateLimitConfig { request_limit: 1, message_limit: 1, ..RateLimitConfig::default() };
        let rl = RateLimiterFacade::new(InMemoryRateLimiter::new(true), cfg);
        assert!(rl.allow_request("u1"));
        assert!(!rl.allow_request("u1"));
        assert!(rl.allow_message("u1"));
        assert!(rl.allow_request("u2"));
    }

    #[test]
    fn disabled_limiter_allows_everything() {
        let rl = InMemoryRateLimiter::new(false);
        for _ in 0..10 {
            assert!(rl.check("k", 1, Duration::from_secs(60)));
        }
    }
}
