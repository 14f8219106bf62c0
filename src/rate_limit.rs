use std::time::{Duration, Instant};

use dashmap::DashMap;

const MAX_FAILURES: u32 = 5;
const WINDOW: Duration = Duration::from_secs(15 * 60);

struct FailureWindow {
    count: u32,
    started: Instant,
}

/// Cuts off password guessing: after `MAX_FAILURES` failed logins for a
/// username within `WINDOW`, further attempts are rejected until the
/// window expires. Successful logins are never counted.
pub struct LoginRateLimiter {
    failures: DashMap<String, FailureWindow>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            failures: DashMap::new(),
        }
    }

    /// Whether login attempts for this username are currently cut off.
    pub fn is_limited(&self, username: &str) -> bool {
        match self.failures.get(&key(username)) {
            Some(window) => window.started.elapsed() <= WINDOW && window.count >= MAX_FAILURES,
            None => false,
        }
    }

    /// Count one failed attempt, starting a fresh window if the previous
    /// one has expired.
    pub fn record_failure(&self, username: &str) {
        let mut entry = self.failures.entry(key(username)).or_insert(FailureWindow {
            count: 0,
            started: Instant::now(),
        });

        if entry.started.elapsed() > WINDOW {
            entry.count = 1;
            entry.started = Instant::now();
        } else {
            entry.count += 1;
        }
    }

    /// Drop windows that started more than `max_age` ago.
    pub fn cleanup(&self, max_age: Duration) {
        self.failures
            .retain(|_, window| window.started.elapsed() < max_age);
    }
}

fn key(username: &str) -> String {
    username.to_lowercase()
}
