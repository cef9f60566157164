//! Sliding-window request admission
//!
//! At most `max_requests` admissions are granted within any trailing
//! `window`. The timestamp log is shared by every caller of one external
//! API and is only touched while holding the lock, so the
//! purge-decide-record sequence is atomic. The lock is held while waiting,
//! which makes waiters queue in arrival order.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Rate limit settings for one external API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Admissions allowed per window
    pub max_requests: usize,

    /// Window length in seconds
    pub window_seconds: u64,
}

impl RateLimitConfig {
    pub fn new(max_requests: usize, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window_seconds,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

/// Sliding-window rate limiter with blocking admission
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    admissions: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    /// Create a limiter; `max_requests` below 1 is treated as 1
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            admissions: Mutex::new(VecDeque::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window())
    }

    /// Wait until a request may be sent, then record it
    pub async fn admit(&self) {
        let mut admissions = self.admissions.lock().await;

        let now = Instant::now();
        Self::purge(&mut admissions, now, self.window);

        if admissions.len() >= self.max_requests {
            if let Some(&oldest) = admissions.front() {
                let wait = (oldest + self.window).saturating_duration_since(now);
                debug!(
                    wait_ms = wait.as_millis() as u64,
                    in_window = admissions.len(),
                    "Rate limit reached, waiting"
                );
                tokio::time::sleep(wait).await;
            }
            Self::purge(&mut admissions, Instant::now(), self.window);
        }

        admissions.push_back(Instant::now());
    }

    /// Admissions currently inside the window
    pub async fn in_window(&self) -> usize {
        let mut admissions = self.admissions.lock().await;
        Self::purge(&mut admissions, Instant::now(), self.window);
        admissions.len()
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn purge(admissions: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(&oldest) = admissions.front() {
            if oldest + window <= now {
                admissions.pop_front();
            } else {
                break;
            }
        }
    }
}
