//! Per-caller request limiting.
//!
//! Fixed time windows keyed by `(caller, endpoint)`: each key may make
//! `max_requests` calls per window, and the count resets when a new window
//! starts. The limiter is built once per process and owned by
//! [`ScrubApp`](crate::app::ScrubApp); time comes from an injected
//! [`Clock`] so tests can step it by hand.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::config::RateLimitConfig;

/// Time source for the limiter.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Milliseconds since the UNIX epoch.
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn advance_secs(&self, secs: u64) {
        self.now_ms.fetch_add(secs * 1000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rate limit exceeded for '{caller}' on {endpoint}; retry in {retry_after_secs}s")]
pub struct RateLimited {
    pub caller: String,
    pub endpoint: String,
    pub retry_after_secs: u64,
}

struct Window {
    index: u64,
    count: u32,
}

pub struct RateLimiter {
    max_requests: u32,
    window_ms: u64,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<(String, String), Window>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests: config.max_requests,
            window_ms: config.window_secs.max(1) * 1000,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request by `caller` on `endpoint`, or refuse it.
    pub fn check(&self, caller: &str, endpoint: &str) -> Result<(), RateLimited> {
        let now = self.clock.now_ms();
        let index = now / self.window_ms;

        let mut windows = self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Windows from earlier periods can never block again.
        windows.retain(|_, w| w.index == index);

        let window = windows
            .entry((caller.to_string(), endpoint.to_string()))
            .or_insert(Window { index, count: 0 });
        if window.count >= self.max_requests {
            let window_end = (index + 1) * self.window_ms;
            return Err(RateLimited {
                caller: caller.to_string(),
                endpoint: endpoint.to_string(),
                retry_after_secs: (window_end - now).div_ceil(1000),
            });
        }
        window.count += 1;
        Ok(())
    }
}
