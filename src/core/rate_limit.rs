//! Fixed-window admission control per client identity
//!
//! Two independent gates: a general request window and a stricter upload
//! window. Uploads must clear both; a rejected call consumes no permit
//! from either gate, so a client hammering a closed gate does not push
//! its own recovery further out.

use crate::error::{DepotError, RateGate, Result};
use ahash::AHashMap;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Admission class of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    /// Reads and non-upload mutations: counted against the request window
    Request,
    /// Uploads: counted against both windows
    Upload,
}

/// Window sizes and quotas
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Requests admitted per request window
    pub max_requests: u32,
    pub request_window: Duration,
    /// Uploads admitted per upload window
    pub max_uploads: u32,
    pub upload_window: Duration,
}

impl RateLimiterConfig {
    pub fn new(
        max_requests: u32,
        request_window: Duration,
        max_uploads: u32,
        upload_window: Duration,
    ) -> Self {
        RateLimiterConfig {
            max_requests,
            request_window,
            max_uploads,
            upload_window,
        }
    }
}

impl Default for RateLimiterConfig {
    /// 100 requests / 15 minutes, 10 uploads / hour.
    fn default() -> Self {
        RateLimiterConfig {
            max_requests: 100,
            request_window: Duration::from_secs(15 * 60),
            max_uploads: 10,
            upload_window: Duration::from_secs(60 * 60),
        }
    }
}

struct FixedWindow {
    window_start: Instant,
    count: u32,
}

impl FixedWindow {
    fn new(now: Instant) -> Self {
        FixedWindow {
            window_start: now,
            count: 0,
        }
    }

    fn roll(&mut self, window: Duration, now: Instant) {
        if now.duration_since(self.window_start) >= window {
            self.window_start = now;
            self.count = 0;
        }
    }

    fn has_room(&self, max: u32) -> bool {
        self.count < max
    }

    fn consume(&mut self) {
        self.count += 1;
    }
}

struct ClientWindows {
    requests: FixedWindow,
    uploads: FixedWindow,
}

/// Per-identity fixed-window rate limiter
pub struct RateLimiter {
    config: RateLimiterConfig,
    clients: Mutex<AHashMap<String, ClientWindows>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        RateLimiter {
            config,
            clients: Mutex::new(AHashMap::new()),
        }
    }

    /// Admit or reject one operation for `identity`.
    ///
    /// Uploads check the request window and the upload window together and
    /// consume a permit from each only when both admit.
    pub fn admit(&self, identity: &str, class: OpClass) -> Result<()> {
        let now = Instant::now();
        let mut clients = self.clients.lock();
        let windows = clients
            .entry(identity.to_string())
            .or_insert_with(|| ClientWindows {
                requests: FixedWindow::new(now),
                uploads: FixedWindow::new(now),
            });

        windows.requests.roll(self.config.request_window, now);
        if !windows.requests.has_room(self.config.max_requests) {
            debug!("rate limited {} on the request window", identity);
            return Err(DepotError::RateLimited {
                identity: identity.to_string(),
                gate: RateGate::Requests,
            });
        }

        match class {
            OpClass::Request => {
                windows.requests.consume();
            }
            OpClass::Upload => {
                windows.uploads.roll(self.config.upload_window, now);
                if !windows.uploads.has_room(self.config.max_uploads) {
                    debug!("rate limited {} on the upload window", identity);
                    return Err(DepotError::RateLimited {
                        identity: identity.to_string(),
                        gate: RateGate::Uploads,
                    });
                }
                windows.requests.consume();
                windows.uploads.consume();
            }
        }
        Ok(())
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Test-reset hook: forget every identity's windows.
    pub fn clear(&self) {
        self.clients.lock().clear();
    }
}
