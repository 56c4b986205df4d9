//! Wall-clock source for cache timestamps
//!
//! Timestamps are milliseconds since the Unix epoch. The trait lets TTL
//! handling be driven deterministically in tests.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Milliseconds in one hour
pub const HOUR_MS: i64 = 60 * 60 * 1000;

/// Source of "now" for scan stamps and TTL checks
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Real UTC clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn advance_ms(&self, delta: i64) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn advance_hours(&self, hours: i64) {
        self.advance_ms(hours * HOUR_MS);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
