//! Injectable clock for time-to-live decisions.
//!
//! The activity cache decides freshness by comparing wall-clock reads; a
//! trait seam keeps those reads deterministic in tests.

use chrono::{DateTime, Utc};

/// Source of "now" for freshness checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
