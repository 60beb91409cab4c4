// src/core/clock.rs
use chrono::Utc;

/// Time source for cooldown arithmetic. Injected so strategy tests can
/// drive time by hand.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}
