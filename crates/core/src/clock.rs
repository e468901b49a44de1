// SPDX-License-Identifier: MIT

//! Time abstraction so supervisor backoff and runtime-record timestamps are
//! testable without sleeping. Grounded in the teacher's `oj-core::clock`.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn epoch_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock for tests: starts at a fixed instant and only moves
/// when told to.
pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl FakeClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn epoch(start_ms: i64) -> Self {
        Self::new(DateTime::from_timestamp_millis(start_ms).unwrap_or_else(Utc::now))
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.now.lock();
        *guard += delta;
    }

    pub fn set(&self, value: DateTime<Utc>) {
        *self.now.lock() = value;
    }

    pub fn set_epoch_ms(&self, ms: i64) {
        if let Some(dt) = DateTime::from_timestamp_millis(ms) {
            self.set(dt);
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_only_moves_on_command() {
        let clock = FakeClock::epoch(1_000);
        assert_eq!(clock.epoch_ms(), 1_000);
        clock.advance(chrono::Duration::milliseconds(500));
        assert_eq!(clock.epoch_ms(), 1_500);
        clock.set_epoch_ms(9_999);
        assert_eq!(clock.epoch_ms(), 9_999);
    }
}
