//! Clock abstraction, so cache TTL and latency math are testable
//! without real sleeps.

use chrono::{DateTime, Utc};

/// Source of wall-clock time.
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only advances when told to — lets tests assert TTL and
/// latency behavior deterministically.
#[cfg(test)]
pub struct ManualClock(std::sync::Mutex<DateTime<Utc>>);

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self(std::sync::Mutex::new(start))
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.0.lock().expect("ManualClock mutex poisoned");
        *guard += delta;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().expect("ManualClock mutex poisoned") = now;
    }
}

#[cfg(test)]
impl ClockPort for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("ManualClock mutex poisoned")
    }
}
