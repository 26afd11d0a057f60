//! Time sources for server timestamps and retention cutoffs

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Anything that can tell the current time
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
  now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self { now: Mutex::new(start) }
  }

  /// Jump to an absolute instant
  pub fn set(&self, instant: DateTime<Utc>) {
    *self.lock() = instant;
  }

  /// Move forward by a relative amount
  pub fn advance(&self, by: Duration) {
    let mut now = self.lock();
    *now += by;
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
    // A poisoned clock still holds a valid instant
    self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.lock()
  }
}
