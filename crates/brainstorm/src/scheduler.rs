//! Daily batch trigger
//!
//! Fires the scheduled brainstorm batch once a day at a local wall-clock time
//! in a fixed timezone. Runs happen sequentially inside one loop.

use chrono::{DateTime, Days, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::repository::IdeaRepository;

/// A fixed local time of day in an IANA timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
  pub time: NaiveTime,
  pub timezone: Tz,
}

impl DailySchedule {
  pub fn new(time: NaiveTime, timezone: Tz) -> Self {
    Self { time, timezone }
  }

  /// The fire instant on a given local date.
  ///
  /// A time skipped by a DST transition moves forward one hour; a repeated
  /// time resolves to its earlier occurrence.
  pub fn on_date(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
    let local = date.and_time(self.time);
    let resolved = match self.timezone.from_local_datetime(&local) {
      LocalResult::Single(at) => Some(at),
      LocalResult::Ambiguous(earliest, _) => Some(earliest),
      LocalResult::None => self
        .timezone
        .from_local_datetime(&(local + chrono::Duration::hours(1)))
        .earliest(),
    };
    resolved.map(|at| at.with_timezone(&Utc))
  }

  /// First fire instant strictly after `now`
  pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let today = now.with_timezone(&self.timezone).date_naive();

    (0..3u64)
      .filter_map(|offset| today.checked_add_days(Days::new(offset)))
      .filter_map(|date| self.on_date(date))
      .find(|at| *at > now)
  }
}

/// Runs the scheduled batch at every fire time until shut down
pub struct BatchScheduler {
  repository: Arc<IdeaRepository>,
  schedule: DailySchedule,
  clock: Arc<dyn Clock>,
  retention_days: u32,
}

impl BatchScheduler {
  pub fn new(
    repository: Arc<IdeaRepository>,
    schedule: DailySchedule,
    clock: Arc<dyn Clock>,
    retention_days: u32,
  ) -> Self {
    Self { repository, schedule, clock, retention_days }
  }

  /// Loop until `shutdown` resolves. Missed fire times are not replayed.
  pub async fn run_until<F>(&self, shutdown: F)
  where
    F: Future<Output = ()>,
  {
    tokio::pin!(shutdown);
    let mut last_fire: Option<DateTime<Utc>> = None;

    loop {
      let now = self.clock.now();
      let from = last_fire.map_or(now, |last| last.max(now));

      let Some(next) = self.schedule.next_after(from) else {
        tracing::error!(time = %self.schedule.time, timezone = %self.schedule.timezone, "could not compute next fire time");
        return;
      };

      let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
      tracing::info!(next_run = %next, wait_secs = wait.as_secs(), "next scheduled brainstorm");

      tokio::select! {
        _ = &mut shutdown => {
          tracing::info!("brainstorm scheduler stopping");
          return;
        }
        _ = tokio::time::sleep(wait) => {}
      }

      last_fire = Some(next);
      let result = self.repository.run_scheduled_batch(self.retention_days).await;
      tracing::debug!(?result, "scheduled run finished");
    }
  }
}
