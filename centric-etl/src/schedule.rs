//! Recurring all-stages job.

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use centric_etl_shared::StageSet;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::errors::ServiceError;
use crate::orchestrator::RunQueue;

/// Trigger recorded on scheduled runs.
pub const SCHEDULE_TRIGGER: &str = "schedule";

/// Every day at midnight.
pub const DEFAULT_SCHEDULE: &str = "0 0 * * *";

pub const DEFAULT_TIMEZONE: &str = "America/Toronto";

/// A cron expression evaluated in a fixed timezone.
///
/// Accepts the classic five-field form (`min hour dom month dow`) as well as
/// the six- and seven-field forms with seconds (and years) understood by the
/// `cron` crate. Numeric days of week follow the `cron` crate (1 = Sunday);
/// day names are unambiguous.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: cron::Schedule,
    timezone: Tz,
}

impl CronSchedule {
    pub fn parse(expression: &str, timezone: &str) -> Result<Self, ServiceError> {
        let expression = expression.trim().to_string();
        let fields = expression.split_whitespace().count();
        let full = if fields == 5 {
            format!("0 {}", expression)
        } else {
            expression.clone()
        };

        let schedule = cron::Schedule::from_str(&full).map_err(|e| {
            ServiceError::config(format!("Invalid schedule '{}': {}", expression, e))
        })?;
        let timezone = Tz::from_str(timezone.trim())
            .map_err(|_| ServiceError::config(format!("Unknown timezone '{}'", timezone)))?;

        Ok(Self {
            expression,
            schedule,
            timezone,
        })
    }

    /// The expression as configured.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First firing strictly after `at`.
    pub fn next_after(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&at.with_timezone(&self.timezone))
            .next()
            .map(|next| next.with_timezone(&Utc))
    }
}

/// Snapshot of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleStatus {
    pub active: bool,
    /// When the schedule was created.
    pub init: DateTime<Utc>,
    /// Last time a run was submitted.
    pub last: Option<DateTime<Utc>>,
    /// Next submission, if active.
    pub next: Option<DateTime<Utc>>,
    /// `next` in the schedule's timezone.
    pub next_local: Option<String>,
    pub schedule: String,
    pub timezone: String,
}

#[derive(Default)]
struct Ticks {
    last: Option<DateTime<Utc>>,
    next: Option<DateTime<Utc>>,
}

/// Wall-clock time advanced by the runtime's monotonic clock.
///
/// Anchored once per activation so that sleeping and firing agree on what
/// "now" is, including under a paused test clock.
struct ScheduleClock {
    origin: DateTime<Utc>,
    started: Instant,
}

impl ScheduleClock {
    fn start() -> Self {
        Self {
            origin: Utc::now(),
            started: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.started.elapsed())
            .ok()
            .and_then(|elapsed| self.origin.checked_add_signed(elapsed))
            .unwrap_or_else(Utc::now)
    }
}

/// Submits an all-stages run to the queue at every firing of a cron schedule
/// while active.
pub struct RunSchedule {
    queue: Arc<RunQueue>,
    schedule: CronSchedule,
    init: DateTime<Utc>,
    ticks: Arc<Mutex<Ticks>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl RunSchedule {
    pub fn new(queue: Arc<RunQueue>, schedule: CronSchedule) -> Self {
        Self {
            queue,
            schedule,
            init: Utc::now(),
            ticks: Arc::new(Mutex::new(Ticks::default())),
            ticker: Mutex::new(None),
        }
    }

    /// Start firing. Returns `false` if the schedule was already active.
    pub fn activate(&self) -> bool {
        let mut ticker = lock(&self.ticker);
        if ticker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let queue = self.queue.clone();
        let ticks = self.ticks.clone();
        let schedule = self.schedule.clone();
        let clock = ScheduleClock::start();
        lock(&ticks).next = schedule.next_after(clock.now());

        *ticker = Some(tokio::spawn(async move {
            let mut cursor = clock.now();
            loop {
                let Some(next) = schedule.next_after(cursor) else {
                    warn!(schedule = %schedule.expression(), "Schedule has no further firing");
                    lock(&ticks).next = None;
                    break;
                };
                lock(&ticks).next = Some(next);

                let wait = (next - clock.now()).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;
                cursor = next;
                lock(&ticks).last = Some(clock.now());

                if let Err(e) = queue.submit(StageSet::all(), SCHEDULE_TRIGGER) {
                    warn!(error = %e, "Scheduled run could not be queued, stopping schedule");
                    lock(&ticks).next = None;
                    break;
                }
                info!("Scheduled run queued");
            }
        }));

        info!(
            schedule = %self.schedule.expression(),
            timezone = self.schedule.timezone().name(),
            "Schedule activated"
        );
        true
    }

    /// Stop firing. Returns `false` if the schedule was not active.
    pub fn deactivate(&self) -> bool {
        let Some(handle) = lock(&self.ticker).take() else {
            return false;
        };
        handle.abort();
        lock(&self.ticks).next = None;
        info!("Schedule deactivated");
        true
    }

    pub fn is_active(&self) -> bool {
        lock(&self.ticker)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn status(&self) -> ScheduleStatus {
        let active = self.is_active();
        let ticks = lock(&self.ticks);
        let next = if active { ticks.next } else { None };
        ScheduleStatus {
            active,
            init: self.init,
            last: ticks.last,
            next,
            next_local: next.map(|next| {
                next.with_timezone(&self.schedule.timezone())
                    .to_rfc3339()
            }),
            schedule: self.schedule.expression().to_string(),
            timezone: self.schedule.timezone().name().to_string(),
        }
    }
}

impl Drop for RunSchedule {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.ticker).take() {
            handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
