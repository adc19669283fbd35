use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::app::job::{DailyJob, JobError};

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(500);
const MAX_LOOKAHEAD_DAYS: u64 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("cron expression {0:?} must have 5 fields")]
    FieldCount(String),
    #[error("cron expression {expression:?} has invalid {field} field")]
    InvalidField {
        expression: String,
        field: &'static str,
    },
    #[error("cron expression {0:?} must use `*` for day, month and weekday")]
    Unsupported(String),
}

/// Once a day at a fixed local wall-clock time: the `M H * * *` subset of cron.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub at: NaiveTime,
}

impl DailySchedule {
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        let [minute, hour, day, month, weekday] = fields.as_slice() else {
            return Err(ScheduleError::FieldCount(expression.to_string()));
        };

        if [day, month, weekday].iter().any(|field| **field != "*") {
            return Err(ScheduleError::Unsupported(expression.to_string()));
        }

        let invalid = |field| ScheduleError::InvalidField {
            expression: expression.to_string(),
            field,
        };
        let minute = minute.parse::<u32>().map_err(|_| invalid("minute"))?;
        let hour = hour.parse::<u32>().map_err(|_| invalid("hour"))?;
        let at = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            if hour > 23 {
                invalid("hour")
            } else {
                invalid("minute")
            }
        })?;

        Ok(Self { at })
    }

    /// First fire strictly after `now`, at the configured local time in `timezone`.
    ///
    /// A local time skipped by a DST transition moves to the following day.
    pub fn next_after(&self, now: DateTime<Utc>, timezone: Tz) -> Option<DateTime<Utc>> {
        let today = now.with_timezone(&timezone).date_naive();

        (0..=MAX_LOOKAHEAD_DAYS)
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .filter_map(|day| {
                timezone
                    .from_local_datetime(&day.and_time(self.at))
                    .earliest()
            })
            .map(|local| local.with_timezone(&Utc))
            .find(|fire| *fire > now)
    }
}

/// Sleeps until each fire and runs the job on its own worker thread.
/// Overlapping fires are rejected by the job's run guard.
pub fn start_scheduler(
    job: Arc<DailyJob>,
    schedule: DailySchedule,
    timezone: Tz,
    stop_flag: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while !stop_flag.load(Ordering::Relaxed) {
            let Some(next_fire) = schedule.next_after(Utc::now(), timezone) else {
                tracing::error!(at = %schedule.at, timezone = %timezone, "no upcoming fire time; scheduler stopping");
                return;
            };
            tracing::info!(
                next_fire = %next_fire.with_timezone(&timezone),
                "daily job scheduled"
            );

            while !stop_flag.load(Ordering::Relaxed) && Utc::now() < next_fire {
                std::thread::sleep(STOP_POLL_INTERVAL);
            }
            if stop_flag.load(Ordering::Relaxed) {
                break;
            }

            let job = Arc::clone(&job);
            std::thread::spawn(move || run_scheduled(&job));
        }
    })
}

fn run_scheduled(job: &DailyJob) {
    match job.run(false) {
        Ok(summary) => tracing::info!(
            ok = summary.ok,
            reason = summary.reason.as_deref().unwrap_or("-"),
            outcomes = summary.outcomes.len(),
            "scheduled daily job finished"
        ),
        Err(JobError::AlreadyRunning) => {
            tracing::warn!("previous daily job still running; skipping this fire")
        }
        Err(error) => tracing::error!(error = %error, "scheduled daily job failed"),
    }
}
