use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::domain::models::normalize_recipient;
use crate::domain::ports::{OptOutStore, StoreError};
use crate::domain::quiet_hours::QuietHours;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    OptedOut,
    QuietHours,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::OptedOut => "opted_out",
            SkipReason::QuietHours => "quiet_hours",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Suppress(SkipReason),
}

impl GateDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

/// Per-recipient send policy. Opt-out is absolute; quiet hours yield to a forced send.
pub struct DispatchGate<'a> {
    opt_outs: &'a dyn OptOutStore,
    quiet_hours: QuietHours,
    timezone: Tz,
}

impl<'a> DispatchGate<'a> {
    pub fn new(opt_outs: &'a dyn OptOutStore, quiet_hours: QuietHours, timezone: Tz) -> Self {
        Self {
            opt_outs,
            quiet_hours,
            timezone,
        }
    }

    /// Reads opt-out state from the store on every call.
    pub fn should_send(
        &self,
        recipient: &str,
        now: DateTime<Utc>,
        force_send: bool,
    ) -> Result<GateDecision, StoreError> {
        if self.opt_outs.is_opted_out(&normalize_recipient(recipient))? {
            return Ok(GateDecision::Suppress(SkipReason::OptedOut));
        }

        if !force_send && self.in_quiet_hours(now) {
            return Ok(GateDecision::Suppress(SkipReason::QuietHours));
        }

        Ok(GateDecision::Allow)
    }

    pub fn in_quiet_hours(&self, now: DateTime<Utc>) -> bool {
        let local_time = now.with_timezone(&self.timezone).time();
        self.quiet_hours.contains(local_time)
    }
}
