use chrono::{NaiveTime, Timelike};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("time of day must be HH:MM (24h), got `{0}`")]
pub struct InvalidTimeOfDay(pub String);

/// Strict `HH:MM`, two digits each.
pub fn parse_hhmm(raw: &str) -> Result<NaiveTime, InvalidTimeOfDay> {
    let invalid = || InvalidTimeOfDay(raw.to_string());
    let trimmed = raw.trim();
    let (hours, minutes) = trimmed.split_once(':').ok_or_else(invalid)?;

    if hours.len() != 2
        || minutes.len() != 2
        || !hours.chars().chain(minutes.chars()).all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

/// Local-time window in which sends are held back unless forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl QuietHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start: truncate_to_minute(start),
            end: truncate_to_minute(end),
        }
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, InvalidTimeOfDay> {
        Ok(Self::new(parse_hhmm(start)?, parse_hhmm(end)?))
    }

    /// `end <= start` means the window crosses midnight.
    pub fn contains(&self, local_time: NaiveTime) -> bool {
        if self.end <= self.start {
            local_time >= self.start || local_time < self.end
        } else {
            local_time >= self.start && local_time < self.end
        }
    }
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|time| time.with_nanosecond(0))
        .unwrap_or(time)
}
