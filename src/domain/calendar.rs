use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use chrono_tz::Tz;

/// Calendar day of `now` as seen in `timezone`.
pub fn local_day(now: DateTime<Utc>, timezone: Tz) -> NaiveDate {
    now.with_timezone(&timezone).date_naive()
}

pub fn start_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

pub fn start_of_year(day: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(day.year(), 1, 1).unwrap_or(day)
}

/// Same calendar date `years` earlier; Feb 29 lands on Feb 28.
pub fn shift_years_back(day: NaiveDate, years: u32) -> NaiveDate {
    day.checked_sub_months(Months::new(12 * years))
        .unwrap_or(day)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    Today,
    MonthToDate,
    YearToDate,
}

impl PeriodKind {
    pub const ALL: [PeriodKind; 3] = [
        PeriodKind::Today,
        PeriodKind::MonthToDate,
        PeriodKind::YearToDate,
    ];

    pub fn start_for(self, day: NaiveDate) -> NaiveDate {
        match self {
            PeriodKind::Today => day,
            PeriodKind::MonthToDate => start_of_month(day),
            PeriodKind::YearToDate => start_of_year(day),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PeriodKind::Today => "today",
            PeriodKind::MonthToDate => "month_to_date",
            PeriodKind::YearToDate => "year_to_date",
        }
    }
}

/// Inclusive date range ending on a reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub kind: PeriodKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn ending_on(kind: PeriodKind, day: NaiveDate) -> Self {
        Self {
            kind,
            start: kind.start_for(day),
            end: day,
        }
    }

    /// The same date or range `years` earlier, boundaries recomputed in that year.
    pub fn years_back(&self, years: u32) -> Self {
        Self::ending_on(self.kind, shift_years_back(self.end, years))
    }
}
