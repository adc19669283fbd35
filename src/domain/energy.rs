use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::domain::calendar::{Period, PeriodKind};
use crate::domain::numeric::{extract_rows, find_number, ratio_pct};
use crate::domain::ports::{Granularity, MonitoringApi, MonitoringError};

const TODAY_ENERGY_KEYS: &[&str] = &["today_energy", "todayEnergy", "today_energy_kwh"];
const MONTH_ENERGY_KEYS: &[&str] = &["month_energy", "monthEnergy", "month_energy_kwh"];
const YEAR_ENERGY_KEYS: &[&str] = &["year_energy", "yearEnergy", "year_energy_kwh"];
const SERIES_ROW_ENERGY_KEYS: &[&str] = &["energy", "kwh", "value", "val"];
const SERIES_ENVELOPE_KEYS: &[&str] = &["list", "data", "records"];
const RATED_POWER_KEYS: &[&str] = &[
    "peak_power",
    "peakPower",
    "nominal_power",
    "nominalPower",
    "installed_capacity",
];

/// Raw values above this are read as watts. The upstream API documents no unit for these fields.
pub const WATTS_HEURISTIC_THRESHOLD: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeriodComparison {
    pub current: Option<f64>,
    pub prior_year_1: Option<f64>,
    pub prior_year_2: Option<f64>,
}

impl PeriodComparison {
    pub fn performance_pct(&self) -> Option<f64> {
        ratio_pct(self.current, self.prior_year_1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnergyAggregates {
    pub reference_day: NaiveDate,
    pub today: PeriodComparison,
    pub month_to_date: PeriodComparison,
    pub year_to_date: PeriodComparison,
    pub rated_power_kwp: Option<f64>,
}

impl EnergyAggregates {
    pub fn ratios(&self) -> PerformanceRatios {
        PerformanceRatios {
            today: self.today.performance_pct(),
            month_to_date: self.month_to_date.performance_pct(),
            year_to_date: self.year_to_date.performance_pct(),
        }
    }
}

/// Current value against the same date/period one year earlier, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerformanceRatios {
    pub today: Option<f64>,
    pub month_to_date: Option<f64>,
    pub year_to_date: Option<f64>,
}

pub struct EnergyAggregator<'a, M: MonitoringApi + ?Sized> {
    api: &'a M,
    plant_id: &'a str,
}

impl<'a, M: MonitoringApi + ?Sized> EnergyAggregator<'a, M> {
    pub fn new(api: &'a M, plant_id: &'a str) -> Self {
        Self { api, plant_id }
    }

    pub fn aggregate(&self, reference_day: NaiveDate) -> Result<EnergyAggregates, MonitoringError> {
        let snapshot = self.api.plant_snapshot(self.plant_id)?;
        let snapshot = snapshot.as_object();

        let today = self.compare(snapshot, Period::ending_on(PeriodKind::Today, reference_day))?;
        let month_to_date = self.compare(
            snapshot,
            Period::ending_on(PeriodKind::MonthToDate, reference_day),
        )?;
        let year_to_date = self.compare(
            snapshot,
            Period::ending_on(PeriodKind::YearToDate, reference_day),
        )?;

        Ok(EnergyAggregates {
            reference_day,
            today,
            month_to_date,
            year_to_date,
            rated_power_kwp: snapshot.and_then(infer_rated_power_kwp),
        })
    }

    fn compare(
        &self,
        snapshot: Option<&Map<String, Value>>,
        period: Period,
    ) -> Result<PeriodComparison, MonitoringError> {
        let current = self.resolve_period_energy(snapshot, &period)?;
        let prior_year_1 = self.resolve_period_energy(None, &period.years_back(1))?;
        let prior_year_2 = self.resolve_period_energy(None, &period.years_back(2))?;

        tracing::debug!(
            plant_id = self.plant_id,
            period = period.kind.label(),
            current = ?current,
            prior_year_1 = ?prior_year_1,
            prior_year_2 = ?prior_year_2,
            "period energy resolved"
        );

        Ok(PeriodComparison {
            current,
            prior_year_1,
            prior_year_2,
        })
    }

    /// Snapshot field first, then the summed daily series for the period.
    ///
    /// `None` means no source carried a usable number; it is never reported as zero.
    pub fn resolve_period_energy(
        &self,
        snapshot: Option<&Map<String, Value>>,
        period: &Period,
    ) -> Result<Option<f64>, MonitoringError> {
        if let Some(value) = snapshot.and_then(|object| find_number(object, snapshot_keys(period.kind)))
        {
            return Ok(Some(value));
        }

        let series = self.api.plant_energy_series(
            self.plant_id,
            period.start,
            period.end,
            Granularity::Day,
        )?;

        Ok(sum_energy(&series))
    }
}

fn snapshot_keys(kind: PeriodKind) -> &'static [&'static str] {
    match kind {
        PeriodKind::Today => TODAY_ENERGY_KEYS,
        PeriodKind::MonthToDate => MONTH_ENERGY_KEYS,
        PeriodKind::YearToDate => YEAR_ENERGY_KEYS,
    }
}

pub fn sum_energy(series: &Value) -> Option<f64> {
    let mut seen = 0_usize;
    let total: f64 = extract_rows(series, SERIES_ENVELOPE_KEYS)
        .iter()
        .filter_map(|row| row.as_object())
        .filter_map(|row| find_number(row, SERIES_ROW_ENERGY_KEYS))
        .inspect(|_| seen += 1)
        .sum();

    (seen > 0).then_some(total)
}

pub fn infer_rated_power_kwp(snapshot: &Map<String, Value>) -> Option<f64> {
    let raw = find_number(snapshot, RATED_POWER_KEYS)?;
    if raw > WATTS_HEURISTIC_THRESHOLD {
        Some(raw / 1000.0)
    } else {
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::{EnergyAggregator, infer_rated_power_kwp, sum_energy};
    use crate::domain::calendar::{Period, PeriodKind};
    use crate::test_support::FakeMonitoring;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn sums_rows_with_recognized_energy_fields() {
        let series = json!({"list": [
            {"date": "2025-10-01", "energy": "1,5"},
            {"date": "2025-10-02", "kwh": 2.5},
            {"date": "2025-10-03", "note": "offline"}
        ]});

        assert_eq!(sum_energy(&series), Some(4.0));
    }

    #[test]
    fn series_without_usable_rows_is_unknown_not_zero() {
        assert_eq!(sum_energy(&json!([])), None);
        assert_eq!(sum_energy(&json!({"list": [{"energy": ""}, {"status": 1}]})), None);
        assert_eq!(sum_energy(&json!({"unexpected": true})), None);
    }

    #[test]
    fn zero_production_rows_still_count_as_data() {
        assert_eq!(sum_energy(&json!([{"energy": 0}])), Some(0.0));
    }

    #[test]
    fn infers_rated_power_with_watts_heuristic() {
        let watts = json!({"peak_power": 8200});
        let kilowatts = json!({"nominalPower": "8,2"});
        let missing = json!({"name": "Roof"});

        assert_eq!(
            infer_rated_power_kwp(watts.as_object().unwrap()),
            Some(8.2)
        );
        assert_eq!(
            infer_rated_power_kwp(kilowatts.as_object().unwrap()),
            Some(8.2)
        );
        assert_eq!(infer_rated_power_kwp(missing.as_object().unwrap()), None);
    }

    #[test]
    fn snapshot_field_wins_over_series() {
        let api = FakeMonitoring::default()
            .with_snapshot("P1", json!({"today_energy": "12,3"}))
            .with_series("P1", date(2025, 10, 19), date(2025, 10, 19), json!([{"energy": 99}]));
        let aggregator = EnergyAggregator::new(&api, "P1");
        let snapshot = json!({"today_energy": "12,3"});

        let resolved = aggregator
            .resolve_period_energy(
                snapshot.as_object(),
                &Period::ending_on(PeriodKind::Today, date(2025, 10, 19)),
            )
            .expect("resolution should succeed");

        assert_eq!(resolved, Some(12.3));
        assert_eq!(api.series_calls(), 0);
    }

    #[test]
    fn falls_back_to_series_when_snapshot_field_is_not_numeric() {
        let api = FakeMonitoring::default().with_series(
            "P1",
            date(2025, 10, 1),
            date(2025, 10, 19),
            json!({"data": [{"energy": 100}, {"energy": 110.5}]}),
        );
        let aggregator = EnergyAggregator::new(&api, "P1");
        let snapshot = json!({"month_energy": "n/a"});

        let resolved = aggregator
            .resolve_period_energy(
                snapshot.as_object(),
                &Period::ending_on(PeriodKind::MonthToDate, date(2025, 10, 19)),
            )
            .expect("resolution should succeed");

        assert_eq!(resolved, Some(210.5));
    }

    #[test]
    fn aggregates_current_and_two_prior_years() {
        let day = date(2025, 10, 19);
        let api = FakeMonitoring::default()
            .with_snapshot(
                "P1",
                json!({"todayEnergy": 30, "monthEnergy": 400, "peak_power": 8200}),
            )
            .with_series("P1", date(2024, 10, 19), date(2024, 10, 19), json!([{"energy": 40}]))
            .with_series("P1", date(2023, 10, 19), date(2023, 10, 19), json!([{"energy": 35}]))
            .with_series("P1", date(2024, 10, 1), date(2024, 10, 19), json!([{"energy": 500}]))
            .with_series("P1", date(2023, 10, 1), date(2023, 10, 19), json!([]))
            .with_series("P1", date(2025, 1, 1), day, json!([{"energy": 9000}]))
            .with_series("P1", date(2024, 1, 1), date(2024, 10, 19), json!([{"energy": 10000}]))
            .with_series("P1", date(2023, 1, 1), date(2023, 10, 19), json!([{"energy": 9500}]));

        let aggregates = EnergyAggregator::new(&api, "P1")
            .aggregate(day)
            .expect("aggregation should succeed");

        assert_eq!(aggregates.today.current, Some(30.0));
        assert_eq!(aggregates.today.prior_year_1, Some(40.0));
        assert_eq!(aggregates.today.prior_year_2, Some(35.0));
        assert_eq!(aggregates.month_to_date.current, Some(400.0));
        assert_eq!(aggregates.month_to_date.prior_year_2, None);
        assert_eq!(aggregates.year_to_date.current, Some(9000.0));
        assert_eq!(aggregates.rated_power_kwp, Some(8.2));

        let ratios = aggregates.ratios();
        assert_eq!(ratios.today, Some(75.0));
        assert_eq!(ratios.month_to_date, Some(80.0));
        assert_eq!(ratios.year_to_date, Some(90.0));
    }

    #[test]
    fn transport_failure_propagates() {
        let api = FakeMonitoring::default().with_snapshot("P1", json!({}));
        let aggregator = EnergyAggregator::new(&api, "P1");

        let result = aggregator.aggregate(date(2025, 10, 19));

        assert!(result.is_err());
    }
}
