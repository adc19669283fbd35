use chrono::Datelike;
use serde::Serialize;

use crate::domain::alarms::ActiveAlarm;
use crate::domain::energy::{EnergyAggregates, PerformanceRatios, PeriodComparison};
use crate::domain::models::PlantConfig;
use crate::domain::numeric::{PLACEHOLDER, format_kwh, format_pct};

pub const LOW_PERFORMANCE_THRESHOLD_PCT: f64 = 80.0;
pub const NORMAL_OPERATION_MESSAGE: &str =
    "Sistema operando normalmente. Nenhuma falha ativa detectada";
const UNNAMED_FAULT_MESSAGE: &str = "Falha ativa detectada no inversor";
const MAX_ALARM_NAMES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertLevel {
    #[serde(rename = "OK")]
    Ok,
    Alerta,
    Falha,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Ok => "OK",
            AlertLevel::Alerta => "Alerta",
            AlertLevel::Falha => "Falha",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodFigures {
    pub value_kwh: String,
    pub performance_pct: String,
    pub prior_year_1_kwh: String,
    pub prior_year_2_kwh: String,
}

impl PeriodFigures {
    fn from_comparison(comparison: &PeriodComparison, performance: Option<f64>) -> Self {
        Self {
            value_kwh: format_kwh(comparison.current),
            performance_pct: format_pct(performance),
            prior_year_1_kwh: format_kwh(comparison.prior_year_1),
            prior_year_2_kwh: format_kwh(comparison.prior_year_2),
        }
    }
}

/// Display-ready report for one plant. Every field is already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub plant_id: String,
    pub client_name: String,
    pub system_size_kwp: String,
    pub today: PeriodFigures,
    pub month_to_date: PeriodFigures,
    pub year_to_date: PeriodFigures,
    pub message: String,
    pub level: String,
}

pub fn assemble(
    plant: &PlantConfig,
    aggregates: &EnergyAggregates,
    ratios: &PerformanceRatios,
    alarms: &[ActiveAlarm],
) -> DailyReport {
    let (level, message) = alert(aggregates, ratios, alarms);

    DailyReport {
        plant_id: plant.plant_id.clone(),
        client_name: plant.display_name(),
        system_size_kwp: system_size_kwp(plant, aggregates.rated_power_kwp),
        today: PeriodFigures::from_comparison(&aggregates.today, ratios.today),
        month_to_date: PeriodFigures::from_comparison(
            &aggregates.month_to_date,
            ratios.month_to_date,
        ),
        year_to_date: PeriodFigures::from_comparison(&aggregates.year_to_date, ratios.year_to_date),
        message: strip_trailing_periods(&message),
        level: strip_trailing_periods(level.as_str()),
    }
}

fn alert(
    aggregates: &EnergyAggregates,
    ratios: &PerformanceRatios,
    alarms: &[ActiveAlarm],
) -> (AlertLevel, String) {
    if !alarms.is_empty() {
        let names: Vec<&str> = alarms
            .iter()
            .filter_map(|alarm| alarm.name.as_deref())
            .take(MAX_ALARM_NAMES)
            .collect();
        let message = if names.is_empty() {
            UNNAMED_FAULT_MESSAGE.to_string()
        } else {
            format!("Falha ativa: {}", names.join("; "))
        };
        return (AlertLevel::Falha, message);
    }

    if let Some(pct) = ratios.today
        && pct < LOW_PERFORMANCE_THRESHOLD_PCT
    {
        let baseline_year = aggregates.reference_day.year() - 1;
        return (
            AlertLevel::Alerta,
            format!(
                "Performance baixa hoje ({}%) vs {baseline_year}",
                format_pct(Some(pct))
            ),
        );
    }

    (AlertLevel::Ok, NORMAL_OPERATION_MESSAGE.to_string())
}

/// Manual override first, then the rated power read from the plant snapshot.
fn system_size_kwp(plant: &PlantConfig, rated_power_kwp: Option<f64>) -> String {
    if let Some(manual) = plant
        .system_size_kwp
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return manual.to_string();
    }

    match rated_power_kwp {
        Some(kwp) => format_kwh(Some(kwp)),
        None => PLACEHOLDER.to_string(),
    }
}

/// The message template supplies its own closing punctuation.
pub fn strip_trailing_periods(text: &str) -> String {
    text.trim().trim_end_matches('.').to_string()
}
