use serde_json::{Map, Value};

use crate::domain::numeric::{extract_rows, find_text, find_value, value_text};
use crate::domain::ports::MonitoringApi;

/// Upper bound on devices queried per plant.
pub const MAX_DEVICES_PER_PLANT: usize = 6;

const DEVICE_ENVELOPE_KEYS: &[&str] = &["list", "data"];
const DEVICE_SN_KEYS: &[&str] = &["device_sn", "deviceSn", "sn"];
const ALARM_ENVELOPE_KEYS: &[&str] = &["list", "data"];
const SOLVED_KEYS: &[&str] = &["is_solved", "isSolved", "solved"];
const STATUS_KEYS: &[&str] = &["status", "alarm_status", "alarmStatus"];
const NAME_KEYS: &[&str] = &["alarm_name", "alarmName", "name", "msg", "message"];

const SOLVED_TOKENS: &[&str] = &["1", "true"];
const RESOLVED_STATUS_TOKENS: &[&str] = &["0", "resolved"];

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveAlarm {
    pub device_sn: String,
    pub name: Option<String>,
    pub raw: Value,
}

/// Alarms not explicitly marked solved, across at most [`MAX_DEVICES_PER_PLANT`] devices.
///
/// Never fails: a broken device listing yields no alarms and a broken device is skipped.
pub fn active_alarms<M: MonitoringApi + ?Sized>(api: &M, plant_id: &str) -> Vec<ActiveAlarm> {
    let devices = match api.list_devices(plant_id) {
        Ok(devices) => devices,
        Err(error) => {
            tracing::warn!(plant_id, error = %error, "device listing failed; reporting no alarms");
            return Vec::new();
        }
    };

    let serials: Vec<String> = extract_rows(&devices, DEVICE_ENVELOPE_KEYS)
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|device| find_text(device, DEVICE_SN_KEYS))
        .take(MAX_DEVICES_PER_PLANT)
        .collect();

    let mut active = Vec::new();
    for device_sn in serials {
        let payload = match api.device_alarms(&device_sn) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(plant_id, device_sn = %device_sn, error = %error, "alarm fetch failed; skipping device");
                continue;
            }
        };

        for alarm in extract_rows(&payload, ALARM_ENVELOPE_KEYS) {
            let Some(object) = alarm.as_object() else {
                continue;
            };
            if is_resolved(object) {
                continue;
            }
            active.push(ActiveAlarm {
                device_sn: device_sn.clone(),
                name: find_text(object, NAME_KEYS),
                raw: alarm.clone(),
            });
        }
    }

    if !active.is_empty() {
        tracing::info!(plant_id, count = active.len(), "active alarms detected");
    }

    active
}

pub fn is_resolved(alarm: &Map<String, Value>) -> bool {
    matches_token(alarm, SOLVED_KEYS, SOLVED_TOKENS)
        || matches_token(alarm, STATUS_KEYS, RESOLVED_STATUS_TOKENS)
}

fn matches_token(alarm: &Map<String, Value>, keys: &[&str], tokens: &[&str]) -> bool {
    find_value(alarm, keys)
        .and_then(value_text)
        .map(|text| {
            let text = text.trim();
            tokens.iter().any(|token| text.eq_ignore_ascii_case(token))
        })
        .unwrap_or(false)
}
