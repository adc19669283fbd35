use serde_json::{Map, Value};

pub const PLACEHOLDER: &str = "-";

/// Returns the first alias whose value is present and non-empty.
///
/// Exact keys are probed in priority order first; if none match, keys are compared after
/// normalization (ASCII alphanumerics, lowercased) so `todayEnergy` also finds `today_energy`.
pub fn find_value<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    for alias in aliases {
        if let Some(value) = object.get(*alias)
            && is_present(value)
        {
            return Some(value);
        }
    }

    let normalized_aliases: Vec<String> =
        aliases.iter().map(|alias| key_fingerprint(alias)).collect();

    normalized_aliases.iter().find_map(|alias| {
        object.iter().find_map(|(key, value)| {
            if &key_fingerprint(key) == alias && is_present(value) {
                Some(value)
            } else {
                None
            }
        })
    })
}

pub fn find_number(object: &Map<String, Value>, aliases: &[&str]) -> Option<f64> {
    find_value(object, aliases).and_then(parse_f64)
}

pub fn find_text(object: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    find_value(object, aliases)
        .and_then(value_text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Renders scalars the way they read in a payload: `true`, `1`, `resolved`.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        _ => true,
    }
}

fn key_fingerprint(key: &str) -> String {
    key.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|char| char.to_ascii_lowercase())
        .collect()
}

pub fn parse_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|parsed| parsed.is_finite()),
        Value::String(text) => parse_decimal(text),
        _ => None,
    }
}

/// `"12,3"`, `"12.3"` and `"12,3 kWh"` all read as 12.3. Digit grouping is not supported.
fn parse_decimal(text: &str) -> Option<f64> {
    let digits = text
        .trim()
        .trim_end_matches(|char: char| char.is_alphabetic() || char.is_whitespace());

    digits
        .replacen(',', ".", 1)
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

/// One decimal digit with a comma separator, `-` when unknown. Halves round away from zero.
pub fn format_kwh(value: Option<f64>) -> String {
    match value {
        Some(number) if number.is_finite() => {
            let tenths = (number * 10.0).round() / 10.0;
            format!("{tenths:.1}").replace('.', ",")
        }
        _ => PLACEHOLDER.to_string(),
    }
}

pub fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(number) if number.is_finite() => format!("{}", number.round() as i64),
        _ => PLACEHOLDER.to_string(),
    }
}

/// `current / baseline * 100`, undefined for a missing or non-positive baseline.
pub fn ratio_pct(current: Option<f64>, baseline: Option<f64>) -> Option<f64> {
    match (current, baseline) {
        (Some(current), Some(baseline))
            if current.is_finite() && baseline.is_finite() && baseline > 0.0 =>
        {
            Some(current / baseline * 100.0)
        }
        _ => None,
    }
}

/// Accepts a bare JSON array or one nested under any of `keys`.
pub fn extract_rows<'a>(payload: &'a Value, keys: &[&str]) -> &'a [Value] {
    if let Value::Array(rows) = payload {
        return rows;
    }

    keys.iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
