use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantConfig {
    pub plant_id: String,
    #[serde(default)]
    pub plant_name: String,
    #[serde(default)]
    pub client_name: String,
    /// Manual override, kept verbatim (e.g. `"8,2"`).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_string_as_none"
    )]
    pub system_size_kwp: Option<String>,
    #[serde(default)]
    pub active: bool,
    /// IANA zone overriding the global one for this plant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl PlantConfig {
    pub fn display_name(&self) -> String {
        [self.client_name.trim(), self.plant_name.trim()]
            .into_iter()
            .find(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Plant {}", self.plant_id))
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|text| !text.trim().is_empty()))
}

pub fn normalize_recipient(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// `555***321`, for logs.
pub fn mask_recipient(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    if chars.len() <= 6 {
        return "***".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{head}***{tail}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientOutcome {
    pub plant_id: String,
    pub recipient: String,
    pub sent: bool,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecipientOutcome {
    pub fn sent(plant_id: &str, recipient: &str, provider_payload: Value) -> Self {
        Self {
            plant_id: plant_id.to_string(),
            recipient: recipient.to_string(),
            sent: true,
            skipped: false,
            reason: None,
            provider_payload: Some(provider_payload),
            error: None,
        }
    }

    pub fn skipped(plant_id: &str, recipient: &str, reason: &str) -> Self {
        Self {
            plant_id: plant_id.to_string(),
            recipient: recipient.to_string(),
            sent: false,
            skipped: true,
            reason: Some(reason.to_string()),
            provider_payload: None,
            error: None,
        }
    }

    pub fn failed(
        plant_id: &str,
        recipient: &str,
        reason: &str,
        error: impl std::fmt::Display,
        provider_payload: Option<Value>,
    ) -> Self {
        Self {
            plant_id: plant_id.to_string(),
            recipient: recipient.to_string(),
            sent: false,
            skipped: false,
            reason: Some(reason.to_string()),
            provider_payload,
            error: Some(error.to_string()),
        }
    }

    /// Sent and skipped both count as success for the run.
    pub fn is_success(&self) -> bool {
        self.sent || self.skipped
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub force_send: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub plants: usize,
    pub outcomes: Vec<RecipientOutcome>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{PlantConfig, RecipientOutcome, mask_recipient, normalize_recipient};

    #[test]
    fn deserializes_provisioned_plant_with_defaults() {
        let plant: PlantConfig = serde_json::from_value(json!({
            "plantId": "1234",
            "plantName": "Usina Sul",
            "clientName": "",
            "systemSizeKwp": ""
        }))
        .expect("plant should deserialize");

        assert_eq!(plant.system_size_kwp, None);
        assert!(!plant.active);
        assert_eq!(plant.display_name(), "Usina Sul");
    }

    #[test]
    fn normalizes_recipient_to_digits_only() {
        assert_eq!(normalize_recipient("+55 (11) 98765-4321"), "5511987654321");
        assert_eq!(normalize_recipient("abc"), "");
    }

    #[test]
    fn masks_recipient_for_logs() {
        assert_eq!(mask_recipient("5511987654321"), "551***321");
        assert_eq!(mask_recipient("12345"), "***");
    }

    #[test]
    fn display_name_falls_back_to_plant_id() {
        let plant: PlantConfig =
            serde_json::from_value(json!({"plantId": "77", "active": true})).expect("valid");

        assert_eq!(plant.display_name(), "Plant 77");
    }

    #[test]
    fn serializes_outcome_without_empty_fields() {
        let outcome = RecipientOutcome::skipped("P1", "5511***999", "quiet_hours");

        assert_eq!(
            serde_json::to_value(&outcome).expect("serializable"),
            json!({
                "plantId": "P1",
                "recipient": "5511***999",
                "sent": false,
                "skipped": true,
                "reason": "quiet_hours"
            })
        );
        assert!(outcome.is_success());
    }
}
