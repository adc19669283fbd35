use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::domain::ports::{Granularity, MonitoringApi, MonitoringError};

#[derive(Debug, Clone)]
pub struct MonitoringSettings {
    pub base_url: String,
    pub token: String,
    pub token_header: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct GrowattHttpClient {
    base_url: String,
    token: String,
    token_header: String,
    client: Client,
}

impl GrowattHttpClient {
    pub fn new(settings: &MonitoringSettings) -> Result<Self, MonitoringError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|error| MonitoringError::ClientBuild(error.into()))?;

        Ok(Self {
            base_url: versioned_base_url(&settings.base_url),
            token: settings.token.clone(),
            token_header: settings.token_header.clone(),
            client,
        })
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, MonitoringError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header(self.token_header.as_str(), self.token.as_str())
            .query(query)
            .send()
            .map_err(|source| {
                tracing::error!(path, error = %source, "monitoring request failed");
                MonitoringError::Transport {
                    path: path.to_string(),
                    source: source.into(),
                }
            })?;

        let status = response.status();
        let body = response.text().map_err(|source| MonitoringError::Transport {
            path: path.to_string(),
            source: source.into(),
        })?;

        if !status.is_success() {
            tracing::error!(path, status = status.as_u16(), body = %body, "monitoring request rejected");
            return Err(MonitoringError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value =
            serde_json::from_str(&body).map_err(|source| MonitoringError::Decode {
                path: path.to_string(),
                source,
            })?;

        Ok(unwrap_envelope(payload))
    }
}

impl MonitoringApi for GrowattHttpClient {
    fn list_plants(&self) -> Result<Value, MonitoringError> {
        self.get("/plant/list", &[])
    }

    fn plant_snapshot(&self, plant_id: &str) -> Result<Value, MonitoringError> {
        self.get("/plant/data", &[("plant_id", plant_id)])
    }

    fn plant_energy_series(
        &self,
        plant_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        granularity: Granularity,
    ) -> Result<Value, MonitoringError> {
        let start_date = start.format("%Y-%m-%d").to_string();
        let end_date = end.format("%Y-%m-%d").to_string();
        self.get(
            "/plant/energy",
            &[
                ("plant_id", plant_id),
                ("start_date", start_date.as_str()),
                ("end_date", end_date.as_str()),
                ("time_unit", granularity.as_str()),
            ],
        )
    }

    fn list_devices(&self, plant_id: &str) -> Result<Value, MonitoringError> {
        self.get("/device/list", &[("plant_id", plant_id)])
    }

    fn device_alarms(&self, device_sn: &str) -> Result<Value, MonitoringError> {
        self.get("/device/inverter/alarm", &[("device_sn", device_sn)])
    }
}

fn versioned_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

/// Most endpoints wrap the useful part as `{"data": ...}`.
fn unwrap_envelope(payload: Value) -> Value {
    match payload {
        Value::Object(mut object) if object.contains_key("data") => {
            object.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{unwrap_envelope, versioned_base_url};

    #[test]
    fn appends_api_version_once() {
        assert_eq!(
            versioned_base_url("https://openapi.growatt.com/"),
            "https://openapi.growatt.com/v1"
        );
        assert_eq!(
            versioned_base_url("https://openapi.growatt.com/v1//"),
            "https://openapi.growatt.com/v1"
        );
    }

    #[test]
    fn unwraps_data_envelope() {
        let wrapped = json!({"error_code": 0, "data": {"today_energy": "4.2"}});
        let bare = json!({"today_energy": "4.2"});

        assert_eq!(unwrap_envelope(wrapped), json!({"today_energy": "4.2"}));
        assert_eq!(unwrap_envelope(bare.clone()), bare);
    }
}
