//! Seams the report pipeline calls through. Concrete HTTP clients and file stores live in
//! `adapters` and implement these.

use std::io;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

use crate::domain::models::PlantConfig;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Read-only view of the plant monitoring API.
///
/// Every call returns the provider's JSON as-is; field names differ across device generations,
/// so callers probe aliases instead of deserializing into fixed structs.
pub trait MonitoringApi: Send + Sync {
    fn list_plants(&self) -> Result<Value, MonitoringError>;
    fn plant_snapshot(&self, plant_id: &str) -> Result<Value, MonitoringError>;
    fn plant_energy_series(
        &self,
        plant_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        granularity: Granularity,
    ) -> Result<Value, MonitoringError>;
    fn list_devices(&self, plant_id: &str) -> Result<Value, MonitoringError>;
    fn device_alarms(&self, device_sn: &str) -> Result<Value, MonitoringError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Month,
    Year,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }
}

#[derive(Debug, Error)]
pub enum MonitoringError {
    #[error("failed to build monitoring http client: {0}")]
    ClientBuild(#[source] BoxError),
    #[error("monitoring request {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: BoxError,
    },
    #[error("monitoring request {path} returned HTTP {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },
    #[error("monitoring response for {path} is not valid JSON: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Number of body variables the daily report template declares.
pub const TEMPLATE_VARIABLE_COUNT: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRequest<'a> {
    pub recipient: &'a str,
    pub template_name: &'a str,
    pub language_code: &'a str,
    pub variables: &'a [String],
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateReceipt {
    pub message_id: Option<String>,
    pub payload: Value,
}

pub trait MessagingApi: Send + Sync {
    fn send_template(
        &self,
        request: &TemplateRequest<'_>,
    ) -> Result<TemplateReceipt, MessagingError>;
    fn send_text(&self, recipient: &str, text: &str) -> Result<(), MessagingError>;
}

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("failed to build messaging http client: {0}")]
    ClientBuild(#[source] BoxError),
    #[error("template requires exactly {expected} variables, got {actual}")]
    VariableCount { expected: usize, actual: usize },
    #[error("recipient is empty after normalization")]
    EmptyRecipient,
    #[error("messaging request failed: {0}")]
    Transport(#[source] BoxError),
    #[error("messaging provider rejected the request with HTTP {status}")]
    Provider { status: u16, payload: Value },
}

impl MessagingError {
    /// The provider's raw error body, when there is one.
    pub fn provider_payload(&self) -> Option<&Value> {
        match self {
            MessagingError::Provider { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            MessagingError::Provider { .. } => "provider_error",
            MessagingError::Transport(_) => "transport_error",
            MessagingError::VariableCount { .. } | MessagingError::EmptyRecipient => {
                "invalid_request"
            }
            MessagingError::ClientBuild(_) => "client_error",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Recipients who asked not to be messaged. Identifiers are digits-only phone numbers.
pub trait OptOutStore: Send + Sync {
    fn is_opted_out(&self, recipient: &str) -> Result<bool, StoreError>;
    /// Returns `false` when the identifier normalizes to nothing.
    fn opt_out(&self, recipient: &str) -> Result<bool, StoreError>;
    fn opt_in(&self, recipient: &str) -> Result<bool, StoreError>;
}

pub trait PlantConfigStore: Send + Sync {
    fn load(&self) -> Result<Vec<PlantConfig>, StoreError>;
    fn save(&self, plants: &[PlantConfig]) -> Result<(), StoreError>;
}
