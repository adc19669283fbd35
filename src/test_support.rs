use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::domain::dispatch::Clock;
use crate::domain::models::{PlantConfig, normalize_recipient};
use crate::domain::ports::{
    Granularity, MessagingApi, MessagingError, MonitoringApi, MonitoringError, OptOutStore,
    PlantConfigStore, StoreError, TemplateReceipt, TemplateRequest,
};

fn not_found(path: String) -> MonitoringError {
    MonitoringError::Status {
        path,
        status: 404,
        body: "not registered in fake".to_string(),
    }
}

/// Canned monitoring responses keyed by plant, period or device. Anything not registered fails.
#[derive(Debug, Default)]
pub struct FakeMonitoring {
    snapshots: HashMap<String, Value>,
    series: HashMap<(String, NaiveDate, NaiveDate), Value>,
    devices: HashMap<String, Value>,
    alarms: HashMap<String, Value>,
    series_calls: AtomicUsize,
    alarm_calls: AtomicUsize,
}

impl FakeMonitoring {
    pub fn with_snapshot(mut self, plant_id: &str, payload: Value) -> Self {
        self.snapshots.insert(plant_id.to_string(), payload);
        self
    }

    pub fn with_series(
        mut self,
        plant_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        payload: Value,
    ) -> Self {
        self.series
            .insert((plant_id.to_string(), start, end), payload);
        self
    }

    pub fn with_devices(mut self, plant_id: &str, payload: Value) -> Self {
        self.devices.insert(plant_id.to_string(), payload);
        self
    }

    pub fn with_alarms(mut self, device_sn: &str, payload: Value) -> Self {
        self.alarms.insert(device_sn.to_string(), payload);
        self
    }

    pub fn series_calls(&self) -> usize {
        self.series_calls.load(Ordering::SeqCst)
    }

    pub fn alarm_calls(&self) -> usize {
        self.alarm_calls.load(Ordering::SeqCst)
    }
}

impl MonitoringApi for FakeMonitoring {
    fn list_plants(&self) -> Result<Value, MonitoringError> {
        Err(not_found("/plant/list".to_string()))
    }

    fn plant_snapshot(&self, plant_id: &str) -> Result<Value, MonitoringError> {
        self.snapshots
            .get(plant_id)
            .cloned()
            .ok_or_else(|| not_found(format!("/plant/data?plant_id={plant_id}")))
    }

    fn plant_energy_series(
        &self,
        plant_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        _granularity: Granularity,
    ) -> Result<Value, MonitoringError> {
        self.series_calls.fetch_add(1, Ordering::SeqCst);
        self.series
            .get(&(plant_id.to_string(), start, end))
            .cloned()
            .ok_or_else(|| not_found(format!("/plant/energy?plant_id={plant_id}&{start}..{end}")))
    }

    fn list_devices(&self, plant_id: &str) -> Result<Value, MonitoringError> {
        self.devices
            .get(plant_id)
            .cloned()
            .ok_or_else(|| not_found(format!("/device/list?plant_id={plant_id}")))
    }

    fn device_alarms(&self, device_sn: &str) -> Result<Value, MonitoringError> {
        self.alarm_calls.fetch_add(1, Ordering::SeqCst);
        self.alarms
            .get(device_sn)
            .cloned()
            .ok_or_else(|| not_found(format!("/device/inverter/alarm?device_sn={device_sn}")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTemplate {
    pub recipient: String,
    pub template_name: String,
    pub language_code: String,
    pub variables: Vec<String>,
}

/// Records every send; recipients registered with [`FakeMessaging::failing_for`] get a provider error.
#[derive(Debug, Default)]
pub struct FakeMessaging {
    failures: HashMap<String, Value>,
    templates: Mutex<Vec<RecordedTemplate>>,
    texts: Mutex<Vec<(String, String)>>,
}

impl FakeMessaging {
    pub fn failing_for(mut self, recipient: &str, payload: Value) -> Self {
        self.failures.insert(recipient.to_string(), payload);
        self
    }

    pub fn template_calls(&self) -> Vec<RecordedTemplate> {
        self.templates.lock().expect("fake lock").clone()
    }

    pub fn text_calls(&self) -> Vec<(String, String)> {
        self.texts.lock().expect("fake lock").clone()
    }
}

impl MessagingApi for FakeMessaging {
    fn send_template(
        &self,
        request: &TemplateRequest<'_>,
    ) -> Result<TemplateReceipt, MessagingError> {
        self.templates
            .lock()
            .expect("fake lock")
            .push(RecordedTemplate {
                recipient: request.recipient.to_string(),
                template_name: request.template_name.to_string(),
                language_code: request.language_code.to_string(),
                variables: request.variables.to_vec(),
            });

        if let Some(payload) = self.failures.get(request.recipient) {
            return Err(MessagingError::Provider {
                status: 400,
                payload: payload.clone(),
            });
        }

        let payload = serde_json::json!({
            "messages": [{ "id": format!("wamid.{}", request.recipient) }]
        });
        Ok(TemplateReceipt {
            message_id: Some(format!("wamid.{}", request.recipient)),
            payload,
        })
    }

    fn send_text(&self, recipient: &str, text: &str) -> Result<(), MessagingError> {
        self.texts
            .lock()
            .expect("fake lock")
            .push((recipient.to_string(), text.to_string()));

        match self.failures.get(recipient) {
            Some(payload) => Err(MessagingError::Provider {
                status: 400,
                payload: payload.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOptOutStore {
    entries: Mutex<BTreeSet<String>>,
}

impl OptOutStore for InMemoryOptOutStore {
    fn is_opted_out(&self, recipient: &str) -> Result<bool, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.contains(&normalize_recipient(recipient)))
    }

    fn opt_out(&self, recipient: &str) -> Result<bool, StoreError> {
        let normalized = normalize_recipient(recipient);
        if normalized.is_empty() {
            return Ok(false);
        }
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        entries.insert(normalized);
        Ok(true)
    }

    fn opt_in(&self, recipient: &str) -> Result<bool, StoreError> {
        let normalized = normalize_recipient(recipient);
        if normalized.is_empty() {
            return Ok(false);
        }
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        entries.remove(&normalized);
        Ok(true)
    }
}

/// Every call fails, as an unreadable opt-out file would.
#[derive(Debug, Clone, Copy)]
pub struct FailingOptOutStore;

impl OptOutStore for FailingOptOutStore {
    fn is_opted_out(&self, _recipient: &str) -> Result<bool, StoreError> {
        Err(StoreError::LockPoisoned)
    }

    fn opt_out(&self, _recipient: &str) -> Result<bool, StoreError> {
        Err(StoreError::LockPoisoned)
    }

    fn opt_in(&self, _recipient: &str) -> Result<bool, StoreError> {
        Err(StoreError::LockPoisoned)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPlantStore {
    plants: Mutex<Vec<PlantConfig>>,
}

impl InMemoryPlantStore {
    pub fn with_plants(plants: Vec<PlantConfig>) -> Self {
        Self {
            plants: Mutex::new(plants),
        }
    }
}

impl PlantConfigStore for InMemoryPlantStore {
    fn load(&self) -> Result<Vec<PlantConfig>, StoreError> {
        Ok(self
            .plants
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .clone())
    }

    fn save(&self, plants: &[PlantConfig]) -> Result<(), StoreError> {
        *self.plants.lock().map_err(|_| StoreError::LockPoisoned)? = plants.to_vec();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn plant(plant_id: &str, active: bool) -> PlantConfig {
    PlantConfig {
        plant_id: plant_id.to_string(),
        plant_name: format!("Usina {plant_id}"),
        client_name: format!("Cliente {plant_id}"),
        system_size_kwp: None,
        active,
        timezone: None,
    }
}
