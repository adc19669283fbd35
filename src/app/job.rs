use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use chrono_tz::Tz;
use thiserror::Error;

use crate::domain::alarms::active_alarms;
use crate::domain::calendar::local_day;
use crate::domain::dispatch::{Clock, DispatchGate};
use crate::domain::energy::EnergyAggregator;
use crate::domain::models::{
    PlantConfig, RecipientOutcome, RunSummary, mask_recipient, normalize_recipient,
};
use crate::domain::ports::{
    MessagingApi, MonitoringApi, MonitoringError, OptOutStore, PlantConfigStore, StoreError,
};
use crate::domain::quiet_hours::QuietHours;
use crate::domain::report::{DailyReport, assemble};
use crate::domain::template::{TemplateSender, TemplateSettings};

const NO_ACTIVE_PLANTS_HINT: &str =
    "Run plants_init, then set \"active\": true for the plants to report in plants.json";
const NO_RECIPIENTS_HINT: &str = "Set WA_RECIPIENT_PHONES to a comma separated list of numbers";

#[derive(Debug, Error)]
pub enum JobError {
    #[error("a daily run is already in progress")]
    AlreadyRunning,
    #[error("failed to load plant configuration: {0}")]
    PlantStore(#[source] StoreError),
    #[error("invalid plant configuration: {0}")]
    InvalidPlant(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("energy data unavailable for plant {plant_id}: {source}")]
    Energy {
        plant_id: String,
        #[source]
        source: MonitoringError,
    },
}

#[derive(Debug, Clone)]
pub struct JobSettings {
    pub recipients: Vec<String>,
    pub timezone: Tz,
    pub quiet_hours: QuietHours,
    pub template: TemplateSettings,
}

/// Collaborators of a run, shared with the scheduler and the webhook.
#[derive(Clone)]
pub struct JobDeps {
    pub monitoring: Arc<dyn MonitoringApi>,
    pub messaging: Arc<dyn MessagingApi>,
    pub plants: Arc<dyn PlantConfigStore>,
    pub opt_outs: Arc<dyn OptOutStore>,
    pub clock: Arc<dyn Clock>,
}

pub struct DailyJob {
    deps: JobDeps,
    settings: JobSettings,
    running: AtomicBool,
}

struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct ActivePlant {
    config: PlantConfig,
    timezone: Tz,
}

impl DailyJob {
    pub fn new(deps: JobDeps, settings: JobSettings) -> Self {
        Self {
            deps,
            settings,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// One pass over every active plant and recipient.
    ///
    /// Configuration problems abort before any remote call. After that nothing aborts the run:
    /// failures end up as outcomes and `ok` is false.
    pub fn run(&self, force_send: bool) -> Result<RunSummary, JobError> {
        let _guard = RunGuard::acquire(&self.running).ok_or(JobError::AlreadyRunning)?;
        let started_at = self.deps.clock.now();

        tracing::info!(
            force_send,
            recipients = self.settings.recipients.len(),
            "daily job start"
        );

        if self.settings.recipients.is_empty() {
            tracing::warn!("no recipients configured");
            return Ok(self.aborted(
                force_send,
                started_at,
                0,
                "no_recipients",
                NO_RECIPIENTS_HINT,
            ));
        }

        let plants = self.active_plants()?;
        if plants.is_empty() {
            tracing::warn!("no active plants configured");
            return Ok(self.aborted(
                force_send,
                started_at,
                0,
                "no_active_plants",
                NO_ACTIVE_PLANTS_HINT,
            ));
        }

        let gate = DispatchGate::new(
            self.deps.opt_outs.as_ref(),
            self.settings.quiet_hours,
            self.settings.timezone,
        );
        let sender = TemplateSender::new(
            &gate,
            self.deps.messaging.as_ref(),
            &self.settings.template,
        );

        let mut outcomes = Vec::new();
        for plant in &plants {
            let plant_id = plant.config.plant_id.as_str();
            let reference_day = local_day(self.deps.clock.now(), plant.timezone);

            match self.build_report(&plant.config, reference_day) {
                Ok(report) => {
                    tracing::info!(
                        plant_id,
                        level = %report.level,
                        reference_day = %reference_day,
                        "plant report built"
                    );
                    for recipient in &self.settings.recipients {
                        outcomes.push(sender.send(
                            recipient,
                            &report,
                            self.deps.clock.now(),
                            force_send,
                        ));
                    }
                }
                Err(error) => {
                    tracing::error!(plant_id, error = %error, "plant report failed");
                    for recipient in &self.settings.recipients {
                        outcomes.push(RecipientOutcome::failed(
                            plant_id,
                            &normalize_recipient(recipient),
                            "report_failed",
                            &error,
                            None,
                        ));
                    }
                }
            }
        }

        let ok = outcomes.iter().all(RecipientOutcome::is_success);
        let sent = outcomes.iter().filter(|outcome| outcome.sent).count();
        let skipped = outcomes.iter().filter(|outcome| outcome.skipped).count();
        tracing::info!(
            ok,
            plants = plants.len(),
            outcomes = outcomes.len(),
            sent,
            skipped,
            failed = outcomes.len() - sent - skipped,
            "daily job end"
        );

        Ok(RunSummary {
            ok,
            reason: None,
            hint: None,
            force_send,
            started_at,
            finished_at: self.deps.clock.now(),
            plants: plants.len(),
            outcomes,
        })
    }

    pub fn build_report(
        &self,
        plant: &PlantConfig,
        reference_day: NaiveDate,
    ) -> Result<DailyReport, ReportError> {
        let monitoring = self.deps.monitoring.as_ref();
        let aggregates = EnergyAggregator::new(monitoring, &plant.plant_id)
            .aggregate(reference_day)
            .map_err(|source| ReportError::Energy {
                plant_id: plant.plant_id.clone(),
                source,
            })?;
        let ratios = aggregates.ratios();
        let alarms = active_alarms(monitoring, &plant.plant_id);

        Ok(assemble(plant, &aggregates, &ratios, &alarms))
    }

    fn active_plants(&self) -> Result<Vec<ActivePlant>, JobError> {
        let configured = self.deps.plants.load().map_err(JobError::PlantStore)?;
        let mut seen = HashSet::new();
        let mut active = Vec::new();

        for plant in configured.into_iter().filter(|plant| plant.active) {
            let plant_id = plant.plant_id.trim().to_string();
            if plant_id.is_empty() {
                return Err(JobError::InvalidPlant(
                    "active plant without plantId".to_string(),
                ));
            }
            if !seen.insert(plant_id.clone()) {
                return Err(JobError::InvalidPlant(format!(
                    "plantId {plant_id} is listed more than once"
                )));
            }

            let timezone = match plant.timezone.as_deref().map(str::trim) {
                Some(name) if !name.is_empty() => name.parse::<Tz>().map_err(|_| {
                    JobError::InvalidPlant(format!(
                        "plant {plant_id} has unknown timezone {name}"
                    ))
                })?,
                _ => self.settings.timezone,
            };

            active.push(ActivePlant {
                config: PlantConfig { plant_id, ..plant },
                timezone,
            });
        }

        Ok(active)
    }

    fn aborted(
        &self,
        force_send: bool,
        started_at: chrono::DateTime<chrono::Utc>,
        plants: usize,
        reason: &str,
        hint: &str,
    ) -> RunSummary {
        RunSummary {
            ok: false,
            reason: Some(reason.to_string()),
            hint: Some(hint.to_string()),
            force_send,
            started_at,
            finished_at: self.deps.clock.now(),
            plants,
            outcomes: Vec::new(),
        }
    }
}

/// Recipient list for logs.
pub fn masked_recipients(recipients: &[String]) -> Vec<String> {
    recipients
        .iter()
        .map(|recipient| mask_recipient(&normalize_recipient(recipient)))
        .collect()
}
