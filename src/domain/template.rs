use chrono::{DateTime, Utc};

use crate::domain::dispatch::{DispatchGate, GateDecision};
use crate::domain::models::{RecipientOutcome, mask_recipient, normalize_recipient};
use crate::domain::ports::{MessagingApi, TEMPLATE_VARIABLE_COUNT, TemplateRequest};
use crate::domain::report::{DailyReport, PeriodFigures};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSettings {
    pub name: String,
    pub language_code: String,
}

/// Template body variables `{{1}}`..`{{16}}`:
/// client, system size, then value / performance / prior year 1 / prior year 2 for
/// today, month-to-date and year-to-date, then message and level.
pub fn template_variables(report: &DailyReport) -> [String; TEMPLATE_VARIABLE_COUNT] {
    let [t1, t2, t3, t4] = period_variables(&report.today);
    let [m1, m2, m3, m4] = period_variables(&report.month_to_date);
    let [y1, y2, y3, y4] = period_variables(&report.year_to_date);

    [
        report.client_name.clone(),
        report.system_size_kwp.clone(),
        t1,
        t2,
        t3,
        t4,
        m1,
        m2,
        m3,
        m4,
        y1,
        y2,
        y3,
        y4,
        report.message.clone(),
        report.level.clone(),
    ]
}

fn period_variables(figures: &PeriodFigures) -> [String; 4] {
    [
        figures.value_kwh.clone(),
        figures.performance_pct.clone(),
        figures.prior_year_1_kwh.clone(),
        figures.prior_year_2_kwh.clone(),
    ]
}

pub struct TemplateSender<'a> {
    gate: &'a DispatchGate<'a>,
    messaging: &'a dyn MessagingApi,
    template: &'a TemplateSettings,
}

impl<'a> TemplateSender<'a> {
    pub fn new(
        gate: &'a DispatchGate<'a>,
        messaging: &'a dyn MessagingApi,
        template: &'a TemplateSettings,
    ) -> Self {
        Self {
            gate,
            messaging,
            template,
        }
    }

    /// Gate, then at most one provider call. Never returns an error: every path is an outcome.
    pub fn send(
        &self,
        recipient: &str,
        report: &DailyReport,
        now: DateTime<Utc>,
        force_send: bool,
    ) -> RecipientOutcome {
        let plant_id = report.plant_id.as_str();
        let to = normalize_recipient(recipient);
        let masked = mask_recipient(&to);

        if to.is_empty() {
            tracing::error!(plant_id, "recipient has no digits; not sending");
            return RecipientOutcome::failed(
                plant_id,
                recipient,
                "invalid_recipient",
                "recipient is empty after normalization",
                None,
            );
        }

        match self.gate.should_send(&to, now, force_send) {
            Ok(GateDecision::Allow) => {}
            Ok(GateDecision::Suppress(reason)) => {
                tracing::info!(plant_id, recipient = %masked, reason = reason.as_str(), "send skipped");
                return RecipientOutcome::skipped(plant_id, &to, reason.as_str());
            }
            Err(error) => {
                tracing::error!(plant_id, recipient = %masked, error = %error, "opt-out state unavailable; not sending");
                return RecipientOutcome::failed(plant_id, &to, "opt_out_unavailable", error, None);
            }
        }

        let variables = template_variables(report);
        let request = TemplateRequest {
            recipient: &to,
            template_name: &self.template.name,
            language_code: &self.template.language_code,
            variables: &variables,
        };

        match self.messaging.send_template(&request) {
            Ok(receipt) => {
                tracing::info!(
                    plant_id,
                    recipient = %masked,
                    message_id = receipt.message_id.as_deref().unwrap_or("-"),
                    "template sent"
                );
                RecipientOutcome::sent(plant_id, &to, receipt.payload)
            }
            Err(error) => {
                tracing::error!(
                    plant_id,
                    recipient = %masked,
                    error = %error,
                    provider_payload = ?error.provider_payload(),
                    "template send failed"
                );
                RecipientOutcome::failed(
                    plant_id,
                    &to,
                    error.reason(),
                    &error,
                    error.provider_payload().cloned(),
                )
            }
        }
    }
}
