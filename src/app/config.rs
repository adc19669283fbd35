use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::adapters::messaging::MessagingSettings;
use crate::adapters::monitoring::MonitoringSettings;
use crate::app::AppError;
use crate::app::scheduler::DailySchedule;
use crate::domain::quiet_hours::QuietHours;
use crate::domain::template::TemplateSettings;

const RECIPIENT_KEYS: &[&str] = &[
    "WA_RECIPIENT_PHONES",
    "WA_TEST_RECIPIENT_PHONES",
    "WA_TEST_RECIPIENT_PHONE",
];

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub verify_token: Option<String>,
    pub app_secret: Option<String>,
    pub require_signature: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub monitoring: MonitoringSettings,
    pub messaging: MessagingSettings,
    pub template: TemplateSettings,
    pub recipients: Vec<String>,
    pub webhook: WebhookConfig,
    pub quiet_hours: QuietHours,
    pub timezone: Tz,
    pub daily_schedule: DailySchedule,
    pub http_bind: String,
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let monitoring = MonitoringSettings {
            base_url: required(&lookup, "GROWATT_BASE_URL")?,
            token: required_token(&lookup, "GROWATT_TOKEN")?,
            token_header: optional(&lookup, "GROWATT_TOKEN_HEADER")
                .unwrap_or_else(|| "token".to_string()),
            timeout: Duration::from_millis(parse_or_default(
                &lookup,
                "GROWATT_TIMEOUT_MS",
                20_000_u64,
            )?),
        };

        let messaging = MessagingSettings {
            graph_base_url: optional(&lookup, "WA_GRAPH_BASE_URL")
                .unwrap_or_else(|| "https://graph.facebook.com/v20.0".to_string()),
            phone_number_id: required_token(&lookup, "WA_PHONE_NUMBER_ID")?,
            access_token: required_token(&lookup, "WA_ACCESS_TOKEN")?,
            timeout: Duration::from_millis(parse_or_default(&lookup, "WA_TIMEOUT_MS", 20_000_u64)?),
        };

        let template = TemplateSettings {
            name: optional(&lookup, "WA_TEMPLATE_NAME")
                .or_else(|| optional(&lookup, "WA_DAILY_TEMPLATE_NAME"))
                .ok_or_else(|| AppError::config("WA_TEMPLATE_NAME is required"))?,
            language_code: optional(&lookup, "WA_TEMPLATE_LANG")
                .unwrap_or_else(|| "pt_BR".to_string()),
        };

        let quiet_hours = QuietHours::parse(
            &required(&lookup, "QUIET_HOURS_START")?,
            &required(&lookup, "QUIET_HOURS_END")?,
        )
        .map_err(|error| AppError::config(format!("QUIET_HOURS_START/END: {error}")))?;

        let timezone_name =
            optional(&lookup, "TIMEZONE").unwrap_or_else(|| "America/Chicago".to_string());
        let timezone = timezone_name.parse::<Tz>().map_err(|_| {
            AppError::config(format!("TIMEZONE {timezone_name} is not a known IANA zone"))
        })?;

        let daily_schedule = DailySchedule::parse(
            &optional(&lookup, "DAILY_JOB_CRON").unwrap_or_else(|| "0 8 * * *".to_string()),
        )
        .map_err(|error| AppError::config(format!("DAILY_JOB_CRON: {error}")))?;

        let webhook = WebhookConfig {
            verify_token: optional(&lookup, "WA_VERIFY_TOKEN"),
            app_secret: optional(&lookup, "APP_SECRET"),
            require_signature: parse_flag(&lookup, "REQUIRE_WEBHOOK_SIGNATURE")?,
        };

        Ok(Self {
            monitoring,
            messaging,
            template,
            recipients: recipients(&lookup),
            webhook,
            quiet_hours,
            timezone,
            daily_schedule,
            http_bind: optional(&lookup, "HTTP_BIND").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            data_dir: optional(&lookup, "DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
        })
    }

    /// Settings only the long-running service needs.
    pub fn validate_for_service(&self) -> Result<(), AppError> {
        if self.webhook.verify_token.is_none() {
            return Err(AppError::config("WA_VERIFY_TOKEN is required"));
        }
        if self.webhook.require_signature && self.webhook.app_secret.is_none() {
            return Err(AppError::config(
                "APP_SECRET is required when REQUIRE_WEBHOOK_SIGNATURE is enabled",
            ));
        }
        Ok(())
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).ok_or_else(|| AppError::config(format!("{key} is required")))
}

/// Credentials are sent as-is, so stray whitespace is an error rather than silently trimmed.
fn required_token<F>(lookup: &F, key: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::config(format!("{key} is required")))?;
    if raw.trim() != raw {
        return Err(AppError::config(format!(
            "{key} must not have leading or trailing whitespace"
        )));
    }
    Ok(raw)
}

fn recipients<F>(lookup: &F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    RECIPIENT_KEYS
        .iter()
        .find_map(|key| optional(lookup, key))
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|phone| !phone.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_flag<F>(lookup: &F, key: &str) -> Result<bool, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match optional(lookup, key).map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("0" | "false" | "no") => Ok(false),
        Some("1" | "true" | "yes") => Ok(true),
        Some(_) => Err(AppError::config(format!("{key} must be true or false"))),
    }
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{key} must be a valid number"))),
        None => Ok(default),
    }
}
