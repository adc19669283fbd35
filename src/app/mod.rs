pub mod cli;
pub mod config;
mod error;
pub mod job;
mod logging;
pub mod runtime;
pub mod scheduler;

pub use error::AppError;

use crate::domain::models::{RunSummary, mask_recipient};

/// Long-running mode: daily scheduler plus the inbound webhook.
pub fn run() -> Result<(), AppError> {
    let config = bootstrap(logging::init)?;

    tracing::info!(
        timezone = %config.timezone,
        daily_at = %config.daily_schedule.at,
        quiet_hours_start = %config.quiet_hours.start,
        quiet_hours_end = %config.quiet_hours.end,
        recipients = ?job::masked_recipients(&config.recipients),
        data_dir = %config.data_dir.display(),
        http_bind = %config.http_bind,
        "application bootstrap initialized"
    );

    runtime::run_service(config)
}

/// One manual run; logs go to stderr so stdout stays machine-readable.
pub fn run_report(force_send: bool) -> Result<RunSummary, AppError> {
    let config = bootstrap(logging::init_stderr)?;

    tracing::info!(
        force_send,
        template = %config.template.name,
        phone_number_id = %mask_recipient(&config.messaging.phone_number_id),
        "manual daily run"
    );

    runtime::run_once(&config, force_send)
}

/// Environment plus logging, for binaries that only need configuration.
pub fn load_config() -> Result<config::AppConfig, AppError> {
    bootstrap(logging::init_stderr)
}

fn bootstrap(init_logging: fn() -> Result<(), AppError>) -> Result<config::AppConfig, AppError> {
    let dotenv = dotenvy::dotenv();
    init_logging()?;

    if let Err(error) = dotenv
        && !error.not_found()
    {
        tracing::warn!(error = %error, ".env file could not be loaded");
    }

    config::AppConfig::from_env()
}
