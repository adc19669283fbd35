use tracing_subscriber::{EnvFilter, fmt};

use crate::app::AppError;

pub fn init() -> Result<(), AppError> {
    fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init()
        .map_err(AppError::logging_init)
}

/// For one-shot commands whose stdout carries the result.
pub fn init_stderr() -> Result<(), AppError> {
    fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(AppError::logging_init)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
