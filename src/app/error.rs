use thiserror::Error;

use crate::app::job::JobError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to build {client} client: {message}")]
    ClientInit {
        client: &'static str,
        message: String,
    },
    #[error("daily job failed: {0}")]
    Job(#[from] JobError),
    #[error("runtime failure: {0}")]
    Runtime(String),
}

impl AppError {
    pub fn logging_init<E: std::fmt::Display>(error: E) -> Self {
        Self::LoggingInit(error.to_string())
    }

    pub fn config<E: std::fmt::Display>(error: E) -> Self {
        Self::Config(error.to_string())
    }

    pub fn client_init<E: std::fmt::Display>(client: &'static str, error: E) -> Self {
        Self::ClientInit {
            client,
            message: error.to_string(),
        }
    }

    pub fn runtime<E: std::fmt::Display>(error: E) -> Self {
        Self::Runtime(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;
    use crate::app::job::JobError;

    #[test]
    fn maps_logging_init_error_message() {
        let err = AppError::logging_init("subscriber already set");
        assert_eq!(
            err.to_string(),
            "failed to initialize logging: subscriber already set"
        );
    }

    #[test]
    fn wraps_job_errors() {
        let err = AppError::from(JobError::AlreadyRunning);
        assert_eq!(
            err.to_string(),
            "daily job failed: a daily run is already in progress"
        );
    }
}
