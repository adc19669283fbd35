use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{App, HttpServer, web};

use crate::adapters::messaging::WhatsAppCloudClient;
use crate::adapters::monitoring::GrowattHttpClient;
use crate::adapters::opt_out_store::JsonOptOutStore;
use crate::adapters::plant_store::JsonPlantStore;
use crate::adapters::webhook::{WebhookState, configure_routes};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::job::{DailyJob, JobDeps, JobSettings};
use crate::app::scheduler::start_scheduler;
use crate::domain::dispatch::SystemClock;
use crate::domain::models::RunSummary;
use crate::domain::ports::{MessagingApi, OptOutStore};

pub struct Services {
    pub job: Arc<DailyJob>,
    pub opt_outs: Arc<dyn OptOutStore>,
    pub messaging: Arc<dyn MessagingApi>,
}

/// Builds the blocking HTTP clients. Must run outside any async runtime.
pub fn build_services(config: &AppConfig) -> Result<Services, AppError> {
    let monitoring = GrowattHttpClient::new(&config.monitoring)
        .map_err(|error| AppError::client_init("monitoring", error))?;
    let messaging: Arc<dyn MessagingApi> = Arc::new(
        WhatsAppCloudClient::new(&config.messaging)
            .map_err(|error| AppError::client_init("messaging", error))?,
    );
    let opt_outs: Arc<dyn OptOutStore> = Arc::new(JsonOptOutStore::in_dir(&config.data_dir));

    let deps = JobDeps {
        monitoring: Arc::new(monitoring),
        messaging: Arc::clone(&messaging),
        plants: Arc::new(JsonPlantStore::in_dir(&config.data_dir)),
        opt_outs: Arc::clone(&opt_outs),
        clock: Arc::new(SystemClock),
    };
    let settings = JobSettings {
        recipients: config.recipients.clone(),
        timezone: config.timezone,
        quiet_hours: config.quiet_hours,
        template: config.template.clone(),
    };

    Ok(Services {
        job: Arc::new(DailyJob::new(deps, settings)),
        opt_outs,
        messaging,
    })
}

pub fn run_once(config: &AppConfig, force_send: bool) -> Result<RunSummary, AppError> {
    let services = build_services(config)?;
    Ok(services.job.run(force_send)?)
}

pub fn run_service(config: AppConfig) -> Result<(), AppError> {
    config.validate_for_service()?;
    let services = build_services(&config)?;

    let stop_flag = Arc::new(AtomicBool::new(false));
    let scheduler_handle = start_scheduler(
        Arc::clone(&services.job),
        config.daily_schedule,
        config.timezone,
        Arc::clone(&stop_flag),
    );

    let webhook_state = WebhookState {
        verify_token: config.webhook.verify_token.clone().unwrap_or_default(),
        app_secret: config.webhook.app_secret.clone(),
        require_signature: config.webhook.require_signature,
        opt_outs: Arc::clone(&services.opt_outs),
        messaging: Arc::clone(&services.messaging),
    };
    let http_bind = config.http_bind.clone();

    tracing::info!(bind = %http_bind, "http server starting");

    let server_result = actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(webhook_state.clone()))
                .configure(configure_routes)
        })
        .bind(&http_bind)?
        .run()
        .await
    });

    stop_flag.store(true, Ordering::Relaxed);
    if scheduler_handle.join().is_err() {
        return Err(AppError::runtime("scheduler thread panicked"));
    }

    // Blocking clients are released here, on a plain thread.
    drop(services);

    server_result.map_err(AppError::runtime)
}
