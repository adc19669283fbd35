use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, get, post, web};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use crate::domain::inbound::{
    InboundCommand, InboundMessage, extract_inbound_messages, parse_command,
};
use crate::domain::models::{mask_recipient, normalize_recipient};
use crate::domain::ports::{MessagingApi, OptOutStore};

pub const SERVICE_NAME: &str = "solar-daily-report";
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct WebhookState {
    pub verify_token: String,
    pub app_secret: Option<String>,
    pub require_signature: bool,
    pub opt_outs: Arc<dyn OptOutStore>,
    pub messaging: Arc<dyn MessagingApi>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(verify_subscription)
        .service(receive_events);
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "ok": true, "service": SERVICE_NAME }))
}

#[get("/webhook")]
async fn verify_subscription(
    state: web::Data<WebhookState>,
    query: web::Query<VerifyQuery>,
) -> impl Responder {
    let subscribed = query.mode.as_deref() == Some("subscribe")
        && query.verify_token.as_deref() == Some(state.verify_token.as_str());

    if subscribed {
        tracing::info!("webhook subscription verified");
        HttpResponse::Ok()
            .content_type("text/plain")
            .body(query.challenge.clone().unwrap_or_default())
    } else {
        tracing::warn!(mode = query.mode.as_deref().unwrap_or("-"), "webhook verification rejected");
        HttpResponse::Forbidden().finish()
    }
}

#[post("/webhook")]
async fn receive_events(
    state: web::Data<WebhookState>,
    request: HttpRequest,
    body: web::Bytes,
) -> impl Responder {
    if state.require_signature {
        let header = request
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok());
        let valid = state
            .app_secret
            .as_deref()
            .is_some_and(|secret| verify_signature(secret, &body, header));
        if !valid {
            tracing::warn!("webhook delivery with invalid signature rejected");
            return HttpResponse::Unauthorized().finish();
        }
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!(error = %error, "webhook body is not JSON; ignoring");
            return HttpResponse::Ok().finish();
        }
    };

    let commands: Vec<(InboundMessage, InboundCommand)> = extract_inbound_messages(&payload)
        .into_iter()
        .filter_map(|message| parse_command(&message.text).map(|command| (message, command)))
        .collect();

    if !commands.is_empty() {
        let opt_outs = Arc::clone(&state.opt_outs);
        let messaging = Arc::clone(&state.messaging);
        let handled = web::block(move || {
            for (message, command) in &commands {
                apply_command(opt_outs.as_ref(), messaging.as_ref(), message, *command);
            }
        })
        .await;
        if let Err(error) = handled {
            tracing::error!(error = %error, "webhook command handling did not complete");
        }
    }

    HttpResponse::Ok().finish()
}

/// Updates opt-out state, then replies. The reply is best-effort.
pub fn apply_command(
    opt_outs: &dyn OptOutStore,
    messaging: &dyn MessagingApi,
    message: &InboundMessage,
    command: InboundCommand,
) {
    let from = normalize_recipient(&message.from);
    let masked = mask_recipient(&from);

    let updated = match command {
        InboundCommand::OptOut => opt_outs.opt_out(&from),
        InboundCommand::OptIn => opt_outs.opt_in(&from),
    };
    match updated {
        Ok(true) => tracing::info!(recipient = %masked, command = ?command, "opt-out state updated"),
        Ok(false) => {
            tracing::warn!(command = ?command, "sender has no usable number; ignoring");
            return;
        }
        Err(error) => {
            tracing::error!(recipient = %masked, command = ?command, error = %error, "failed to update opt-out state");
            return;
        }
    }

    if let Err(error) = messaging.send_text(&from, command.reply()) {
        tracing::warn!(recipient = %masked, error = %error, "confirmation reply failed");
    }
}

/// `sha256=<hex>` HMAC of the raw body, compared in constant time.
pub fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> bool {
    let Some(signature) = header.and_then(|value| value.trim().strip_prefix("sha256=")) else {
        return false;
    };
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
