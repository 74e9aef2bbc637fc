// onboarding/src/web/handlers/event_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::ApplicationUpdateEvent;
use crate::state::AppState;
use crate::watcher::Admission;

/// Receives one application update event from the document store.
///
/// The flow runs in the background; the response only says whether the event
/// was taken, ignored as irrelevant, or recognised as a redelivery.
#[instrument(name = "handler::application_event", skip_all, fields(payload_bytes = body.len()))]
pub async fn application_event_handler(
  app_state: web::Data<AppState>,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let event: ApplicationUpdateEvent =
    serde_json::from_slice(&body).map_err(|e| AppError::Malformed(e.to_string()))?;
  let event_id = event.event_id.clone();

  let response = match app_state.watcher.dispatch(event) {
    Admission::Accepted(transition) => {
      info!(%event_id, %transition, "Event accepted.");
      json!({"status": "accepted", "transition": transition})
    }
    Admission::Ignored => json!({"status": "ignored", "transition": null}),
    Admission::Duplicate => json!({"status": "duplicate", "transition": null}),
  };
  Ok(HttpResponse::Accepted().json(response))
}

pub async fn health_check_handler(app_state: web::Data<AppState>) -> HttpResponse {
  HttpResponse::Ok().json(json!({
    "status": "ok",
    "mail_channel": app_state.config.mail.transport.channel(),
  }))
}
