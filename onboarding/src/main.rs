// onboarding/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use flowline::Flows;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;
use tutor_onboarding::config::AppConfig;
use tutor_onboarding::errors::AppError;
use tutor_onboarding::pipelines;
use tutor_onboarding::state::{AppState, Services};
use tutor_onboarding::watcher::{ApplicationWatcher, EventLedger};
use tutor_onboarding::web::configure_app_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting tutor onboarding worker...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  let services = match Services::from_config(&app_config) {
    Ok(services) => services,
    Err(e) => {
      tracing::error!(error = %e, "Failed to initialise external service clients.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  let flows = Arc::new(Flows::<AppError>::new());
  pipelines::register_all_pipelines(&flows);

  let ledger = EventLedger::new(app_config.event_dedup_capacity as u64, app_config.event_dedup_ttl);
  let watcher = ApplicationWatcher::new(flows, services, ledger);
  let app_state = AppState {
    config: app_config.clone(),
    watcher: watcher.clone(),
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await?;

  // Accepted events may still be mid-run; their ids are already claimed.
  tracing::info!(active_runs = watcher.in_flight(), "Server stopped; draining in-flight runs.");
  watcher.drain(app_config.shutdown_grace).await;
  Ok(())
}
