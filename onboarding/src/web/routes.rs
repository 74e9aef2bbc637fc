// onboarding/src/web/routes.rs

use crate::web::handlers::event_handlers;
use actix_web::web;

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(event_handlers::health_check_handler))
      .service(
        web::scope("/events").route(
          "/applications",
          web::post().to(event_handlers::application_event_handler),
        ),
      ),
  );
}
