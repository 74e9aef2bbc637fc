// onboarding/src/web/handlers/mod.rs

pub mod event_handlers;
