// onboarding/src/pipelines/mod.rs

//! Defines and registers the workflows the watcher dispatches to.

use crate::errors::AppError;
use flowline::Flows;

pub mod contexts;

pub mod approval_pipeline;
pub mod intake_pipeline;
pub mod rejection_pipeline;

/// Registers every pipeline with `flows`. Called once at startup.
pub fn register_all_pipelines(flows: &Flows<AppError>) {
  tracing::info!("Registering pipelines...");

  approval_pipeline::register_approval_pipeline(flows);
  rejection_pipeline::register_rejection_pipeline(flows);
  intake_pipeline::register_intake_pipeline(flows);

  tracing::info!("All application pipelines registered.");
}
