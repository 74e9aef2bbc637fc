// flowline/src/core/control.rs

//! Signals for controlling pipeline flow and the outcome of a pipeline run.

/// Signal from a handler indicating whether the pipeline should continue or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  /// Continue with the remaining handlers of this step and the following steps.
  Continue,
  /// Halt the run immediately. Nothing else in this step or later steps executes.
  Stop,
}

/// Outcome of a full pipeline execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every step that was not skipped ran to completion.
  Completed,
  /// A handler returned `PipelineControl::Stop` while running `step`.
  Stopped { step: String },
}

impl PipelineResult {
  pub fn is_completed(&self) -> bool {
    matches!(self, PipelineResult::Completed)
  }

  /// Name of the step that halted the run, if any.
  pub fn stopped_at(&self) -> Option<&str> {
    match self {
      PipelineResult::Completed => None,
      PipelineResult::Stopped { step } => Some(step.as_str()),
    }
  }
}
