// flowline/src/pipeline/execution.rs

//! Contains `Pipeline::run()`, which executes the steps and their handlers in order.

use crate::core::context::Handler;
use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, instrument, span, Instrument, Level};

/// What a phase of handlers asked the engine to do next.
enum PhaseOutcome<Err> {
  Proceed,
  Stop,
  Failed(Err),
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes the pipeline against the shared context `ctx_data`.
  ///
  /// Steps run in declaration order. For each step: a true `skip_if` skips
  /// it, then every `before` handler runs, then every `on` handler. A
  /// handler returning `Stop` ends the run with `PipelineResult::Stopped`
  /// naming the step; a handler error ends the run with that error.
  /// A non-optional step without handlers fails with `FlowError::HandlerMissing`.
  #[instrument(
        name = "Pipeline::run",
        skip_all,
        fields(
            pipeline_context_data_type = %std::any::type_name::<TData>(),
            num_steps = self.steps.len(),
        ),
        err(Display)
    )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = span!(
        Level::INFO,
        "pipeline_step",
        step_name = step_name,
        step_index = step_idx,
        optional = step_def.optional
      );

      if let Some(skip_cond_fn) = &step_def.skip_if {
        if skip_cond_fn(ctx_data.clone()) {
          event!(parent: &step_span, Level::INFO, "Step skipped due to 'skip_if' condition.");
          continue;
        }
      }

      let before = self.before.get(step_name).filter(|v| !v.is_empty());
      let on = self.on.get(step_name).filter(|v| !v.is_empty());

      if before.is_none() && on.is_none() {
        if step_def.optional {
          event!(parent: &step_span, Level::DEBUG, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(parent: &step_span, Level::ERROR, "Non-optional step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      for (phase, handlers) in [("before", before), ("on", on)] {
        let Some(handlers) = handlers else { continue };
        let outcome = run_phase(phase, handlers, &ctx_data)
          .instrument(step_span.clone())
          .await;
        match outcome {
          PhaseOutcome::Proceed => {}
          PhaseOutcome::Stop => {
            event!(parent: &step_span, Level::INFO, phase, "Pipeline stopped by a handler.");
            return Ok(PipelineResult::Stopped {
              step: step_def.name.clone(),
            });
          }
          PhaseOutcome::Failed(e) => {
            event!(parent: &step_span, Level::ERROR, phase, error = %e, "Handler failed.");
            return Err(e);
          }
        }
      }
      event!(parent: &step_span, Level::DEBUG, "Step processing finished successfully.");
    }

    event!(Level::DEBUG, "Pipeline execution completed successfully.");
    Ok(PipelineResult::Completed)
  }
}

async fn run_phase<TData, Err>(
  phase: &'static str,
  handlers: &[Handler<TData, Err>],
  ctx_data: &ContextData<TData>,
) -> PhaseOutcome<Err>
where
  TData: 'static + Send + Sync,
  Err: Send + 'static,
{
  event!(Level::TRACE, phase, count = handlers.len(), "Executing handlers.");
  for (handler_idx, handler_fn) in handlers.iter().enumerate() {
    let handler_span = span!(Level::DEBUG, "handler", phase, handler_index = handler_idx);
    match handler_fn(ctx_data.clone()).instrument(handler_span).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => return PhaseOutcome::Stop,
      Err(e) => return PhaseOutcome::Failed(e),
    }
  }
  PhaseOutcome::Proceed
}
