// flowline/src/pipeline/hooks.rs

//! Registration of `before` and `on` handlers for pipeline steps.

use crate::core::context::Handler;
use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use std::future::Future;

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Registers a `before` hook for a given step.
  ///
  /// `before` handlers run ahead of the step's `on` handlers and are the
  /// place to prepare data the `on` handlers consume. The handler's own
  /// error type only has to convert into the pipeline's `Err`.
  pub fn before_root<F, UserProvidedErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserProvidedErr>> + Send + 'static,
    UserProvidedErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler = wrap_handler::<TData, Err, F, UserProvidedErr>(handler_fn);
    self.before.entry(step_name.to_string()).or_default().push(handler);
  }

  /// Registers an `on` hook for a given step. Same error rules as `before_root`.
  pub fn on_root<F, UserProvidedErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) where
    F: Future<Output = Result<PipelineControl, UserProvidedErr>> + Send + 'static,
    UserProvidedErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler = wrap_handler::<TData, Err, F, UserProvidedErr>(handler_fn);
    self.on.entry(step_name.to_string()).or_default().push(handler);
  }
}

fn wrap_handler<TData, Err, F, UserProvidedErr>(
  handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
) -> Handler<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: Send + 'static,
  F: Future<Output = Result<PipelineControl, UserProvidedErr>> + Send + 'static,
  UserProvidedErr: Into<Err> + Send + Sync + 'static,
{
  Box::new(move |ctx_data| {
    let user_fut = handler_fn(ctx_data);
    Box::pin(async move { user_fut.await.map_err(Into::into) })
  })
}
