// flowline/src/registry.rs

//! Defines `Flows<E>`, a type-keyed registry for managing and executing pipelines.
//! Each pipeline is registered under the `TypeId` of its context data, so a
//! context value is enough to find the workflow that processes it.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Type-erased runner stored by the registry.
#[async_trait]
trait AnyPipelineRunner<ApplicationError>: Send + Sync
where
  ApplicationError: std::error::Error + Send + Sync + 'static,
{
  /// `ctx_obj` is expected to hold a `ContextData<TData>` for the wrapped pipeline.
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, ApplicationError>;
}

struct PipelineWrapper<TData, HandlerError, ApplicationError>
where
  TData: 'static + Send + Sync,
  HandlerError: std::error::Error + From<FlowError> + Send + Sync + 'static,
  ApplicationError: std::error::Error + From<HandlerError> + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Arc<Pipeline<TData, HandlerError>>,
  _phantom_app_err: PhantomData<fn() -> ApplicationError>,
}

#[async_trait]
impl<TData, HandlerError, ApplicationError> AnyPipelineRunner<ApplicationError>
  for PipelineWrapper<TData, HandlerError, ApplicationError>
where
  TData: 'static + Send + Sync,
  HandlerError: std::error::Error + From<FlowError> + Send + Sync + 'static,
  ApplicationError: std::error::Error + From<HandlerError> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, ApplicationError> {
    let typed_ctx_data = match ctx_obj.downcast::<ContextData<TData>>() {
      Ok(boxed_ctx_data) => *boxed_ctx_data,
      Err(_) => {
        let expected_type_name = std::any::type_name::<ContextData<TData>>();
        event!(Level::ERROR, "Context object type mismatch. Expected {}.", expected_type_name);
        return Err(ApplicationError::from(FlowError::Internal(format!(
          "registry dispatch expected {}",
          expected_type_name
        ))));
      }
    };

    self.pipeline.run(typed_ctx_data).await.map_err(ApplicationError::from)
  }
}

/// The pipeline registry.
///
/// `ApplicationError` is what `Flows::run` returns; it must be constructible
/// from `FlowError` so lookup failures can be reported.
pub struct Flows<ApplicationError = FlowError>
where
  ApplicationError: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  registry: RwLock<HashMap<TypeId, Arc<dyn AnyPipelineRunner<ApplicationError>>>>,
}

impl<ApplicationError> Default for Flows<ApplicationError>
where
  ApplicationError: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<ApplicationError> Flows<ApplicationError>
where
  ApplicationError: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      registry: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `pipeline` for its context data type, replacing any earlier one.
  pub fn register_pipeline<TData, HandlerError>(&self, pipeline: Pipeline<TData, HandlerError>)
  where
    TData: 'static + Send + Sync,
    HandlerError: std::error::Error + From<FlowError> + Send + Sync + 'static,
    ApplicationError: From<HandlerError>,
  {
    event!(
      Level::DEBUG,
      tdata_type = %std::any::type_name::<TData>(),
      steps = ?pipeline.step_names(),
      "Registering pipeline."
    );
    let wrapper = PipelineWrapper::<TData, HandlerError, ApplicationError> {
      pipeline: Arc::new(pipeline),
      _phantom_app_err: PhantomData,
    };
    self.registry.write().insert(TypeId::of::<TData>(), Arc::new(wrapper));
  }

  pub fn is_registered<TData: 'static>(&self) -> bool {
    self.registry.read().contains_key(&TypeId::of::<TData>())
  }

  /// Runs the pipeline registered for `TData`.
  #[instrument(name = "Flows::run", skip_all, fields(tdata_type = %std::any::type_name::<TData>()))]
  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, ApplicationError>
  where
    TData: 'static + Send + Sync,
  {
    // Clone the runner out so the registry lock is released before awaiting.
    let runner = self.registry.read().get(&TypeId::of::<TData>()).cloned();
    let runner = runner.ok_or_else(|| {
      let type_name = std::any::type_name::<TData>();
      event!(Level::ERROR, "No pipeline registered for TData type {}.", type_name);
      ApplicationError::from(FlowError::ConfigurationError {
        step_name: "Flows::run".to_string(),
        message: format!("No pipeline registered for TData type {}", type_name),
      })
    })?;

    runner.run_erased(Box::new(ctx_data)).await
  }
}
