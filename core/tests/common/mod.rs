// tests/common/mod.rs
#![allow(dead_code)]

use flowline::{ContextData, FlowError, PipelineControl};
use once_cell::sync::Lazy;
use tracing::Level;

/// Context used by the engine tests: each handler appends to `trail`.
#[derive(Clone, Debug, Default)]
pub struct RunLog {
  pub counter: i32,
  pub trail: Vec<String>,
  pub stop_at: Option<String>,
  pub skip_delivery: bool,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("flowline error: {0}")]
  Flow(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(fe: FlowError) -> Self {
    // Debug keeps the variant name, which is what the assertions look for.
    TestError::Flow(format!("{:?}", fe))
  }
}

pub fn recording_handler(step_name: &'static str) -> flowline::Handler<RunLog, TestError> {
  Box::new(move |ctx: ContextData<RunLog>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.trail.push(step_name.to_string());
      tracing::debug!(target: "test_handlers", step = step_name, counter = guard.counter, "executed");
      if guard.stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn failing_handler(step_name: &'static str, message: &'static str) -> flowline::Handler<RunLog, TestError> {
  Box::new(move |ctx: ContextData<RunLog>| {
    Box::pin(async move {
      ctx.write().trail.push(step_name.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
