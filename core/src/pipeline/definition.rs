// flowline/src/pipeline/definition.rs

//! Contains the `Pipeline<TData, Err>` struct definition and methods for its
//! construction and structural modification.

use crate::core::context::Handler;
use crate::core::step::{SkipCondition, StepDef};
use crate::error::FlowError;
use std::collections::HashMap;

/// An ordered list of named steps over a root data type `TData`.
///
/// `Err` is the error type every handler resolves to. It must be
/// `From<FlowError>` so engine-level failures (a non-optional step with no
/// handlers, for instance) surface through the same type.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,

  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a new `Pipeline` from `(name, optional, skip_if)` triples.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_cond_opt)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_if: skip_cond_opt.clone(),
      })
      .collect();

    Self {
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
    }
  }

  /// Step names in execution order.
  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  fn position_of(&self, step_name: &str) -> Option<usize> {
    self.steps.iter().position(|s| s.name == step_name)
  }

  /// Panics when `step_name` is unknown. Pipelines are assembled once at
  /// startup, so a typo here is a programming error rather than a runtime one.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) -> usize {
    match self.position_of(step_name) {
      Some(idx) => idx,
      None => panic!("flowline setup error: step '{}' not found in pipeline definition.", step_name),
    }
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.position_of(step_name).is_some() {
      panic!("flowline setup error: step '{}' already exists in pipeline definition.", step_name);
    }
  }

  pub fn insert_after_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) {
    let idx = self.ensure_step_exists(existing_step_name);
    let name: String = new_step_name.into();
    self.ensure_step_not_exists(&name);
    self.steps.insert(idx + 1, StepDef { name, optional, skip_if });
  }

  /// Removes a step and its handlers. Removing an unknown step is a no-op.
  pub fn remove_step(&mut self, step_name: &str) {
    if let Some(idx) = self.position_of(step_name) {
      self.steps.remove(idx);
      self.before.remove(step_name);
      self.on.remove(step_name);
    }
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) {
    let idx = self.ensure_step_exists(step_name);
    self.steps[idx].skip_if = skip_if;
  }
}
