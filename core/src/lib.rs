// flowline/src/lib.rs

//! Flowline: a small asynchronous, type-safe step pipeline engine.
//!
//! A workflow is a `Pipeline<TData, Err>`: an ordered list of named steps.
//! Each step may carry `before` and `on` handlers, an optional `skip_if`
//! predicate, and may be marked optional. Handlers receive a shared
//! `ContextData<TData>` and return a `PipelineControl` telling the engine
//! whether to keep going.
//!
//! The `Flows` registry stores one pipeline per context data type and
//! dispatches a context to the right pipeline, so callers only need to
//! build the context for the workflow they want to run.
//!
/*
    Typical use:
    1. Define a context struct `MyCtx` holding the inputs, the collaborators
       the steps call, and the fields the steps fill in.
    2. Build a `Pipeline<MyCtx, MyErr>` with its step names.
    3. Register handlers with `.before_root()` / `.on_root()`.
    4. Register the pipeline with a `Flows<MyErr>` instance at startup.
    5. Per event, wrap a fresh `MyCtx` in `ContextData::new` and call
       `flows.run(ctx.clone()).await`, then read the outcome back from `ctx`.
*/

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context::Handler;
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::Flows;
