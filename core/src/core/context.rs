// flowline/src/core/context.rs

//! Defines the `Handler<TData, Err>` type for pipeline step handlers.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// Type alias for a boxed pipeline step handler.
///
/// A handler takes a clone of the run's `ContextData<TData>` and returns a
/// future resolving to `Result<PipelineControl, Err>`.
///
/// Handlers must:
/// 1. Take `.read()` / `.write()` guards only for as long as they copy data in or out.
/// 2. **Drop every guard before the next `.await`.** The lock is a blocking
///    `parking_lot` lock and the guards are not `Send`.
/// 3. Return `PipelineControl::Continue` to move on or `PipelineControl::Stop`
///    to end the run at the current step.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;
