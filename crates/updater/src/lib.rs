//! Curator - content update pipeline
//!
//! Fetches external content bundles over HTTP, decompresses and
//! validates them, materializes the result on the local filesystem,
//! publishes a notification to the router, and persists offset
//! bookkeeping in the embedded key-value store.
//!
//! # Architecture
//!
//! ```text
//! [Scheduler] ──┐
//!               ├──▶ Action ──▶ Orchestrator ──▶ Chain of stages
//! [On-demand] ──┘                                  │
//!                    download → decompress → parse → publish → persist → clean
//! ```
//!
//! One [`Action`] owns a topic: its scheduler task, its on-demand
//! endpoint and its orchestrator. Each tick or on-demand call runs the
//! chain over a fresh [`UpdaterContext`]; run-level errors are logged and
//! swallowed so a failed run never reaches the scheduler or the caller.
//!
//! # Example
//!
//! ```ignore
//! use curator_router::Broker;
//! use curator_updater::Action;
//! use serde_json::json;
//!
//! let broker = Broker::new();
//! let mut action = Action::new(&broker, json!({
//!     "topicName": "threat-intel",
//!     "interval": 3600,
//!     "configData": { /* … */ }
//! }))?;
//!
//! action.start_scheduler(3600);
//! // …
//! action.stop_scheduler().await;
//! ```

mod action;
mod chain;
mod context;
mod error;
mod ondemand;
mod orchestrator;
mod scheduler;
pub mod stages;

use std::future::Future;
use std::pin::Pin;

pub use action::Action;
pub use chain::Chain;
pub use context::{
    BaseContext, RunKind, StageRecord, StageStatus, UpdaterContext, CURRENT_OFFSET_KEY,
    HASH_HISTORY_COLUMN, LAST_HASH_KEY,
};
pub use error::UpdaterError;
pub use ondemand::{OnDemandHandler, OnDemandRegistry};
pub use orchestrator::{Orchestrator, RunOutcome, UpdateKind};
pub use scheduler::Scheduler;

/// Result type for updater operations
pub type UpdaterResult<T> = Result<T, UpdaterError>;

/// One link in the processing chain
///
/// A stage is a pure transform over the run context: it holds no mutable
/// state of its own between runs. Returning an error short-circuits the
/// chain; the orchestrator records the failure and swallows it.
///
/// # Example
///
/// ```ignore
/// struct Toucher;
///
/// impl Stage for Toucher {
///     fn handle<'a>(
///         &'a self,
///         ctx: &'a mut UpdaterContext<'_>,
///     ) -> Pin<Box<dyn Future<Output = UpdaterResult<()>> + Send + 'a>> {
///         Box::pin(async move {
///             ctx.paths.push(ctx.base.contents_folder.join("marker"));
///             Ok(())
///         })
///     }
///
///     fn name(&self) -> &'static str {
///         "toucher"
///     }
/// }
/// ```
pub trait Stage: Send + Sync {
    /// Process the run context, mutating it in place
    fn handle<'a>(
        &'a self,
        ctx: &'a mut UpdaterContext<'_>,
    ) -> Pin<Box<dyn Future<Output = UpdaterResult<()>> + Send + 'a>>;

    /// Name of this stage for logging and stage status records
    fn name(&self) -> &'static str;
}
