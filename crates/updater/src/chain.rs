//! Stage chain - sequential pipeline execution
//!
//! A `Chain` is an immutable ordered sequence of stages dispatched over
//! one run context.
//!
//! # Design
//!
//! - **Declared order**: stages run in the order they were added; there
//!   is no backtracking
//! - **Fail-fast**: the first stage error stops the chain and is
//!   returned to the orchestrator
//! - **Bookkeeping**: every completed stage appends `Ok` to the context's
//!   stage status; a failing stage appends `Fail` before the chain stops,
//!   so the status length always equals the number of executed stages

use tracing::debug;

use crate::context::UpdaterContext;
use crate::{Stage, UpdaterResult};

#[cfg(test)]
#[path = "chain_test.rs"]
mod tests;

/// Ordered composition of stages
pub struct Chain {
    stages: Vec<Box<dyn Stage>>,
}

impl Chain {
    /// Create a chain from stages in execution order
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Names of all stages in execution order
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Dispatch the context through every stage in order
    pub async fn run(&self, ctx: &mut UpdaterContext<'_>) -> UpdaterResult<()> {
        for stage in &self.stages {
            debug!(stage = stage.name(), "stage starting");
            match stage.handle(ctx).await {
                Ok(()) => ctx.record_ok(stage.name()),
                Err(error) => {
                    ctx.record_fail(stage.name());
                    return Err(error);
                }
            }
        }
        Ok(())
    }
}
