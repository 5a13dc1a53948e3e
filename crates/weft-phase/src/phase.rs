use std::sync::Arc;

use crate::{HookResult, PhaseHandler, SubStage};

/// A named, ordered slot in a pipeline.
///
/// Each phase keeps three FIFO handler queues (`before`, `use`, `after`).
/// Handlers are appended via [`Phase::register`] and never removed for the
/// life of the owning list. [`Phase::run`] executes the queues strictly in
/// sub-stage order; within a queue, handlers run in insertion order, one at
/// a time, and the first error aborts the phase.
pub struct Phase<C> {
    name: String,
    before: Vec<Arc<dyn PhaseHandler<C>>>,
    main: Vec<Arc<dyn PhaseHandler<C>>>,
    after: Vec<Arc<dyn PhaseHandler<C>>>,
}

impl<C> Phase<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            before: Vec::new(),
            main: Vec::new(),
            after: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a handler to the given sub-stage queue.
    pub fn register(&mut self, stage: SubStage, handler: Arc<dyn PhaseHandler<C>>) {
        let queue = match stage {
            SubStage::Before => &mut self.before,
            SubStage::Use => &mut self.main,
            SubStage::After => &mut self.after,
        };
        queue.push(handler);
        tracing::trace!(phase = %self.name, %stage, "registered phase handler");
    }

    /// Number of handlers registered on the given sub-stage.
    pub fn handler_count(&self, stage: SubStage) -> usize {
        match stage {
            SubStage::Before => self.before.len(),
            SubStage::Use => self.main.len(),
            SubStage::After => self.after.len(),
        }
    }

    /// Total number of handlers across all sub-stages.
    pub fn total_handlers(&self) -> usize {
        self.before.len() + self.main.len() + self.after.len()
    }

    /// Execute all handlers of this phase against `ctx`.
    ///
    /// Runs `before`, then `use`, then `after`. A handler must complete
    /// before the following handler begins. The first error stops the phase
    /// immediately; no later handler runs.
    pub async fn run(&self, ctx: &mut C) -> HookResult {
        for handler in self.before.iter().chain(&self.main).chain(&self.after) {
            handler.handle(ctx).await?;
        }
        Ok(())
    }
}

impl<C> Clone for Phase<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            before: self.before.clone(),
            main: self.main.clone(),
            after: self.after.clone(),
        }
    }
}

impl<C> std::fmt::Debug for Phase<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Phase")
            .field("name", &self.name)
            .field("before", &self.before.len())
            .field("use", &self.main.len())
            .field("after", &self.after.len())
            .finish_non_exhaustive()
    }
}
