//! Apply context and progress callbacks
//!
//! These keep the engine free of any particular UI or output format.

use crate::types::Reconciled;

/// Progress callback for plan execution
///
/// Implement this trait to receive progress updates during execution.
pub trait ProgressCallback {
    /// Called before the first resource of a plan
    fn on_plan_start(&mut self, count: usize);

    /// Called when starting to reconcile a single resource
    fn on_resource_start(&mut self, id: &str, description: &str);

    /// Called when a resource reconciliation completes
    fn on_resource_complete(&mut self, id: &str, result: &Reconciled);

    /// Called after the last resource
    fn on_plan_complete(&mut self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_plan_start(&mut self, _count: usize) {}
    fn on_resource_start(&mut self, _id: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _id: &str, _result: &Reconciled) {}
    fn on_plan_complete(&mut self) {}
}

/// Context passed to resource mutations
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyContext {
    /// Decide and report only, no mutation
    pub dry_run: bool,
}

impl ApplyContext {
    /// Create a new apply context
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}
