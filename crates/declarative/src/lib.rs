//! # Declarative
//!
//! A framework for idempotent resource reconciliation.
//!
//! This crate provides the core abstractions for declaring a desired state,
//! probing the live current state, and converging with at most one
//! mutation per resource. It knows nothing about any particular tool: the
//! resources plug in the probing and the mutations.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with live state that can be created, removed or upgraded
//! - **DesiredState**: `Present` or `Absent`, as declared by the caller
//! - **ResourceState**: What the live system reports right now
//! - **Outcome**: Normalized `{failed, changed, msg}` result; a failure is never a change
//! - **ExecutionPlan**: An ordered list of resources, reconciled one after another
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ApplyContext, ExecuteOptions, ExecutionPlan, execute_simple, reconcile};
//!
//! // One resource
//! let result = reconcile(&my_resource, &ApplyContext::default());
//! println!("{:?} -> {}", result.action, result.outcome.message());
//!
//! // A plan
//! let mut plan = ExecutionPlan::new();
//! plan.push(Box::new(my_resource));
//! let report = execute_simple(&plan, &ExecuteOptions::default());
//! assert!(report.summary.is_success());
//! ```
//!
//! ## Decision table
//!
//! | current \ desired | Present  | Absent |
//! |-------------------|----------|--------|
//! | Present           | no-op    | remove |
//! | Modified          | upgrade  | remove |
//! | Absent            | create   | no-op  |
//! | Unknown           | fail     | fail   |

pub mod context;
pub mod executor;
pub mod planner;
pub mod reconcile;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{ApplyContext, NoProgress, ProgressCallback};
pub use executor::{ExecuteReport, execute, execute_simple};
pub use planner::{ExecutionPlan, matches_target};
pub use reconcile::{decide, reconcile};
pub use resource::{BoxedResource, Resource};
pub use types::{
    Action, DesiredState, ExecuteOptions, ExecuteSummary, Message, Outcome, Reconciled,
    ResourceState,
};
