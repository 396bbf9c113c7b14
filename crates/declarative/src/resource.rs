//! Resource trait for declarative state reconciliation
//!
//! A Resource is something with a live state that can be probed, and that
//! can be created, removed or moved to another version to reach a desired
//! state. The reconciler decides which of those to call; resources never
//! decide for themselves.

use crate::context::ApplyContext;
use crate::types::{DesiredState, Message, ResourceState};
use anyhow::Result;
use std::fmt;

/// Core trait for declarative resources
///
/// Every resource provides:
/// - Identity (id, description, type)
/// - Live state detection (`current_state`), queried on every call
/// - Mutations (`create`, `remove`, `upgrade`) invoked only by the reconciler
/// - An optional `precondition` checked before anything else
///
/// # Example
///
/// ```ignore
/// use declarative::{ApplyContext, DesiredState, Message, Resource, ResourceState};
///
/// #[derive(Debug)]
/// struct FileResource {
///     path: String,
/// }
///
/// impl Resource for FileResource {
///     fn id(&self) -> String {
///         self.path.clone()
///     }
///
///     fn description(&self) -> String {
///         format!("Ensure file exists at {}", self.path)
///     }
///
///     fn resource_type(&self) -> &'static str {
///         "file"
///     }
///
///     fn current_state(&self) -> anyhow::Result<ResourceState> {
///         if std::path::Path::new(&self.path).exists() {
///             Ok(ResourceState::Present { details: None })
///         } else {
///             Ok(ResourceState::Absent)
///         }
///     }
///
///     fn desired_state(&self) -> DesiredState {
///         DesiredState::Present
///     }
///
///     fn create(&self, _ctx: &ApplyContext) -> anyhow::Result<Message> {
///         std::fs::write(&self.path, "")?;
///         Ok(Message::text("created"))
///     }
///
///     fn remove(&self, _ctx: &ApplyContext) -> anyhow::Result<Message> {
///         std::fs::remove_file(&self.path)?;
///         Ok(Message::text("removed"))
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique identifier for this resource
    ///
    /// Stable within its type. Examples:
    /// - "analysis" for a conda environment
    /// - "analysis/numpy" for a package scoped to an environment
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category, used for grouping and filtering
    fn resource_type(&self) -> &'static str;

    /// Check that must pass before the state is even probed
    ///
    /// Failing here fails the reconciliation without running any mutation.
    fn precondition(&self) -> Result<()> {
        Ok(())
    }

    /// Detect the current state of this resource
    ///
    /// Implementations must query the live system every time.
    fn current_state(&self) -> Result<ResourceState>;

    /// Get the desired state for this resource
    fn desired_state(&self) -> DesiredState;

    /// Message reported when the resource is already present
    fn present_message(&self) -> String {
        format!("{} already present", self.id())
    }

    /// Message reported when the resource is already absent
    fn absent_message(&self) -> String {
        format!("{} does not exist", self.id())
    }

    /// Bring an absent resource into existence
    fn create(&self, ctx: &ApplyContext) -> Result<Message>;

    /// Remove an existing resource
    fn remove(&self, ctx: &ApplyContext) -> Result<Message>;

    /// Move an existing resource from one version to another
    ///
    /// Defaults to `create`, which for most package managers replaces the
    /// installed version in place.
    fn upgrade(&self, ctx: &ApplyContext, _from: &str, _to: &str) -> Result<Message> {
        self.create(ctx)
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;
