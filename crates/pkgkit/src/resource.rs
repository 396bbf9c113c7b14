//! A package-manager resource the reconciler can drive.

use crate::backend::Backend;
use crate::classify::classify;
use crate::error::Error;
use crate::exec::{ExecContext, Session};
use crate::types::{
    ExecutableHandle, Presence, PresentOptions, ResourceDescriptor, VersionPolicy,
};
use anyhow::Result;
use declarative::{ApplyContext, DesiredState, Message, Resource, ResourceState};

/// One declared environment or package, bound to a backend and an executable.
#[derive(Debug)]
pub struct ManagedResource {
    backend: Box<dyn Backend>,
    descriptor: ResourceDescriptor,
    desired: DesiredState,
    options: PresentOptions,
    policy: VersionPolicy,
    handle: ExecutableHandle,
    ctx: ExecContext,
}

impl ManagedResource {
    /// Bind a descriptor to a backend and executable.
    pub fn new(
        backend: Box<dyn Backend>,
        descriptor: ResourceDescriptor,
        desired: DesiredState,
        handle: ExecutableHandle,
        ctx: ExecContext,
    ) -> Self {
        Self {
            backend,
            descriptor,
            desired,
            options: PresentOptions::default(),
            policy: VersionPolicy::default(),
            handle,
            ctx,
        }
    }

    /// Attach backend extras used by create.
    pub fn with_options(mut self, options: PresentOptions) -> Self {
        self.options = options;
        self
    }

    /// Set how a version mismatch is treated.
    pub fn with_policy(mut self, policy: VersionPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn session(&self) -> Session<'_> {
        self.ctx.session(&self.handle)
    }

    /// Run one mutation. A silent tool is reported as `<description> <done>`.
    fn mutate(&self, argv: &[String], done: &str) -> Result<Message> {
        let raw = self.session().run(argv)?;
        let message = classify(&self.handle, &raw)?;
        if message.as_text().is_some_and(str::is_empty) {
            return Ok(Message::text(format!("{} {done}", self.description())));
        }
        Ok(message)
    }
}

impl Resource for ManagedResource {
    fn id(&self) -> String {
        self.descriptor.id()
    }

    fn description(&self) -> String {
        let mut desc = format!("{} {}", self.backend.label(), self.descriptor.name);
        if let Some(version) = self.descriptor.pinned_version() {
            desc.push('=');
            desc.push_str(version);
        }
        if let Some(scope) = self.descriptor.scope_name() {
            desc.push_str(" in ");
            desc.push_str(scope);
        }
        desc
    }

    fn resource_type(&self) -> &'static str {
        self.backend.kind().resource_type()
    }

    fn precondition(&self) -> Result<()> {
        if let Some(scope) = self.descriptor.scope_name()
            && !self.backend.scope_exists(&self.session(), scope)?
        {
            return Err(Error::ScopeNotFound {
                scope: scope.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn current_state(&self) -> Result<ResourceState> {
        // Removal matches on name alone
        let pin = match self.desired {
            DesiredState::Present => self.descriptor.pinned_version(),
            DesiredState::Absent => None,
        };

        let state = match self.backend.presence(&self.session(), &self.descriptor, pin)? {
            Presence::Absent => ResourceState::Absent,
            Presence::Present { version } => ResourceState::Present { details: version },
            Presence::Mismatch { installed, wanted } => {
                log::info!(
                    "{} is at {installed}, wanted {wanted} ({} policy)",
                    self.id(),
                    self.policy
                );
                match self.policy {
                    VersionPolicy::Reinstall => ResourceState::Absent,
                    VersionPolicy::Upgrade => ResourceState::Modified {
                        from: installed,
                        to: wanted,
                    },
                }
            }
        };
        Ok(state)
    }

    fn desired_state(&self) -> DesiredState {
        self.desired
    }

    fn present_message(&self) -> String {
        self.backend.present_message(&self.descriptor)
    }

    fn absent_message(&self) -> String {
        self.backend.absent_message(&self.descriptor)
    }

    fn create(&self, _ctx: &ApplyContext) -> Result<Message> {
        let argv = self
            .backend
            .install_args(&self.session(), &self.descriptor, &self.options)?;
        self.mutate(&argv, "installed")
    }

    fn remove(&self, _ctx: &ApplyContext) -> Result<Message> {
        let argv = self
            .backend
            .remove_args(&self.session(), &self.descriptor, &self.options)?;
        self.mutate(&argv, "removed")
    }

    fn upgrade(&self, _ctx: &ApplyContext, _from: &str, _to: &str) -> Result<Message> {
        let argv = self
            .backend
            .upgrade_args(&self.session(), &self.descriptor, &self.options)?;
        self.mutate(&argv, "upgraded")
    }
}
