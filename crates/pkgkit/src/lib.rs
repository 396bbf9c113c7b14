//! # pkgkit
//!
//! Idempotent management of conda environments, conda packages and CRAN
//! packages.
//!
//! This crate provides functionality for:
//! - Locating the `conda` and `Rscript` executables
//! - Probing what is installed, live, on every call
//! - Building the exact install/remove commands for each tool
//! - Running them with a bounded timeout and cooperative cancellation
//! - Classifying results into a `{failed, changed, msg}` report
//!
//! The decision of *whether* to run anything is made by the
//! [`declarative`] reconciler; this crate supplies the resources.
//!
//! ## Example
//!
//! ```no_run
//! use declarative::DesiredState;
//! use pkgkit::{BackendKind, Client, PresentOptions, Request, ResourceDescriptor};
//!
//! let client = Client::new();
//! let request = Request::new(
//!     BackendKind::CondaEnv,
//!     ResourceDescriptor::environment("analysis"),
//!     DesiredState::Present,
//! )
//! .with_options(PresentOptions {
//!     python: Some("3.9".into()),
//!     ..PresentOptions::default()
//! });
//!
//! let report = client.ensure(&request, false);
//! println!("changed={} msg={}", report.changed, report.msg);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod classify;
pub mod error;
pub mod exec;
pub mod resolver;
pub mod resource;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use exec::{CancelToken, ExecContext, RawOutput};
pub use resolver::{Resolver, SearchEnv};
pub use resource::ManagedResource;
pub use types::{
    BackendKind, ExecutableHandle, Presence, PresentOptions, Report, Request, ResourceDescriptor,
    ResourceKind, Tool, VersionPolicy,
};

use declarative::{ApplyContext, reconcile};
use std::collections::HashMap;
use std::path::Path;

/// High-level entry point: one call per declared resource.
///
/// Every call resolves the executable and probes the live state afresh;
/// nothing is cached between calls. Calls that touch the same environment
/// or package must not run concurrently: the underlying tools keep their
/// own locks at best, so serialising them is the caller's job.
#[derive(Debug, Clone)]
pub struct Client {
    ctx: ExecContext,
    search: SearchEnv,
    policy: VersionPolicy,
    extra_candidates: HashMap<Tool, Vec<String>>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Client running real processes in the current environment.
    pub fn new() -> Self {
        Self::with_context(ExecContext::system())
    }

    /// Client around a custom execution context (useful for testing).
    pub fn with_context(ctx: ExecContext) -> Self {
        Self {
            ctx,
            search: SearchEnv::from_process(),
            policy: VersionPolicy::default(),
            extra_candidates: HashMap::new(),
        }
    }

    /// Override where executables are looked up.
    pub fn with_search_env(mut self, search: SearchEnv) -> Self {
        self.search = search;
        self
    }

    /// Set how a version mismatch is treated.
    pub fn with_version_policy(mut self, policy: VersionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Extra fallback locations for a tool, tried after the built-in ones.
    pub fn with_extra_candidates(mut self, tool: Tool, candidates: Vec<String>) -> Self {
        self.extra_candidates.entry(tool).or_default().extend(candidates);
        self
    }

    /// Execution context in use.
    pub fn context(&self) -> &ExecContext {
        &self.ctx
    }

    /// Version mismatch policy in use.
    pub fn version_policy(&self) -> VersionPolicy {
        self.policy
    }

    /// Resolver for a tool, including configured extras.
    pub fn resolver(&self, tool: Tool) -> Resolver {
        Resolver::new(tool).with_extra_candidates(
            self.extra_candidates
                .get(&tool)
                .cloned()
                .unwrap_or_default(),
        )
    }

    /// Locate a tool's executable.
    pub fn resolve(&self, tool: Tool, hint: Option<&Path>) -> Result<ExecutableHandle> {
        self.resolver(tool).resolve(hint, &self.search)
    }

    /// Validate a request and bind it to an already resolved executable.
    pub fn bind(&self, request: &Request, handle: ExecutableHandle) -> Result<ManagedResource> {
        let backend = backend::for_kind(request.backend);
        backend.validate(&request.descriptor)?;

        Ok(ManagedResource::new(
            backend,
            request.descriptor.clone(),
            request.desired,
            handle,
            self.ctx.clone(),
        )
        .with_options(request.options.clone())
        .with_policy(self.policy))
    }

    /// Reconcile one request and report the outcome.
    ///
    /// Never panics and never returns an error: every failure becomes a
    /// report with `failed` set.
    pub fn ensure(&self, request: &Request, dry_run: bool) -> Report {
        let handle = match self.resolve(request.backend.tool(), request.executable.as_deref()) {
            Ok(handle) => handle,
            Err(e) => return Report::failure(e.to_string(), None),
        };
        let executable = Some(handle.path.clone());

        let resource = match self.bind(request, handle) {
            Ok(resource) => resource,
            Err(e) => return Report::failure(e.to_string(), executable),
        };

        let result = reconcile(&resource, &ApplyContext::new(dry_run));
        Report::from_outcome(result.outcome, executable)
    }
}
