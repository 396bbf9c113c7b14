//! Backend abstraction over the wrapped package managers.
//!
//! The [`Backend`] trait is everything that differs between the conda
//! environment manager, the conda package manager and R/CRAN: how to list
//! what exists, and which argument vector creates, upgrades or removes a
//! resource. Deciding *whether* to run any of those is the reconciler's job
//! and lives in the `declarative` crate.

pub mod conda_env;
pub mod conda_pkg;
pub mod cran;

use crate::error::Result;
use crate::exec::Session;
use crate::types::{
    BackendKind, Installed, Presence, PresentOptions, ResourceDescriptor, ResourceKind,
};
use std::fmt;

pub use conda_env::CondaEnvBackend;
pub use conda_pkg::CondaPkgBackend;
pub use cran::CranBackend;

/// Capabilities a package-manager backend provides.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Human label, e.g. "conda environment".
    fn label(&self) -> &'static str;

    /// Reject requests this backend cannot express.
    fn validate(&self, _descriptor: &ResourceDescriptor) -> Result<()> {
        Ok(())
    }

    /// List existing resources, optionally inside a scope.
    fn list(&self, session: &Session<'_>, scope: Option<&str>) -> Result<Vec<Installed>>;

    /// Existence check against a fresh listing.
    ///
    /// `pin` is the version that must match exactly; `None` means any
    /// installed version counts.
    fn presence(
        &self,
        session: &Session<'_>,
        descriptor: &ResourceDescriptor,
        pin: Option<&str>,
    ) -> Result<Presence> {
        let installed = self.list(session, descriptor.scope_name())?;
        Ok(presence_in(&installed, &descriptor.name, pin))
    }

    /// Whether the enclosing scope exists. Backends without scopes say yes.
    fn scope_exists(&self, _session: &Session<'_>, _scope: &str) -> Result<bool> {
        Ok(true)
    }

    /// Arguments that create or install the resource.
    fn install_args(
        &self,
        session: &Session<'_>,
        descriptor: &ResourceDescriptor,
        options: &PresentOptions,
    ) -> Result<Vec<String>>;

    /// Arguments that move an installed resource to the pinned version.
    fn upgrade_args(
        &self,
        session: &Session<'_>,
        descriptor: &ResourceDescriptor,
        options: &PresentOptions,
    ) -> Result<Vec<String>> {
        self.install_args(session, descriptor, options)
    }

    /// Arguments that remove the resource.
    fn remove_args(
        &self,
        session: &Session<'_>,
        descriptor: &ResourceDescriptor,
        options: &PresentOptions,
    ) -> Result<Vec<String>>;

    /// Message when nothing had to be created.
    fn present_message(&self, descriptor: &ResourceDescriptor) -> String {
        match descriptor.kind {
            ResourceKind::Environment => format!("Environment {} already exists", descriptor.name),
            ResourceKind::Package => format!("Package {} already installed", descriptor.name),
        }
    }

    /// Message when nothing had to be removed.
    fn absent_message(&self, descriptor: &ResourceDescriptor) -> String {
        match descriptor.kind {
            ResourceKind::Environment => format!("Environment {} does not exist", descriptor.name),
            ResourceKind::Package => format!("Package {} is not installed", descriptor.name),
        }
    }
}

/// Backend for a request kind.
pub fn for_kind(kind: BackendKind) -> Box<dyn Backend> {
    match kind {
        BackendKind::CondaEnv => Box::new(CondaEnvBackend),
        BackendKind::CondaPkg => Box::new(CondaPkgBackend),
        BackendKind::CranPkg => Box::new(CranBackend),
    }
}

/// Match a name (and optional exact version) against a listing.
///
/// A name match at a different version is a [`Presence::Mismatch`], never
/// a silent success.
pub fn presence_in(installed: &[Installed], name: &str, pin: Option<&str>) -> Presence {
    let mut matches = installed.iter().filter(|i| i.name == name).peekable();
    let Some(first) = matches.peek().copied() else {
        return Presence::Absent;
    };

    let Some(wanted) = pin else {
        return Presence::Present {
            version: first.version.clone(),
        };
    };

    if matches.any(|i| i.version.as_deref() == Some(wanted)) {
        return Presence::Present {
            version: Some(wanted.to_string()),
        };
    }

    Presence::Mismatch {
        installed: first
            .version
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        wanted: wanted.to_string(),
    }
}

/// Conda's version pin token: `name=version`, or the bare name.
pub(crate) fn pin_token(name: &str, version: Option<&str>) -> String {
    match version {
        Some(version) => format!("{name}={version}"),
        None => name.to_string(),
    }
}
