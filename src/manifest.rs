//! Manifest of resources for `pkgensure apply`
//!
//! ```toml
//! [[resource]]
//! type = "conda_env"
//! name = "analysis"
//! python = "3.9"
//! packages = ["numpy"]
//!
//! [[resource]]
//! type = "conda_pkg"
//! name = "scipy"
//! version = "1.11.4"
//! env = "analysis"
//! channel = "conda-forge"
//!
//! [[resource]]
//! type = "cran_pkg"
//! name = "glue"
//! state = "absent"
//! ```

use anyhow::{Context, Result, bail};
use declarative::DesiredState;
use pkgkit::{BackendKind, PresentOptions, Request, ResourceDescriptor};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::config::expand_path;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default, rename = "resource")]
    pub resources: Vec<Entry>,
}

/// One `[[resource]]` table
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entry {
    #[serde(rename = "type")]
    pub kind: BackendKind,
    pub name: String,
    #[serde(default)]
    pub state: DesiredState,
    pub version: Option<String>,
    #[serde(alias = "environment")]
    pub env: Option<String>,
    pub channel: Option<String>,
    pub repo: Option<String>,
    #[serde(alias = "lib")]
    pub library: Option<String>,
    pub python: Option<String>,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(alias = "path")]
    pub executable: Option<String>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

impl Entry {
    /// Build the request, rejecting fields that do not apply to the type.
    pub fn to_request(&self) -> Result<Request> {
        let label = format!("{} {}", self.kind.resource_type(), self.name);

        let (descriptor, options) = match self.kind {
            BackendKind::CondaEnv => {
                self.reject(&label, &[
                    ("version", self.version.is_some()),
                    ("env", self.env.is_some()),
                    ("channel", self.channel.is_some()),
                    ("repo", self.repo.is_some()),
                    ("library", self.library.is_some()),
                ])?;
                let options = PresentOptions {
                    python: self.python.clone(),
                    packages: self.packages.clone(),
                    library: None,
                };
                (ResourceDescriptor::environment(&self.name), options)
            }
            BackendKind::CondaPkg => {
                self.reject(&label, &[
                    ("repo", self.repo.is_some()),
                    ("library", self.library.is_some()),
                    ("python", self.python.is_some()),
                    ("packages", !self.packages.is_empty()),
                ])?;
                let mut descriptor = ResourceDescriptor::package(&self.name);
                descriptor.version = self.version.clone();
                descriptor.scope = self.env.clone();
                descriptor.location = self.channel.clone();
                (descriptor, PresentOptions::default())
            }
            BackendKind::CranPkg => {
                self.reject(&label, &[
                    ("env", self.env.is_some()),
                    ("channel", self.channel.is_some()),
                    ("python", self.python.is_some()),
                    ("packages", !self.packages.is_empty()),
                ])?;
                let mut descriptor = ResourceDescriptor::package(&self.name);
                descriptor.version = self.version.clone();
                descriptor.location = self.repo.clone();
                let options = PresentOptions {
                    library: self.library.clone(),
                    ..PresentOptions::default()
                };
                (descriptor, options)
            }
        };

        let mut request = Request::new(self.kind, descriptor, self.state).with_options(options);
        if let Some(executable) = self.executable.as_deref() {
            request = request.with_executable(expand_path(executable));
        }
        Ok(request)
    }

    fn reject(&self, label: &str, fields: &[(&str, bool)]) -> Result<()> {
        let unexpected: Vec<&str> = fields
            .iter()
            .filter(|(_, set)| *set)
            .map(|(name, _)| *name)
            .collect();
        if !unexpected.is_empty() {
            bail!("{label}: {} not valid for this type", unexpected.join(", "));
        }
        Ok(())
    }
}
