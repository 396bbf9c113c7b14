//! Conda environments.

use super::Backend;
use crate::error::{Error, Result};
use crate::exec::{Session, args};
use crate::types::{BackendKind, Installed, PresentOptions, ResourceDescriptor};
use serde::Deserialize;

/// Creates and removes named conda environments.
#[derive(Debug, Clone, Copy, Default)]
pub struct CondaEnvBackend;

#[derive(Debug, Deserialize)]
struct EnvList {
    envs: Vec<String>,
}

impl Backend for CondaEnvBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::CondaEnv
    }

    fn label(&self) -> &'static str {
        "conda environment"
    }

    fn validate(&self, descriptor: &ResourceDescriptor) -> Result<()> {
        if descriptor.pinned_version().is_some() {
            return Err(Error::InvalidRequest(format!(
                "environment {} cannot be pinned to a version; set python or packages instead",
                descriptor.name
            )));
        }
        if descriptor.scope_name().is_some() {
            return Err(Error::InvalidRequest(format!(
                "environment {} cannot live inside another environment",
                descriptor.name
            )));
        }
        Ok(())
    }

    fn list(&self, session: &Session<'_>, _scope: Option<&str>) -> Result<Vec<Installed>> {
        let output = session.query(&args(["env", "list", "--json"]))?;
        parse_env_list(&output.stdout)
    }

    fn install_args(
        &self,
        _session: &Session<'_>,
        descriptor: &ResourceDescriptor,
        options: &PresentOptions,
    ) -> Result<Vec<String>> {
        let mut argv = args(["create", "-y", "-n", descriptor.name.as_str(), "--json"]);
        if let Some(python) = options.python.as_deref().filter(|p| !p.trim().is_empty()) {
            argv.push(format!("python={python}"));
        }
        argv.extend(
            options
                .packages
                .iter()
                .filter(|p| !p.trim().is_empty())
                .cloned(),
        );
        Ok(argv)
    }

    fn remove_args(
        &self,
        _session: &Session<'_>,
        descriptor: &ResourceDescriptor,
        _options: &PresentOptions,
    ) -> Result<Vec<String>> {
        Ok(args([
            "env",
            "remove",
            "-y",
            "-n",
            descriptor.name.as_str(),
            "--json",
        ]))
    }
}

/// Environment names from `conda env list --json`.
///
/// Conda reports prefixes; the name is the last path component. The first
/// prefix is the root installation, which conda also answers to as `base`.
pub(crate) fn parse_env_list(stdout: &str) -> Result<Vec<Installed>> {
    let list: EnvList = serde_json::from_str(stdout.trim()).map_err(|e| Error::MalformedOutput {
        what: "conda env list".to_string(),
        detail: e.to_string(),
    })?;

    let mut envs = Vec::with_capacity(list.envs.len() + 1);
    for (i, prefix) in list.envs.iter().enumerate() {
        if i == 0 {
            envs.push(Installed::unversioned(ROOT_ENV));
        }
        if let Some(name) = env_name(prefix).filter(|name| i > 0 || name != ROOT_ENV) {
            envs.push(Installed::unversioned(name));
        }
    }
    Ok(envs)
}

const ROOT_ENV: &str = "base";

fn env_name(prefix: &str) -> Option<String> {
    prefix
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
