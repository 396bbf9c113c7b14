//! Conda packages, optionally inside a named environment.

use super::{Backend, CondaEnvBackend, pin_token};
use crate::error::{Error, Result};
use crate::exec::{Session, args};
use crate::types::{BackendKind, Installed, PresentOptions, ResourceDescriptor};
use serde::Deserialize;

/// Installs, upgrades and removes conda packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct CondaPkgBackend;

#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    version: String,
}

impl Backend for CondaPkgBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::CondaPkg
    }

    fn label(&self) -> &'static str {
        "conda package"
    }

    fn list(&self, session: &Session<'_>, scope: Option<&str>) -> Result<Vec<Installed>> {
        let mut argv = args(["list", "--json"]);
        push_scope(&mut argv, scope);
        let output = session.query(&argv)?;
        parse_package_list(&output.stdout)
    }

    fn scope_exists(&self, session: &Session<'_>, scope: &str) -> Result<bool> {
        let envs = CondaEnvBackend.list(session, None)?;
        Ok(envs.iter().any(|env| env.name == scope))
    }

    fn install_args(
        &self,
        _session: &Session<'_>,
        descriptor: &ResourceDescriptor,
        _options: &PresentOptions,
    ) -> Result<Vec<String>> {
        let mut argv = args(["install", "-y", "-q", "--json"]);
        push_scope(&mut argv, descriptor.scope_name());
        if let Some(channel) = descriptor.location_name() {
            argv.extend(args(["-c", channel]));
        }
        argv.push(pin_token(&descriptor.name, descriptor.pinned_version()));
        Ok(argv)
    }

    fn remove_args(
        &self,
        _session: &Session<'_>,
        descriptor: &ResourceDescriptor,
        _options: &PresentOptions,
    ) -> Result<Vec<String>> {
        let mut argv = args(["remove", "-y", "-q", "--json", descriptor.name.as_str()]);
        push_scope(&mut argv, descriptor.scope_name());
        Ok(argv)
    }
}

fn push_scope(argv: &mut Vec<String>, scope: Option<&str>) {
    if let Some(scope) = scope.filter(|s| !s.trim().is_empty()) {
        argv.extend(args(["-n", scope]));
    }
}

/// Packages from `conda list --json`.
pub(crate) fn parse_package_list(stdout: &str) -> Result<Vec<Installed>> {
    let entries: Vec<ListEntry> =
        serde_json::from_str(stdout.trim()).map_err(|e| Error::MalformedOutput {
            what: "conda list".to_string(),
            detail: e.to_string(),
        })?;

    Ok(entries
        .into_iter()
        .map(|entry| Installed::new(entry.name, entry.version))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::mock::MockRunner;
    use crate::exec::{ExecContext, RawOutput};
    use crate::resource::ManagedResource;
    use crate::types::{ExecutableHandle, Presence, Tool};
    use declarative::{ApplyContext, DesiredState, reconcile};
    use std::sync::Arc;

    const PACKAGES: &str = r#"[
        {"base_url": "https://repo.anaconda.com/pkgs/main", "build_number": 0, "channel": "pkgs/main", "name": "numpy", "version": "1.2"},
        {"channel": "pkgs/main", "name": "python", "version": "3.9.18"}
    ]"#;

    fn handle() -> ExecutableHandle {
        ExecutableHandle::new("/opt/conda/bin/conda", Tool::Conda)
    }

    #[test]
    fn test_parse_package_list_ignores_extra_fields() {
        let packages = parse_package_list(PACKAGES).unwrap();
        assert_eq!(
            packages,
            vec![
                Installed::new("numpy", "1.2"),
                Installed::new("python", "3.9.18")
            ]
        );
    }

    #[test]
    fn test_parse_package_list_malformed() {
        let err = parse_package_list(r#"{"error": "oops"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedOutput { .. }));
    }

    #[test]
    fn test_list_passes_scope() {
        let mock = Arc::new(MockRunner::new());
        mock.on(&["list", "--json"], RawOutput::ok(PACKAGES));
        let ctx = ExecContext::new(mock.clone());
        let handle = handle();

        CondaPkgBackend
            .list(&ctx.session(&handle), Some("analysis"))
            .unwrap();
        CondaPkgBackend.list(&ctx.session(&handle), None).unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                vec!["list", "--json", "-n", "analysis"],
                vec!["list", "--json"]
            ]
        );
    }

    #[test]
    fn test_version_pin_presence() {
        let mock = Arc::new(MockRunner::new());
        mock.on(&["list", "--json"], RawOutput::ok(PACKAGES));
        let ctx = ExecContext::new(mock);
        let handle = handle();
        let session = ctx.session(&handle);
        let numpy = ResourceDescriptor::package("numpy");

        assert_eq!(
            CondaPkgBackend.presence(&session, &numpy, Some("1.2")).unwrap(),
            Presence::Present {
                version: Some("1.2".into())
            }
        );
        assert_eq!(
            CondaPkgBackend.presence(&session, &numpy, Some("1.3")).unwrap(),
            Presence::Mismatch {
                installed: "1.2".into(),
                wanted: "1.3".into()
            }
        );
    }

    #[test]
    fn test_listing_failure_is_backend_failure() {
        let mock = Arc::new(MockRunner::new());
        mock.on(
            &["list", "--json"],
            RawOutput::fail(1, "", "EnvironmentLocationNotFound: Not a conda environment"),
        );
        let ctx = ExecContext::new(mock);
        let handle = handle();
        let err = CondaPkgBackend
            .list(&ctx.session(&handle), Some("ghost"))
            .unwrap_err();
        assert!(matches!(err, Error::BackendFailure { .. }));
    }

    #[test]
    fn test_install_args_full() {
        let ctx = ExecContext::new(Arc::new(MockRunner::new()));
        let handle = handle();
        let descriptor = ResourceDescriptor::package("numpy")
            .with_version("1.3")
            .in_scope("analysis")
            .from_location("conda-forge");

        let argv = CondaPkgBackend
            .install_args(&ctx.session(&handle), &descriptor, &PresentOptions::default())
            .unwrap();
        assert_eq!(
            argv,
            vec![
                "install", "-y", "-q", "--json", "-n", "analysis", "-c", "conda-forge", "numpy=1.3"
            ]
        );
    }

    #[test]
    fn test_empty_flags_are_omitted() {
        let ctx = ExecContext::new(Arc::new(MockRunner::new()));
        let handle = handle();
        let descriptor = ResourceDescriptor::package("numpy")
            .with_version("")
            .in_scope("")
            .from_location("");

        let argv = CondaPkgBackend
            .install_args(&ctx.session(&handle), &descriptor, &PresentOptions::default())
            .unwrap();
        assert_eq!(argv, vec!["install", "-y", "-q", "--json", "numpy"]);
    }

    #[test]
    fn test_remove_args() {
        let ctx = ExecContext::new(Arc::new(MockRunner::new()));
        let handle = handle();
        let descriptor = ResourceDescriptor::package("numpy").in_scope("analysis");

        let argv = CondaPkgBackend
            .remove_args(&ctx.session(&handle), &descriptor, &PresentOptions::default())
            .unwrap();
        assert_eq!(
            argv,
            vec!["remove", "-y", "-q", "--json", "numpy", "-n", "analysis"]
        );
    }

    #[test]
    fn test_scope_exists_uses_env_listing() {
        let mock = Arc::new(MockRunner::new());
        mock.on(
            &["env", "list"],
            RawOutput::ok(r#"{"envs": ["/opt/conda", "/opt/conda/envs/analysis"]}"#),
        );
        let ctx = ExecContext::new(mock);
        let handle = handle();
        let session = ctx.session(&handle);

        assert!(CondaPkgBackend.scope_exists(&session, "analysis").unwrap());
        assert!(!CondaPkgBackend.scope_exists(&session, "ghost-env").unwrap());
    }

    #[test]
    fn test_root_environment_is_base() {
        let mock = Arc::new(MockRunner::new());
        mock.on(
            &["env", "list"],
            RawOutput::ok(r#"{"envs": ["/opt/miniforge3", "/opt/miniforge3/envs/analysis"]}"#),
        );
        mock.on(
            &["list", "--json"],
            RawOutput::ok(r#"[{"name": "numpy", "version": "1.3"}]"#),
        );
        let resource = ManagedResource::new(
            Box::new(CondaPkgBackend),
            ResourceDescriptor::package("numpy").in_scope("base"),
            DesiredState::Present,
            handle(),
            ExecContext::new(mock.clone()),
        );

        let result = reconcile(&resource, &ApplyContext::default());
        assert!(!result.outcome.is_failed());
        assert!(!result.outcome.is_changed());
        assert!(mock.ran(&["list", "--json", "-n", "base"]));
    }
}
