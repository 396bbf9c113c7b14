//! Core types for package-manager reconciliation.

use declarative::{DesiredState, Message, Outcome};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kind of managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// A named conda environment
    Environment,
    /// A package, optionally inside an environment
    Package,
}

/// Which backend a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// conda environments
    CondaEnv,
    /// conda packages
    CondaPkg,
    /// R packages from CRAN
    CranPkg,
}

impl BackendKind {
    /// Resource type string used for filtering and display.
    pub fn resource_type(&self) -> &'static str {
        match self {
            BackendKind::CondaEnv => "conda_env",
            BackendKind::CondaPkg => "conda_pkg",
            BackendKind::CranPkg => "cran_pkg",
        }
    }

    /// Kind of resource this backend manages.
    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            BackendKind::CondaEnv => ResourceKind::Environment,
            BackendKind::CondaPkg | BackendKind::CranPkg => ResourceKind::Package,
        }
    }

    /// Tool that backs this kind.
    pub fn tool(&self) -> Tool {
        match self {
            BackendKind::CondaEnv | BackendKind::CondaPkg => Tool::Conda,
            BackendKind::CranPkg => Tool::Rscript,
        }
    }
}

/// External executable a backend drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// The conda CLI
    Conda,
    /// R's script front-end
    Rscript,
}

impl Tool {
    /// Every known tool.
    pub const ALL: [Tool; 2] = [Tool::Conda, Tool::Rscript];

    /// Bare program name looked up on the search path.
    pub fn program(&self) -> &'static str {
        match self {
            Tool::Conda => "conda",
            Tool::Rscript => "Rscript",
        }
    }

    /// Location of the binary relative to an installation root.
    pub fn relative_bin(&self) -> PathBuf {
        Path::new("bin").join(self.program())
    }

    /// Historical install locations, tried in order after the search path.
    pub fn fallback_candidates(&self) -> &'static [&'static str] {
        match self {
            Tool::Conda => &["~/anaconda/bin/conda", "~/anaconda3/bin/conda"],
            Tool::Rscript => &["/usr/bin/Rscript"],
        }
    }

    /// How this tool's output is decoded.
    pub fn dialect(&self) -> Dialect {
        match self {
            Tool::Conda => Dialect::Json,
            Tool::Rscript => Dialect::Text,
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

/// Output convention of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Machine-readable JSON on stdout (`--json`)
    Json,
    /// Free text
    Text,
}

/// A resolved executable, valid for one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableHandle {
    /// Absolute path to the binary
    pub path: PathBuf,
    /// Tool dialect it speaks
    pub tool: Tool,
}

impl ExecutableHandle {
    /// Create a handle.
    pub fn new(path: impl Into<PathBuf>, tool: Tool) -> Self {
        Self {
            path: path.into(),
            tool,
        }
    }

    /// Program name for messages.
    pub fn program(&self) -> &'static str {
        self.tool.program()
    }
}

/// What the caller wants to exist (or not).
///
/// Identity is `(kind, scope, name)`. `version` refines an existence check
/// but is not part of identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Environment or package
    pub kind: ResourceKind,
    /// Resource name
    pub name: String,
    /// Optional pinned version
    #[serde(default)]
    pub version: Option<String>,
    /// Enclosing environment
    #[serde(default)]
    pub scope: Option<String>,
    /// Channel or repository
    #[serde(default)]
    pub location: Option<String>,
}

impl ResourceDescriptor {
    /// Describe a conda environment.
    pub fn environment(name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Environment,
            name: name.into(),
            version: None,
            scope: None,
            location: None,
        }
    }

    /// Describe a package.
    pub fn package(name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Package,
            name: name.into(),
            version: None,
            scope: None,
            location: None,
        }
    }

    /// Pin a version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the enclosing environment.
    pub fn in_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the channel or repository.
    pub fn from_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Identity triple.
    pub fn identity(&self) -> (ResourceKind, Option<&str>, &str) {
        (self.kind, self.scope_name(), &self.name)
    }

    /// Stable id: `scope/name` when scoped, else `name`.
    pub fn id(&self) -> String {
        match self.scope_name() {
            Some(scope) => format!("{scope}/{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Version pin, ignoring empty strings.
    pub fn pinned_version(&self) -> Option<&str> {
        non_empty(self.version.as_deref())
    }

    /// Scope, ignoring empty strings.
    pub fn scope_name(&self) -> Option<&str> {
        non_empty(self.scope.as_deref())
    }

    /// Channel or repository, ignoring empty strings.
    pub fn location_name(&self) -> Option<&str> {
        non_empty(self.location.as_deref())
    }
}

/// An entry reported by a listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installed {
    /// Resource name
    pub name: String,
    /// Installed version; environments have none
    pub version: Option<String>,
}

impl Installed {
    /// Listing entry with a version.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }

    /// Listing entry without a version.
    pub fn unversioned(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }
}

/// Result of an existence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// Nothing with that name
    Absent,
    /// Name matches and the pin (if any) matches too
    Present {
        /// Version found, if the listing reports one
        version: Option<String>,
    },
    /// Name matches but a pinned version differs
    Mismatch {
        /// Version found
        installed: String,
        /// Version requested
        wanted: String,
    },
}

/// What to do when a pinned version differs from the installed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicy {
    /// Treat the package as missing and install the pinned version
    #[default]
    Reinstall,
    /// Treat the package as present-but-modified and upgrade it in place
    Upgrade,
}

impl std::fmt::Display for VersionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Reinstall => "reinstall",
            Self::Upgrade => "upgrade",
        })
    }
}

impl std::str::FromStr for VersionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reinstall" => Ok(Self::Reinstall),
            "upgrade" => Ok(Self::Upgrade),
            other => Err(format!(
                "invalid version policy '{other}': expected reinstall or upgrade"
            )),
        }
    }
}

/// Backend-specific extras for `Present`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentOptions {
    /// Python version for a new environment
    #[serde(default)]
    pub python: Option<String>,
    /// Extra packages installed into a new environment
    #[serde(default)]
    pub packages: Vec<String>,
    /// R library directory
    #[serde(default)]
    pub library: Option<String>,
}

/// A complete ensure request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Target backend
    pub backend: BackendKind,
    /// What is being declared
    pub descriptor: ResourceDescriptor,
    /// Present or absent
    pub desired: DesiredState,
    /// Backend extras
    pub options: PresentOptions,
    /// Explicit executable path or installation root
    pub executable: Option<PathBuf>,
}

impl Request {
    /// Build a request with default options.
    pub fn new(backend: BackendKind, descriptor: ResourceDescriptor, desired: DesiredState) -> Self {
        Self {
            backend,
            descriptor,
            desired,
            options: PresentOptions::default(),
            executable: None,
        }
    }

    /// Attach backend extras.
    pub fn with_options(mut self, options: PresentOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach an executable hint.
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = Some(executable.into());
        self
    }
}

/// Caller-facing result: the outcome plus the executable used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Whether the run failed
    pub failed: bool,
    /// Whether state changed
    pub changed: bool,
    /// Message or tool payload
    pub msg: Message,
    /// Resolved executable, when resolution succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,
}

impl Report {
    /// Wrap an outcome.
    pub fn from_outcome(outcome: Outcome, executable: Option<PathBuf>) -> Self {
        Self {
            failed: outcome.is_failed(),
            changed: outcome.is_changed(),
            msg: outcome.into_message(),
            executable,
        }
    }

    /// A failure that happened before reconciliation started.
    pub fn failure(msg: impl Into<Message>, executable: Option<PathBuf>) -> Self {
        Self::from_outcome(Outcome::failed(msg), executable)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_ignores_version() {
        let a = ResourceDescriptor::package("numpy").in_scope("analysis");
        let b = a.clone().with_version("1.2");
        assert_eq!(a.identity(), b.identity());
        assert_eq!(b.id(), "analysis/numpy");
    }

    #[test]
    fn test_empty_parameters_are_ignored() {
        let d = ResourceDescriptor::package("numpy")
            .with_version("")
            .in_scope(" ")
            .from_location("conda-forge");
        assert_eq!(d.pinned_version(), None);
        assert_eq!(d.scope_name(), None);
        assert_eq!(d.location_name(), Some("conda-forge"));
    }

    #[test]
    fn test_tool_conventions() {
        assert_eq!(Tool::Conda.relative_bin(), Path::new("bin/conda"));
        assert_eq!(Tool::Rscript.relative_bin(), Path::new("bin/Rscript"));
        assert_eq!(
            Tool::Conda.fallback_candidates(),
            &["~/anaconda/bin/conda", "~/anaconda3/bin/conda"]
        );
    }

    #[test]
    fn test_report_json_shape() {
        let report = Report::from_outcome(
            Outcome::unchanged("Environment analysis already exists"),
            Some(PathBuf::from("/opt/conda/bin/conda")),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "failed": false,
                "changed": false,
                "msg": "Environment analysis already exists",
                "executable": "/opt/conda/bin/conda"
            })
        );

        let failure = serde_json::to_value(Report::failure("nope", None)).unwrap();
        assert!(failure.get("executable").is_none());
        assert_eq!(failure["failed"], true);
    }

    #[test]
    fn test_version_policy_parse() {
        assert_eq!("upgrade".parse::<VersionPolicy>(), Ok(VersionPolicy::Upgrade));
        assert!("latest".parse::<VersionPolicy>().is_err());
    }
}
