//! Executable resolution.
//!
//! Candidate order:
//! 1. An explicit hint: a directory gets the tool's `bin/<program>` appended,
//!    anything else is used literally. A hint replaces every other candidate.
//! 2. Without a hint: the bare program name on the search path, then the
//!    tool's historical install locations, then any configured extras.
//!
//! The first candidate that is an existing executable file wins.

use crate::error::{Error, Result};
use crate::types::{ExecutableHandle, Tool};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment the resolver looks things up in.
///
/// Real runs use [`SearchEnv::from_process`]; tests build one by hand so
/// the host's PATH and home directory never leak in.
#[derive(Debug, Clone, Default)]
pub struct SearchEnv {
    /// Search path (same format as `PATH`)
    pub path: Option<OsString>,
    /// Home directory for `~` expansion
    pub home: Option<PathBuf>,
    /// Base for relative candidates
    pub cwd: PathBuf,
}

impl SearchEnv {
    /// Snapshot the current process environment.
    pub fn from_process() -> Self {
        Self {
            path: std::env::var_os("PATH"),
            home: dirs::home_dir(),
            cwd: std::env::current_dir().unwrap_or_default(),
        }
    }
}

/// Resolves one tool's executable.
#[derive(Debug, Clone)]
pub struct Resolver {
    tool: Tool,
    extra_candidates: Vec<String>,
}

impl Resolver {
    /// Resolver with the built-in candidate list.
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            extra_candidates: Vec::new(),
        }
    }

    /// Append configured candidates after the built-in fallbacks.
    pub fn with_extra_candidates(mut self, extra: impl IntoIterator<Item = String>) -> Self {
        self.extra_candidates.extend(extra);
        self
    }

    /// Ordered list of candidates for a hint.
    pub fn candidates(&self, hint: Option<&Path>) -> Vec<String> {
        if let Some(hint) = hint {
            let candidate = if hint.is_dir() {
                hint.join(self.tool.relative_bin())
            } else {
                hint.to_path_buf()
            };
            return vec![candidate.to_string_lossy().into_owned()];
        }

        std::iter::once(self.tool.program().to_string())
            .chain(self.tool.fallback_candidates().iter().map(|c| (*c).to_string()))
            .chain(self.extra_candidates.iter().cloned())
            .collect()
    }

    /// Resolve to a verified executable.
    pub fn resolve(&self, hint: Option<&Path>, env: &SearchEnv) -> Result<ExecutableHandle> {
        let candidates = self.candidates(hint);

        for candidate in &candidates {
            if let Some(path) = locate(candidate, env) {
                log::debug!("Resolved {} to {}", self.tool, path.display());
                return Ok(ExecutableHandle::new(path, self.tool));
            }
            log::trace!("{} candidate {candidate} not usable", self.tool);
        }

        Err(Error::ExecutableNotFound {
            tool: self.tool.program().to_string(),
            candidates,
        })
    }
}

/// Resolve a tool with the built-in candidates.
pub fn resolve(tool: Tool, hint: Option<&Path>, env: &SearchEnv) -> Result<ExecutableHandle> {
    Resolver::new(tool).resolve(hint, env)
}

/// Turn one candidate into an executable path, if it is one.
fn locate(candidate: &str, env: &SearchEnv) -> Option<PathBuf> {
    let expanded = shellexpand::tilde_with_context(candidate, || {
        env.home.as_deref().and_then(Path::to_str)
    });
    let path = Path::new(expanded.as_ref());

    // A bare name goes through the search path
    if path.components().count() == 1 && !path.is_absolute() {
        return which::which_in(path, env.path.as_ref(), &env.cwd).ok();
    }

    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env.cwd.join(path)
    };
    is_executable(&path).then_some(path)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn write_executable(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn env(path: Option<&Path>, home: &Path) -> SearchEnv {
        SearchEnv {
            path: path.map(|p| p.as_os_str().to_owned()),
            home: Some(home.to_path_buf()),
            cwd: home.to_path_buf(),
        }
    }

    #[test]
    fn test_search_path_beats_fallback() {
        let tmp = TempDir::new().unwrap();
        let path_dir = tmp.path().join("path-bin");
        write_executable(&path_dir.join("conda"));
        write_executable(&tmp.path().join("anaconda/bin/conda"));

        let handle = resolve(Tool::Conda, None, &env(Some(&path_dir), tmp.path())).unwrap();
        assert_eq!(handle.path, path_dir.join("conda"));
        assert_eq!(handle.tool, Tool::Conda);
    }

    #[test]
    fn test_fallback_order_under_home() {
        let tmp = TempDir::new().unwrap();
        write_executable(&tmp.path().join("anaconda3/bin/conda"));
        write_executable(&tmp.path().join("anaconda/bin/conda"));

        let handle = resolve(Tool::Conda, None, &env(None, tmp.path())).unwrap();
        assert_eq!(handle.path, tmp.path().join("anaconda/bin/conda"));

        fs::remove_file(tmp.path().join("anaconda/bin/conda")).unwrap();
        let handle = resolve(Tool::Conda, None, &env(None, tmp.path())).unwrap();
        assert_eq!(handle.path, tmp.path().join("anaconda3/bin/conda"));
    }

    #[test]
    fn test_directory_hint_appends_bin() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("miniforge");
        write_executable(&root.join("bin/conda"));

        let handle = resolve(Tool::Conda, Some(&root), &env(None, tmp.path())).unwrap();
        assert_eq!(handle.path, root.join("bin/conda"));
    }

    #[test]
    fn test_file_hint_is_the_only_candidate() {
        let tmp = TempDir::new().unwrap();
        let path_dir = tmp.path().join("path-bin");
        write_executable(&path_dir.join("conda"));
        let missing = tmp.path().join("nowhere/conda");

        let err = resolve(Tool::Conda, Some(&missing), &env(Some(&path_dir), tmp.path()))
            .unwrap_err();
        match err {
            Error::ExecutableNotFound { candidates, .. } => {
                assert_eq!(candidates, vec![missing.to_string_lossy().into_owned()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extra_candidate_expands_home() {
        let tmp = TempDir::new().unwrap();
        write_executable(&tmp.path().join("tools/conda"));

        let handle = Resolver::new(Tool::Conda)
            .with_extra_candidates(["~/tools/conda".to_string()])
            .resolve(None, &env(None, tmp.path()))
            .unwrap();
        assert_eq!(handle.path, tmp.path().join("tools/conda"));
    }

    #[test]
    fn test_non_executable_file_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let plain = tmp.path().join("anaconda/bin/conda");
        fs::create_dir_all(plain.parent().unwrap()).unwrap();
        fs::write(&plain, "not executable").unwrap();
        fs::set_permissions(&plain, fs::Permissions::from_mode(0o644)).unwrap();

        assert!(resolve(Tool::Conda, None, &env(None, tmp.path())).is_err());
    }

    #[test]
    fn test_not_found_lists_every_candidate_in_order() {
        let tmp = TempDir::new().unwrap();
        let err = Resolver::new(Tool::Conda)
            .with_extra_candidates(["/opt/miniforge/bin/conda".to_string()])
            .resolve(None, &env(None, tmp.path()))
            .unwrap_err();

        match err {
            Error::ExecutableNotFound { tool, candidates } => {
                assert_eq!(tool, "conda");
                assert_eq!(
                    candidates,
                    vec![
                        "conda",
                        "~/anaconda/bin/conda",
                        "~/anaconda3/bin/conda",
                        "/opt/miniforge/bin/conda"
                    ]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
