//! Configuration file loading
//!
//! # Environment Variables
//!
//! - `PKGENSURE_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/pkgensure`)
//!
//! # Path Resolution Priority
//!
//! 1. `--config <PATH>` (must exist)
//! 2. `PKGENSURE_CONFIG_DIR/config.toml`
//! 3. `XDG_CONFIG_HOME/pkgensure/config.toml`
//! 4. `~/.config/pkgensure/config.toml`
//!
//! A missing file at any default location means built-in defaults.

use anyhow::{Context, Result, bail};
use pkgkit::{Tool, VersionPolicy};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "PKGENSURE_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

/// Settings read from `config.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Per-invocation timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Version mismatch handling
    pub version_policy: Option<VersionPolicy>,
    pub conda: ToolConfig,
    pub rscript: ToolConfig,
}

/// Where to find one tool
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Executable or installation root used when the command line gives none
    pub executable: Option<String>,
    /// Extra locations tried after the built-in ones
    pub extra_candidates: Vec<String>,
}

impl Config {
    /// Load from an explicit path, or from the default location if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let path = config_dir()?.join(CONFIG_FILE);
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Read and parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse config TOML.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.timeout_secs == Some(0) {
            bail!("timeout_secs must be at least 1");
        }
        Ok(config)
    }

    pub fn tool(&self, tool: Tool) -> &ToolConfig {
        match tool {
            Tool::Conda => &self.conda,
            Tool::Rscript => &self.rscript,
        }
    }

    /// Configured executable for a tool, with `~` expanded.
    pub fn executable_hint(&self, tool: Tool) -> Option<PathBuf> {
        self.tool(tool)
            .executable
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .map(expand_path)
    }
}

/// Get the pkgensure config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand_path(&dir);
        log::debug!("Using config dir from {ENV_CONFIG_DIR}: {}", path.display());
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        let path = PathBuf::from(xdg_config).join("pkgensure");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("pkgensure"))
}

/// Expand `~` and environment variables in a path
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
