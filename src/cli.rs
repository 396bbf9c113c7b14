use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use declarative::DesiredState;
use pkgkit::VersionPolicy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pkgensure")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Ensure conda environments, conda packages and CRAN packages are present or absent",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Report what would change without changing anything
    #[arg(long, global = true)]
    pub check: bool,

    /// Seconds to wait for each conda/Rscript invocation
    #[arg(
        long,
        value_name = "SECS",
        env = "PKGENSURE_TIMEOUT",
        global = true,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: Option<u64>,

    /// What to do when an installed version differs from the pinned one
    #[arg(long, value_enum, global = true)]
    pub version_policy: Option<PolicyArg>,

    /// Config file (default: ~/.config/pkgensure/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ensure a conda environment exists or not
    CondaEnv(CondaEnvArgs),

    /// Ensure a conda package is installed or not
    CondaPkg(CondaPkgArgs),

    /// Ensure an R package from CRAN is installed or not
    CranPkg(CranPkgArgs),

    /// Reconcile every resource declared in a manifest
    Apply(ApplyArgs),

    /// Show which conda and Rscript executables would be used
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    #[default]
    Present,
    Absent,
}

impl From<StateArg> for DesiredState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Present => DesiredState::Present,
            StateArg::Absent => DesiredState::Absent,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Install the pinned version as if the package were missing
    Reinstall,
    /// Upgrade the installed package in place
    Upgrade,
}

impl From<PolicyArg> for VersionPolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Reinstall => VersionPolicy::Reinstall,
            PolicyArg::Upgrade => VersionPolicy::Upgrade,
        }
    }
}

#[derive(Args, Debug)]
pub struct CondaEnvArgs {
    /// Environment name
    #[arg(short, long)]
    pub name: String,

    /// Python version for a new environment
    #[arg(long)]
    pub python: Option<String>,

    /// Extra package for a new environment (repeatable or comma-separated)
    #[arg(short = 'p', long = "package", alias = "packages", value_delimiter = ',')]
    pub packages: Vec<String>,

    /// Desired state
    #[arg(long, value_enum, default_value_t)]
    pub state: StateArg,

    /// conda executable or installation root
    #[arg(long, visible_alias = "path")]
    pub executable: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CondaPkgArgs {
    /// Package name
    #[arg(short, long)]
    pub name: String,

    /// Exact version to require
    #[arg(long = "version", visible_alias = "ver")]
    pub pkg_version: Option<String>,

    /// Environment to operate in
    #[arg(short = 'e', long = "env", visible_alias = "environment")]
    pub environment: Option<String>,

    /// Channel to install from
    #[arg(short, long)]
    pub channel: Option<String>,

    /// Desired state
    #[arg(long, value_enum, default_value_t)]
    pub state: StateArg,

    /// conda executable or installation root
    #[arg(long, visible_alias = "path")]
    pub executable: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CranPkgArgs {
    /// Package name
    #[arg(short, long)]
    pub name: String,

    /// CRAN mirror URL (default: R's configured repository)
    #[arg(long)]
    pub repo: Option<String>,

    /// Library directory (default: first entry of .libPaths())
    #[arg(long, visible_alias = "lib")]
    pub library: Option<String>,

    /// Desired state
    #[arg(long, value_enum, default_value_t)]
    pub state: StateArg,

    /// Rscript executable or R installation root
    #[arg(long, visible_alias = "path")]
    pub executable: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Manifest file with [[resource]] entries
    pub manifest: PathBuf,

    /// Only reconcile matching resources: type or type.name (e.g. conda_pkg.numpy)
    #[arg(short, long)]
    pub target: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_timeout_must_be_positive() {
        let parse = |secs: &str| {
            Cli::try_parse_from(["pkgensure", "--timeout", secs, "doctor"]).map(|cli| cli.timeout)
        };
        assert!(parse("0").is_err());
        assert_eq!(parse("30").unwrap(), Some(30));
    }

    #[test]
    fn test_conda_pkg_aliases() {
        let cli = Cli::parse_from([
            "pkgensure",
            "conda-pkg",
            "--name",
            "numpy",
            "--ver",
            "1.3",
            "--environment",
            "analysis",
            "--path",
            "/opt/conda",
        ]);
        let Command::CondaPkg(args) = cli.command else {
            panic!("expected conda-pkg");
        };
        assert_eq!(args.pkg_version.as_deref(), Some("1.3"));
        assert_eq!(args.environment.as_deref(), Some("analysis"));
        assert_eq!(args.executable, Some(PathBuf::from("/opt/conda")));
        assert_eq!(args.state, StateArg::Present);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "pkgensure",
            "conda-env",
            "-n",
            "analysis",
            "-p",
            "numpy,pandas",
            "--state",
            "absent",
            "--check",
            "--json",
            "--timeout",
            "30",
            "--version-policy",
            "upgrade",
        ]);
        assert!(cli.check);
        assert!(cli.json);
        assert_eq!(cli.timeout, Some(30));
        assert_eq!(cli.version_policy, Some(PolicyArg::Upgrade));
        let Command::CondaEnv(args) = cli.command else {
            panic!("expected conda-env");
        };
        assert_eq!(args.packages, vec!["numpy", "pandas"]);
        assert_eq!(args.state, StateArg::Absent);
    }
}
