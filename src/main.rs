mod cli;
mod commands;
mod config;
mod manifest;
mod signal;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::Config;
use pkgkit::{Client, ExecContext, Tool, VersionPolicy};
use std::io;
use std::process::ExitCode;
use std::time::Duration;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub json: bool,
    pub check: bool,
    pub config: Config,
    pub client: Client,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "pkgensure", &mut io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::load(cli.config.as_deref())?;

    let timeout = cli
        .timeout
        .or(config.timeout_secs)
        .map_or(pkgkit::exec::DEFAULT_TIMEOUT, Duration::from_secs);
    let policy: VersionPolicy = cli
        .version_policy
        .map(Into::into)
        .or(config.version_policy)
        .unwrap_or_default();
    log::debug!("timeout={}s version_policy={policy}", timeout.as_secs());

    let exec = ExecContext::system()
        .with_timeout(timeout)
        .with_cancel(signal::install());
    let client = Tool::ALL.iter().fold(
        Client::with_context(exec).with_version_policy(policy),
        |client, &tool| client.with_extra_candidates(tool, config.tool(tool).extra_candidates.clone()),
    );

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        json: cli.json,
        check: cli.check,
        config,
        client,
    };

    match cli.command {
        Command::CondaEnv(args) => {
            commands::ensure::run(&ctx, commands::ensure::conda_env_request(args))
        }
        Command::CondaPkg(args) => {
            commands::ensure::run(&ctx, commands::ensure::conda_pkg_request(args))
        }
        Command::CranPkg(args) => {
            commands::ensure::run(&ctx, commands::ensure::cran_pkg_request(args))
        }
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::Doctor => commands::doctor::run(&ctx),
        Command::Completions { .. } => Ok(ExitCode::SUCCESS),
    }
}
