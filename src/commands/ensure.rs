//! `conda-env`, `conda-pkg` and `cran-pkg`: one resource per invocation

use anyhow::Result;
use pkgkit::{BackendKind, PresentOptions, Report, Request, ResourceDescriptor};
use std::process::ExitCode;

use crate::Context;
use crate::cli::{CondaEnvArgs, CondaPkgArgs, CranPkgArgs};
use crate::ui;

pub fn conda_env_request(args: CondaEnvArgs) -> Request {
    let options = PresentOptions {
        python: args.python,
        packages: args.packages,
        library: None,
    };
    with_hint(
        Request::new(
            BackendKind::CondaEnv,
            ResourceDescriptor::environment(args.name),
            args.state.into(),
        )
        .with_options(options),
        args.executable,
    )
}

pub fn conda_pkg_request(args: CondaPkgArgs) -> Request {
    let mut descriptor = ResourceDescriptor::package(args.name);
    descriptor.version = args.pkg_version;
    descriptor.scope = args.environment;
    descriptor.location = args.channel;
    with_hint(
        Request::new(BackendKind::CondaPkg, descriptor, args.state.into()),
        args.executable,
    )
}

pub fn cran_pkg_request(args: CranPkgArgs) -> Request {
    let mut descriptor = ResourceDescriptor::package(args.name);
    descriptor.location = args.repo;
    let options = PresentOptions {
        library: args.library,
        ..PresentOptions::default()
    };
    with_hint(
        Request::new(BackendKind::CranPkg, descriptor, args.state.into()).with_options(options),
        args.executable,
    )
}

fn with_hint(request: Request, executable: Option<std::path::PathBuf>) -> Request {
    match executable {
        Some(path) => request.with_executable(path),
        None => request,
    }
}

/// Reconcile one request, falling back to the configured executable.
pub fn ensure(ctx: &Context, mut request: Request) -> Report {
    if request.executable.is_none() {
        request.executable = ctx.config.executable_hint(request.backend.tool());
    }
    log::info!(
        "Ensuring {} {} is {}",
        request.backend.resource_type(),
        request.descriptor.id(),
        request.desired
    );
    ctx.client.ensure(&request, ctx.check)
}

pub fn run(ctx: &Context, request: Request) -> Result<ExitCode> {
    let label = request.descriptor.id();
    let report = ensure(ctx, request);

    if ctx.json {
        println!("{}", serde_json::to_string(&report)?);
    } else if !ctx.quiet || report.failed {
        ui::report(&label, &report, ctx.verbose);
    }

    Ok(super::exit_code(report.failed))
}
