//! `apply` - reconcile every resource in a manifest, in order
//!
//! Entries that cannot even be bound (no executable, invalid fields) still
//! take their place in the plan and fail there, so one bad entry never
//! hides the others.

use anyhow::{Result, bail};
use declarative::{
    Action, ApplyContext, BoxedResource, DesiredState, ExecuteOptions, ExecuteReport,
    ExecuteSummary, ExecutionPlan, Message, ProgressCallback, Reconciled, Resource,
    ResourceState, execute, execute_simple, matches_target,
};
use pkgkit::{BackendKind, Report};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::manifest::{Entry, Manifest};
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<ExitCode> {
    let manifest = Manifest::load(&args.manifest)?;
    let bound = plan(ctx, &manifest, args.target.as_deref());

    if bound.plan.is_empty() {
        if !ctx.json {
            ui::warn("No resources to reconcile");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let opts = ExecuteOptions { dry_run: ctx.check };

    if ctx.check && !ctx.json && !ctx.quiet {
        ui::info("Check mode: nothing will be changed");
    }

    let report = if ctx.json || ctx.quiet {
        execute_simple(&bound.plan, &opts)
    } else {
        let mut printer = Printer::new(ctx.verbose, &bound.executables);
        execute(&bound.plan, &opts, &mut printer)
    };

    if ctx.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&to_json(&report, &bound.executables))?
        );
    } else if !ctx.quiet || !report.summary.is_success() {
        ui::summary(&report.summary, ctx.check);
    }

    Ok(super::exit_code(!report.summary.is_success()))
}

/// Manifest entries bound to resources, in manifest order
pub struct Bound {
    pub plan: ExecutionPlan,
    /// Resolved executable per plan slot
    pub executables: Vec<Option<PathBuf>>,
}

/// Build a plan with one resource per manifest entry matching `target`.
pub fn plan(ctx: &Context, manifest: &Manifest, target: Option<&str>) -> Bound {
    let mut bound = Bound {
        plan: ExecutionPlan::new(),
        executables: Vec::new(),
    };
    for entry in &manifest.resources {
        let (resource, executable) = bind(ctx, entry);
        if target.is_some_and(|t| !matches_target(resource.as_ref(), t)) {
            continue;
        }
        bound.plan.push(resource);
        bound.executables.push(executable);
    }
    bound
}

fn bind(ctx: &Context, entry: &Entry) -> (BoxedResource, Option<PathBuf>) {
    let mut executable = None;
    let bound = entry.to_request().and_then(|mut request| {
        let tool = request.backend.tool();
        if request.executable.is_none() {
            request.executable = ctx.config.executable_hint(tool);
        }
        let handle = ctx.client.resolve(tool, request.executable.as_deref())?;
        executable = Some(handle.path.clone());
        Ok(ctx.client.bind(&request, handle)?)
    });

    match bound {
        Ok(resource) => (Box::new(resource), executable),
        Err(e) => {
            log::debug!("Could not bind {} {}: {e:#}", entry.kind.resource_type(), entry.name);
            let unbound = Unbound {
                id: entry_id(entry),
                kind: entry.kind,
                desired: entry.state,
                error: format!("{e:#}"),
            };
            (Box::new(unbound), executable)
        }
    }
}

fn entry_id(entry: &Entry) -> String {
    match (entry.kind, entry.env.as_deref()) {
        (BackendKind::CondaPkg, Some(env)) if !env.is_empty() => format!("{env}/{}", entry.name),
        _ => entry.name.clone(),
    }
}

/// Stand-in for an entry that failed before reconciliation
#[derive(Debug)]
struct Unbound {
    id: String,
    kind: BackendKind,
    desired: DesiredState,
    error: String,
}

impl Resource for Unbound {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn description(&self) -> String {
        format!("{} {}", self.kind.resource_type(), self.id)
    }

    fn resource_type(&self) -> &'static str {
        self.kind.resource_type()
    }

    fn precondition(&self) -> Result<()> {
        bail!("{}", self.error)
    }

    fn current_state(&self) -> Result<ResourceState> {
        Ok(ResourceState::Unknown)
    }

    fn desired_state(&self) -> DesiredState {
        self.desired
    }

    fn create(&self, _ctx: &ApplyContext) -> Result<Message> {
        bail!("{}", self.error)
    }

    fn remove(&self, _ctx: &ApplyContext) -> Result<Message> {
        bail!("{}", self.error)
    }
}

/// Prints each result as it completes
struct Printer<'a> {
    verbose: u8,
    executables: &'a [Option<PathBuf>],
    index: usize,
    description: String,
}

impl<'a> Printer<'a> {
    fn new(verbose: u8, executables: &'a [Option<PathBuf>]) -> Self {
        Self {
            verbose,
            executables,
            index: 0,
            description: String::new(),
        }
    }
}

impl ProgressCallback for Printer<'_> {
    fn on_plan_start(&mut self, count: usize) {
        ui::header(&format!("Reconciling {count} resource(s)"));
    }

    fn on_resource_start(&mut self, id: &str, description: &str) {
        log::debug!("Starting {id}");
        self.description = description.to_string();
    }

    fn on_resource_complete(&mut self, _id: &str, result: &Reconciled) {
        let executable = self.executables.get(self.index).cloned().flatten();
        self.index += 1;
        let report = Report::from_outcome(result.outcome.clone(), executable);
        ui::report(&self.description, &report, self.verbose);
    }

    fn on_plan_complete(&mut self) {}
}

#[derive(Serialize)]
struct ResultLine<'a> {
    id: &'a str,
    action: Action,
    #[serde(flatten)]
    report: Report,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    results: Vec<ResultLine<'a>>,
    summary: &'a ExecuteSummary,
}

fn to_json<'a>(report: &'a ExecuteReport, executables: &[Option<PathBuf>]) -> JsonReport<'a> {
    let results = report
        .results
        .iter()
        .enumerate()
        .map(|(i, (id, result))| ResultLine {
            id,
            action: result.action,
            report: Report::from_outcome(
                result.outcome.clone(),
                executables.get(i).cloned().flatten(),
            ),
        })
        .collect();
    JsonReport {
        results,
        summary: &report.summary,
    }
}
