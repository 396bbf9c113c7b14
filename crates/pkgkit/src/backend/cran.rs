//! R packages from CRAN, driven through `Rscript -e`.
//!
//! Every expression is wrapped in a `tryCatch` that prints the condition
//! message to stderr and quits with status 1, so an R warning (the usual
//! way `install.packages` reports "package is not available") becomes a
//! non-zero exit like any other tool failure.

use super::Backend;
use crate::error::{Error, Result};
use crate::exec::Session;
use crate::types::{BackendKind, Installed, PresentOptions, ResourceDescriptor};

/// Repository value R uses when no mirror was chosen.
const UNSET_MIRROR: &str = "@CRAN@";

const LIST_EXPR: &str = r#"ip <- installed.packages(); cat(paste(ip[, "Package"], ip[, "Version"], sep = "\t"), sep = "\n")"#;
const DEFAULT_LIB_EXPR: &str = "cat(.libPaths()[1])";
const DEFAULT_REPO_EXPR: &str = r#"cat(getOption("repos")[1])"#;

/// Installs and removes R packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct CranBackend;

impl Backend for CranBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::CranPkg
    }

    fn label(&self) -> &'static str {
        "R package"
    }

    fn validate(&self, descriptor: &ResourceDescriptor) -> Result<()> {
        if descriptor.pinned_version().is_some() {
            return Err(Error::InvalidRequest(format!(
                "R package {} cannot be pinned: install.packages has no version argument",
                descriptor.name
            )));
        }
        if descriptor.scope_name().is_some() {
            return Err(Error::InvalidRequest(format!(
                "R package {} has no environment; use a library directory instead",
                descriptor.name
            )));
        }
        Ok(())
    }

    fn list(&self, session: &Session<'_>, _scope: Option<&str>) -> Result<Vec<Installed>> {
        let output = session.query(&r_args(LIST_EXPR))?;
        Ok(parse_installed(&output.stdout))
    }

    fn install_args(
        &self,
        session: &Session<'_>,
        descriptor: &ResourceDescriptor,
        options: &PresentOptions,
    ) -> Result<Vec<String>> {
        let lib = library(session, options)?;
        let repo = match descriptor.location_name() {
            Some(repo) => repo.to_string(),
            None => default_repository(session)?,
        };
        Ok(r_args(&format!(
            "install.packages({}, lib = {}, repos = {})",
            r_string(&descriptor.name),
            r_string(&lib),
            r_string(&repo)
        )))
    }

    fn remove_args(
        &self,
        session: &Session<'_>,
        descriptor: &ResourceDescriptor,
        options: &PresentOptions,
    ) -> Result<Vec<String>> {
        let lib = library(session, options)?;
        Ok(r_args(&format!(
            "remove.packages({}, lib = {})",
            r_string(&descriptor.name),
            r_string(&lib)
        )))
    }
}

fn library(session: &Session<'_>, options: &PresentOptions) -> Result<String> {
    match options.library.as_deref().filter(|l| !l.trim().is_empty()) {
        Some(lib) => Ok(lib.to_string()),
        None => default_library(session),
    }
}

/// First entry of `.libPaths()`.
fn default_library(session: &Session<'_>) -> Result<String> {
    let output = session.query(&r_args(DEFAULT_LIB_EXPR))?;
    let lib = output.stdout.trim();
    if lib.is_empty() {
        return Err(Error::MalformedOutput {
            what: ".libPaths()".to_string(),
            detail: "no library path reported".to_string(),
        });
    }
    log::debug!("Using default R library {lib}");
    Ok(lib.to_string())
}

/// First configured repository; R's placeholder means there is none.
fn default_repository(session: &Session<'_>) -> Result<String> {
    let output = session.query(&r_args(DEFAULT_REPO_EXPR))?;
    let repo = output.stdout.trim();
    if repo.is_empty() || repo == UNSET_MIRROR {
        return Err(Error::NoDefaultRepository);
    }
    log::debug!("Using default CRAN repository {repo}");
    Ok(repo.to_string())
}

/// `name<TAB>version` lines; anything else (profile chatter) is skipped.
pub(crate) fn parse_installed(stdout: &str) -> Vec<Installed> {
    stdout
        .lines()
        .filter_map(|line| {
            let parsed = line
                .trim()
                .split_once('\t')
                .map(|(name, version)| Installed::new(name.trim(), version.trim()));
            if parsed.is_none() && !line.trim().is_empty() {
                log::debug!("Ignoring unexpected R output line: {line}");
            }
            parsed
        })
        .collect()
}

/// `-e` plus the expression wrapped so warnings and errors exit 1.
pub(crate) fn r_args(expr: &str) -> Vec<String> {
    vec!["-e".to_string(), wrap(expr)]
}

fn wrap(expr: &str) -> String {
    format!(
        "tryCatch({{ {expr} }}, \
         warning = function(w) {{ cat(conditionMessage(w), \"\\n\", file = stderr()); quit(\"no\", 1, FALSE) }}, \
         error = function(e) {{ cat(conditionMessage(e), \"\\n\", file = stderr()); quit(\"no\", 1, FALSE) }})"
    )
}

/// Quote a value as an R string literal.
pub(crate) fn r_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
