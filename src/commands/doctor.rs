use anyhow::Result;
use colored::Colorize;
use pkgkit::Tool;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::Context;
use crate::config;
use crate::ui;

/// Where (or whether) a tool was found
#[derive(Debug, Serialize)]
pub struct ToolStatus {
    pub tool: Tool,
    pub found: bool,
    pub path: Option<PathBuf>,
    pub candidates: Vec<String>,
}

/// Resolve every tool the way a real run would.
pub fn collect(ctx: &Context) -> Vec<ToolStatus> {
    Tool::ALL
        .iter()
        .map(|&tool| {
            let hint = ctx.config.executable_hint(tool);
            let candidates = ctx.client.resolver(tool).candidates(hint.as_deref());
            match ctx.client.resolve(tool, hint.as_deref()) {
                Ok(handle) => ToolStatus {
                    tool,
                    found: true,
                    path: Some(handle.path),
                    candidates,
                },
                Err(e) => {
                    log::debug!("{e}");
                    ToolStatus {
                        tool,
                        found: false,
                        path: None,
                        candidates,
                    }
                }
            }
        })
        .collect()
}

pub fn run(ctx: &Context) -> Result<ExitCode> {
    let statuses = collect(ctx);
    let missing = statuses.iter().any(|s| !s.found);

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(super::exit_code(missing));
    }

    ui::header("Tools");
    for status in &statuses {
        match &status.path {
            Some(path) => println!("  {} {} {}", "✓".green(), status.tool, path.display()),
            None => {
                println!("  {} {} {}", "✗".red(), status.tool, "(not found)".red());
                for candidate in &status.candidates {
                    ui::dim(candidate);
                }
            }
        }
    }

    ui::header("Settings");
    let config_file = config::config_dir()?.join("config.toml");
    let config_note = if config_file.exists() { "" } else { " (not present)" };
    ui::kv("config", &format!("{}{config_note}", config_file.display()));
    ui::kv(
        "timeout",
        &format!("{}s", ctx.client.context().options().timeout.as_secs()),
    );
    ui::kv("version policy", &ctx.client.version_policy().to_string());

    println!();
    if missing {
        ui::warn("Some tools could not be found; resources using them will fail");
    } else {
        ui::success("All tools found");
    }

    Ok(super::exit_code(missing))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::commands::testing::fixture;

    #[test]
    fn test_collect_reports_each_tool() {
        let mut f = fixture(&["conda"]);
        let hint = f.tmp.path().join("no-R/Rscript").to_string_lossy().into_owned();
        f.ctx.config.rscript.executable = Some(hint.clone());
        let statuses = collect(&f.ctx);

        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].tool, Tool::Conda);
        assert!(statuses[0].found);
        assert_eq!(statuses[0].path, Some(f.bin.join("conda")));

        assert_eq!(statuses[1].tool, Tool::Rscript);
        assert!(!statuses[1].found);
        assert_eq!(statuses[1].path, None);
        assert_eq!(statuses[1].candidates, vec![hint]);
    }

    #[test]
    fn test_candidates_include_configured_extras() {
        let f = fixture(&["Rscript"]);
        let ctx = crate::Context {
            client: f
                .ctx
                .client
                .clone()
                .with_extra_candidates(Tool::Rscript, vec!["/opt/R/bin/Rscript".into()]),
            ..f.ctx
        };

        let statuses = collect(&ctx);
        assert!(statuses[1].found);
        assert_eq!(
            statuses[1].candidates,
            vec!["Rscript", "/usr/bin/Rscript", "/opt/R/bin/Rscript"]
        );
    }

    #[test]
    fn test_status_serializes_tool_name() {
        let f = fixture(&["conda", "Rscript"]);
        let value = serde_json::to_value(collect(&f.ctx)).unwrap();
        assert_eq!(value[0]["tool"], "conda");
        assert_eq!(value[1]["tool"], "rscript");
        assert_eq!(value[1]["found"], true);
    }
}
