use colored::Colorize;
use declarative::{ExecuteSummary, Message};
use pkgkit::{ErrorCategory, Report};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// One-line text for a message; structured payloads get a short summary
pub fn message_line(msg: &Message) -> String {
    match msg {
        Message::Text(text) => text.lines().last().unwrap_or_default().to_string(),
        Message::Structured(value) => {
            let actions = value
                .get("actions")
                .and_then(|a| a.get("LINK"))
                .and_then(|l| l.as_array())
                .map_or(0, Vec::len);
            if actions > 0 {
                format!("{actions} package(s) linked")
            } else {
                "done".to_string()
            }
        }
    }
}

/// Render one report in human form
pub fn report(label: &str, report: &Report, verbose: u8) {
    let line = message_line(&report.msg);

    if report.failed {
        error(&format!("{} {}", label.bold(), report.msg));
        let category = ErrorCategory::from_output(&report.msg.to_string());
        if category != ErrorCategory::Other {
            dim(&format!("{}: {}", category.description(), category.advice()));
        }
    } else if report.changed {
        success(&format!("{} {}", label.bold(), line));
    } else {
        println!("{} {} {}", "·".dimmed(), label, line.dimmed());
    }

    if verbose > 0 {
        if let Message::Structured(value) = &report.msg {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_default();
            for l in pretty.lines() {
                dim(l);
            }
        }
        if let Some(exe) = &report.executable {
            kv("executable", &exe.display().to_string());
        }
    }
}

/// Render the counts after a plan
pub fn summary(summary: &ExecuteSummary, check: bool) {
    println!();
    let verb = if check { "would change" } else { "changed" };
    let line = format!(
        "{} {verb} ({} created, {} upgraded, {} removed), {} unchanged, {} failed",
        summary.total_changes(),
        summary.created,
        summary.upgraded,
        summary.removed,
        summary.unchanged,
        summary.failed
    );
    if summary.is_success() {
        success(&line);
    } else {
        error(&line);
    }
}
