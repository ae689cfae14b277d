//! Command implementations for the cadence CLI.

pub mod critical_path;
pub mod decompose;
pub mod plan;

use cadence_core::{ReadinessIssue, ReadinessReport};
use colored::Colorize;

/// The plan is ready.
pub const EXIT_READY: u8 = 0;

/// I/O, parse or configuration failure.
pub const EXIT_FAILURE: u8 = 1;

/// A report was produced but it carries blocking issues.
pub const EXIT_NOT_READY: u8 = 2;

/// Exit code for a produced report.
pub fn exit_code(ready: bool) -> u8 {
    if ready { EXIT_READY } else { EXIT_NOT_READY }
}

/// Print blocking issues and advisories.
pub fn print_report(report: &ReadinessReport) {
    if !report.issues.is_empty() {
        println!("{}", format!("Issues ({})", report.issues.len()).red().bold());
        for issue in &report.issues {
            println!("  {} {}", "✗".red(), describe(issue));
        }
        println!();
    }

    if !report.advisories.is_empty() {
        println!("{}", format!("Advisories ({})", report.advisories.len()).yellow().bold());
        for advisory in &report.advisories {
            println!("  {} {}", "!".yellow(), describe(advisory));
        }
        println!();
    }
}

fn describe(issue: &ReadinessIssue) -> String {
    format!("{} {}", format!("[{}]", issue.code).dimmed(), issue.message)
}

/// Write a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
