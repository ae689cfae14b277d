//! Critical path command implementation.

use cadence_core::{PlannerConfig, PlanningOrchestrator, WorkItemId};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

use super::{exit_code, print_json, print_report};
use crate::backlog;

#[derive(Debug, Serialize)]
struct CriticalPathOutput<'a> {
    ids: &'a [WorkItemId],
    total_size: u32,
}

/// Execute the critical-path command.
///
/// The path is computed over the decomposed backlog, so split items show up
/// as their parts.
pub fn execute(path: &Path, config: PlannerConfig, json: bool) -> anyhow::Result<u8> {
    let request = backlog::load(path)?;
    let result = PlanningOrchestrator::new(config).plan(&request);
    // Only a broken graph makes the path meaningless; allocation findings do not.
    let ok = result.validation.issues.is_empty() || !result.critical_path.is_empty();

    if json {
        print_json(&CriticalPathOutput {
            ids: &result.critical_path,
            total_size: result.critical_path_size,
        })?;
        return Ok(exit_code(ok));
    }

    println!("{}", "cadence critical-path".bold().cyan());
    println!();
    if result.critical_path.is_empty() {
        println!("  {}", "No critical path".yellow());
        println!();
        print_report(&result.validation);
    } else {
        for (i, id) in result.critical_path.iter().enumerate() {
            println!("  {}. {}", i + 1, id.to_string().green());
        }
        println!();
        println!("  Total size: {} points", result.critical_path_size.to_string().bold());
    }
    Ok(exit_code(ok))
}
