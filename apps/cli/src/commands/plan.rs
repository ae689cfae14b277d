//! Plan command implementation.
//!
//! Runs the whole planning pipeline over a backlog snapshot.

use cadence_core::{IterationPlan, PlannerConfig, PlanningOrchestrator, PlanningResult};
use colored::Colorize;
use comfy_table::{Cell, Color as ComfyColor, Table};
use std::path::Path;

use super::{exit_code, print_json, print_report};
use crate::backlog;

/// Execute the plan command.
pub fn execute(path: &Path, config: PlannerConfig, json: bool) -> anyhow::Result<u8> {
    let request = backlog::load(path)?;
    let result = PlanningOrchestrator::new(config).plan(&request);

    if json {
        print_json(&result)?;
    } else {
        display(&result);
    }
    Ok(exit_code(result.is_ready()))
}

fn display(result: &PlanningResult) {
    println!("{}", "cadence plan".bold().cyan());
    println!();

    if let Some(plan) = &result.plan {
        print_iterations(plan);
        if !plan.deferred.is_empty() {
            let deferred: Vec<String> = plan.deferred.iter().map(|d| d.id.to_string()).collect();
            println!("  Deferred: {}", deferred.join(", ").yellow());
            println!();
        }
    } else {
        println!("  {}", "No plan produced".red());
        println!();
    }

    if !result.critical_path.is_empty() {
        let path: Vec<String> = result.critical_path.iter().map(ToString::to_string).collect();
        println!(
            "  Critical path: {} ({} points)",
            path.join(" -> ").green(),
            result.critical_path_size
        );
        println!();
    }

    print_report(&result.validation);

    if result.is_ready() {
        println!("{}", "Plan is ready".green().bold());
    } else {
        println!("{}", "Plan is not ready".red().bold());
    }
}

fn print_iterations(plan: &IterationPlan) {
    let mut table = Table::new();
    table.set_header(vec!["Iteration", "Items", "Allocated", "Capacity", "Utilization"]);

    for iteration in &plan.iterations {
        let items: Vec<String> =
            iteration.allocated_items.iter().map(ToString::to_string).collect();
        let utilization = iteration.utilization() * 100.0;
        let color = if plan.no_deliverable_value.contains(&iteration.index) {
            ComfyColor::Red
        } else if utilization >= 90.0 {
            ComfyColor::Yellow
        } else {
            ComfyColor::Green
        };
        table.add_row(vec![
            Cell::new(iteration.index + 1),
            Cell::new(items.join(", ")),
            Cell::new(iteration.allocated_size),
            Cell::new(iteration.capacity),
            Cell::new(format!("{:.0}%", utilization)).fg(color),
        ]);
    }

    println!("{table}");
    println!();
}
