//! Decompose command implementation.
//!
//! Previews how oversized backlog items would be split without planning.

use cadence_core::{Decomposer, DecompositionResult, PlannerConfig};
use colored::Colorize;
use comfy_table::Table;
use serde::Serialize;
use std::path::Path;

use super::{exit_code, print_json};
use crate::backlog;

/// Outcome for one backlog item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
enum Outcome {
    Unchanged { id: String },
    Split { result: DecompositionResult },
    Failed { id: String, error: String },
}

/// Execute the decompose command.
pub fn execute(path: &Path, config: &PlannerConfig, json: bool) -> anyhow::Result<u8> {
    let request = backlog::load(path)?;
    let decomposer = Decomposer::new().with_max_children(config.max_split_children);

    let outcomes: Vec<Outcome> = request
        .items
        .iter()
        .map(|item| match decomposer.decompose(item, config.max_item_size) {
            Ok(result) if result.is_split() => Outcome::Split { result },
            Ok(_) => Outcome::Unchanged {
                id: item.id.to_string(),
            },
            Err(e) => Outcome::Failed {
                id: item.id.to_string(),
                error: e.to_string(),
            },
        })
        .collect();
    let ok = !outcomes.iter().any(|o| matches!(o, Outcome::Failed { .. }));

    if json {
        print_json(&outcomes)?;
    } else {
        display(&outcomes, config.max_item_size);
    }
    Ok(exit_code(ok))
}

fn display(outcomes: &[Outcome], max_item_size: u32) {
    println!("{}", "cadence decompose".bold().cyan());
    println!("  Max item size: {}", max_item_size.to_string().green());
    println!();

    let mut unchanged = 0;
    for outcome in outcomes {
        match outcome {
            Outcome::Unchanged { .. } => unchanged += 1,
            Outcome::Split { result } => {
                let parts = format!("-> {} parts", result.items.len());
                println!("  {} {}", result.original_id.to_string().bold(), parts.dimmed());
                let mut table = Table::new();
                table.set_header(vec!["Id", "Title", "Size", "Criteria"]);
                for child in &result.items {
                    table.add_row(vec![
                        child.id.to_string(),
                        child.title.clone(),
                        child.size.to_string(),
                        child.acceptance_criteria.len().to_string(),
                    ]);
                }
                println!("{table}");
                if !result.warnings.is_empty() {
                    println!("  {} some parts have no acceptance criteria", "!".yellow());
                }
                println!();
            }
            Outcome::Failed { id, error } => {
                println!("  {} {}: {}", "✗".red(), id.bold(), error);
                println!();
            }
        }
    }

    println!("  Unchanged items: {}", unchanged);
}
