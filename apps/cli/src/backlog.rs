//! Backlog snapshot loading.

use anyhow::Context;
use cadence_core::PlanningRequest;
use std::fs;
use std::path::Path;

/// Read a planning request from a JSON backlog file.
pub fn load(path: &Path) -> anyhow::Result<PlanningRequest> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read backlog file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse backlog file: {}", path.display()))
}
