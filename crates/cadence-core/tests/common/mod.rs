//! Shared test utilities for Cadence Core integration tests.

#![allow(dead_code)]

use cadence_core::{
    DependencyEdge, IterationPlan, IterationSpec, PlannerConfig, PlanningRequest, ValueFactors,
    WorkItem, WorkItemId,
};
use std::collections::HashMap;

/// Stories from `(id, size)` pairs.
pub fn stories(specs: &[(&str, u32)]) -> Vec<WorkItem> {
    specs.iter().map(|(id, size)| WorkItem::story(*id, *size)).collect()
}

/// Hard edges from `(from, to)` pairs.
pub fn hard_edges(pairs: &[(&str, &str)]) -> Vec<DependencyEdge> {
    pairs.iter().map(|(from, to)| DependencyEdge::hard(*from, *to)).collect()
}

/// Ids from string slices.
pub fn ids(list: &[&str]) -> Vec<WorkItemId> {
    list.iter().map(|s| WorkItemId::from(*s)).collect()
}

/// Default value factors for every item.
pub fn default_factors(items: &[WorkItem]) -> HashMap<WorkItemId, ValueFactors> {
    items.iter().map(|i| (i.id.clone(), ValueFactors::default())).collect()
}

/// A fully scored request with uniform iterations.
pub fn request(
    items: Vec<WorkItem>,
    edges: Vec<DependencyEdge>,
    iterations: usize,
    capacity: u32,
) -> PlanningRequest {
    let value_factors = default_factors(&items);
    PlanningRequest {
        items,
        edges,
        value_factors,
        iterations: IterationSpec::uniform(iterations, capacity),
    }
}

/// Configuration with every inferencer switched off.
pub fn explicit_only_config() -> PlannerConfig {
    let mut config = PlannerConfig::default();
    config.inference.keywords = false;
    config.inference.shared_components = false;
    config
}

/// Ids per iteration, each sorted.
pub fn iteration_sets(plan: &IterationPlan) -> Vec<Vec<String>> {
    plan.iterations
        .iter()
        .map(|it| {
            let mut ids: Vec<String> =
                it.allocated_items.iter().map(ToString::to_string).collect();
            ids.sort();
            ids
        })
        .collect()
}

/// Panics unless `plan` satisfies the allocation invariants: capacity per
/// iteration, Hard order across iterations and deliverable value.
pub fn assert_allocation_invariants(plan: &IterationPlan, edges: &[DependencyEdge]) {
    for iteration in &plan.iterations {
        assert!(
            iteration.allocated_size <= iteration.capacity,
            "iteration {} over capacity: {} > {}",
            iteration.index,
            iteration.allocated_size,
            iteration.capacity
        );
    }
    for edge in edges.iter().filter(|e| e.is_hard()) {
        if let Some(to) = plan.iteration_of(&edge.to) {
            let from = plan
                .iteration_of(&edge.from)
                .expect("predecessor of a placed item must be placed");
            assert!(from <= to, "{} placed before its predecessor {}", edge.to, edge.from);
        }
    }
    assert!(
        plan.no_deliverable_value.is_empty(),
        "iterations without value: {:?}",
        plan.no_deliverable_value
    );
}
