//! Post-allocation readiness checks.
//!
//! Every check runs regardless of what the others found. Checks only read
//! the plan and graph, so a caller can validate a hand-edited plan too.

use crate::models::{IssueCode, IterationPlan, ReadinessIssue, ReadinessReport, WorkItemId};
use crate::planning::allocator::is_shippable;
use crate::planning::dag::{DependencyGraph, format_cycle};
use tracing::{info, warn};

/// Validates an [`IterationPlan`] against its dependency graph.
#[derive(Debug, Clone, Default)]
pub struct ReadinessValidator;

impl ReadinessValidator {
    /// Create a new validator.
    pub fn new() -> Self {
        Self
    }

    /// Run all checks and collect their findings.
    pub fn validate(
        &self,
        plan: &IterationPlan,
        graph: &DependencyGraph,
        max_item_size: u32,
    ) -> ReadinessReport {
        let mut report = ReadinessReport::new();
        check_known_items(plan, graph, &mut report);
        check_item_sizes(plan, graph, max_item_size, &mut report);
        check_acyclic(graph, &mut report);
        check_capacity(plan, &mut report);
        check_deliverable_value(plan, graph, &mut report);
        check_dependency_order(plan, graph, &mut report);

        if report.is_ready() {
            info!(advisories = report.advisories.len(), "plan is ready");
        } else {
            warn!(
                issues = report.issues.len(),
                advisories = report.advisories.len(),
                "plan is not ready"
            );
        }
        report
    }
}

fn check_known_items(plan: &IterationPlan, graph: &DependencyGraph, report: &mut ReadinessReport) {
    for iteration in &plan.iterations {
        for id in iteration.allocated_items.iter().filter(|id| !graph.contains(id)) {
            report.push_issue(ReadinessIssue::new(
                IssueCode::UnknownItem,
                format!("iteration {} contains unknown item {}", iteration.index, id),
                vec![id.clone()],
            ));
        }
    }
}

fn check_item_sizes(
    plan: &IterationPlan,
    graph: &DependencyGraph,
    max_item_size: u32,
    report: &mut ReadinessReport,
) {
    for iteration in &plan.iterations {
        for id in &iteration.allocated_items {
            if let Some(size) = graph.size_of(id).filter(|&size| size > max_item_size) {
                report.push_issue(ReadinessIssue::new(
                    IssueCode::OversizedItem,
                    format!("{id} has size {size}, above the limit of {max_item_size}"),
                    vec![id.clone()],
                ));
            }
        }
    }
}

fn check_acyclic(graph: &DependencyGraph, report: &mut ReadinessReport) {
    for cycle in graph.find_cycles() {
        report.push_issue(ReadinessIssue::new(
            IssueCode::CircularDependency,
            format!("circular dependency: {}", format_cycle(&cycle)),
            cycle,
        ));
    }
}

fn check_capacity(plan: &IterationPlan, report: &mut ReadinessReport) {
    for iteration in plan.iterations.iter().filter(|it| it.allocated_size > it.capacity) {
        report.push_issue(ReadinessIssue::new(
            IssueCode::CapacityExceeded,
            format!(
                "iteration {} holds {} points but its capacity is {}",
                iteration.index, iteration.allocated_size, iteration.capacity
            ),
            iteration.allocated_items.clone(),
        ));
    }
}

fn check_deliverable_value(
    plan: &IterationPlan,
    graph: &DependencyGraph,
    report: &mut ReadinessReport,
) {
    for iteration in plan.iterations.iter().filter(|it| !it.is_empty()) {
        let shippable = iteration
            .allocated_items
            .iter()
            .any(|id| is_shippable(plan, graph, id, iteration.index));
        if !shippable {
            report.push_issue(ReadinessIssue::new(
                IssueCode::NoDeliverableValue,
                format!("iteration {} has no item that can ship on its own", iteration.index),
                iteration.allocated_items.clone(),
            ));
        }
    }
}

fn check_dependency_order(
    plan: &IterationPlan,
    graph: &DependencyGraph,
    report: &mut ReadinessReport,
) {
    for edge in graph.edges() {
        let (Some(from), Some(to)) = (plan.iteration_of(&edge.from), plan.iteration_of(&edge.to))
        else {
            continue;
        };
        if from <= to {
            continue;
        }
        let related: Vec<WorkItemId> = vec![edge.from.clone(), edge.to.clone()];
        let message = format!(
            "{} (iteration {}) needs {} (iteration {})",
            edge.to, to, edge.from, from
        );
        if edge.is_hard() {
            report.push_issue(ReadinessIssue::new(
                IssueCode::DependencyOrderViolation,
                message,
                related,
            ));
        } else {
            report.push_advisory(ReadinessIssue::new(
                IssueCode::SoftDependencyOrder,
                message,
                related,
            ));
        }
    }
}
