//! Dependency-respecting iteration allocation.
//!
//! Greedy bin packing in priority order: each item goes to the earliest
//! iteration that has room for it and is not earlier than the iteration of
//! any Hard predecessor. Items that fit nowhere are deferred, never forced.

use crate::models::iteration::saturating_total;
use crate::models::{
    CapacityOverflow, DeferralReason, DeferredItem, Iteration, IterationPlan, IterationSpec,
    ScoredItem, WorkItemId,
};
use crate::planning::dag::DependencyGraph;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during allocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// Iteration specs are malformed.
    #[error("invalid iteration {index}: {reason}")]
    InvalidIteration {
        /// Position of the offending spec.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// A ranked item is not in the dependency graph.
    #[error("ranked item {0} is not in the dependency graph")]
    UnknownItem(WorkItemId),

    /// Mandatory items alone need more than the whole interval offers.
    #[error("mandatory items need {required} points but the interval only has {available}")]
    CapacityExceededGlobally {
        /// Points needed by mandatory items.
        required: u32,
        /// Points available across all iterations.
        available: u32,
    },
}

/// Result type for allocation operations.
pub type Result<T> = std::result::Result<T, AllocationError>;

/// Assigns ranked items to iterations.
#[derive(Debug, Clone, Default)]
pub struct IterationAllocator;

impl IterationAllocator {
    /// Create a new allocator.
    pub fn new() -> Self {
        Self
    }

    /// Allocate `ordered` (best first) across `iterations`.
    ///
    /// Placement is repeated in passes over the items still unplaced until a
    /// pass places nothing, so an item ranked above one of its predecessors
    /// is still placed once that predecessor lands.
    ///
    /// # Errors
    /// See [`AllocationError`].
    pub fn allocate(
        &self,
        ordered: &[ScoredItem],
        graph: &DependencyGraph,
        iterations: &[IterationSpec],
    ) -> Result<IterationPlan> {
        validate_specs(iterations)?;

        let mut sizes: HashMap<&WorkItemId, u32> = HashMap::with_capacity(ordered.len());
        let mut required = 0u32;
        let mut mandatory = 0u32;
        for scored in ordered {
            let item = graph
                .item(&scored.item_id)
                .ok_or_else(|| AllocationError::UnknownItem(scored.item_id.clone()))?;
            sizes.insert(&item.id, item.size);
            required = required.saturating_add(item.size);
            if item.mandatory {
                mandatory = mandatory.saturating_add(item.size);
            }
        }

        let available = saturating_total(iterations.iter().map(|s| s.capacity));
        if mandatory > available {
            return Err(AllocationError::CapacityExceededGlobally {
                required: mandatory,
                available,
            });
        }
        let capacity_overflow = (required > available).then(|| {
            warn!(required, available, "total demand exceeds interval capacity");
            CapacityOverflow {
                required,
                available,
            }
        });

        let mut slots: Vec<Iteration> =
            iterations.iter().copied().map(Iteration::from_spec).collect();
        let mut placed: HashMap<&WorkItemId, usize> = HashMap::with_capacity(ordered.len());
        let mut pending: Vec<&WorkItemId> = placement_order(ordered);

        loop {
            let before = pending.len();
            pending.retain(|&id| {
                let size = sizes[id];
                let mut earliest = 0;
                for pred in graph.hard_predecessors(id) {
                    match placed.get(pred) {
                        Some(&index) => earliest = earliest.max(index),
                        None => return true,
                    }
                }
                match slots[earliest..].iter_mut().find(|slot| slot.fits(size)) {
                    Some(slot) => {
                        debug!(item = %id, iteration = slot.index, size, "placed item");
                        slot.place(id.clone(), size);
                        placed.insert(id, slot.index);
                        false
                    }
                    None => true,
                }
            });
            if pending.len() == before || pending.is_empty() {
                break;
            }
        }

        let deferred: Vec<DeferredItem> = pending
            .into_iter()
            .map(|id| {
                let unplaced: Vec<WorkItemId> = graph
                    .hard_predecessors(id)
                    .into_iter()
                    .filter(|p| !placed.contains_key(p))
                    .cloned()
                    .collect();
                let reason = if unplaced.is_empty() {
                    DeferralReason::InsufficientCapacity
                } else {
                    DeferralReason::PredecessorsUnplaced {
                        predecessors: unplaced,
                    }
                };
                debug!(item = %id, ?reason, "deferred item");
                DeferredItem {
                    id: id.clone(),
                    size: sizes[id],
                    reason,
                }
            })
            .collect();

        let mut plan = IterationPlan {
            iterations: slots,
            deferred,
            capacity_overflow,
            no_deliverable_value: Vec::new(),
        };
        plan.no_deliverable_value = iterations_without_deliverable_value(&plan, graph);

        info!(
            placed = plan.allocated_count(),
            deferred = plan.deferred.len(),
            allocated_size = plan.allocated_size(),
            capacity = available,
            "allocated iterations"
        );
        Ok(plan)
    }
}

fn validate_specs(iterations: &[IterationSpec]) -> Result<()> {
    if iterations.is_empty() {
        return Err(AllocationError::InvalidIteration {
            index: 0,
            reason: "planning interval has no iterations".into(),
        });
    }
    for (position, spec) in iterations.iter().enumerate() {
        if spec.index != position {
            return Err(AllocationError::InvalidIteration {
                index: spec.index,
                reason: format!("expected index {position}"),
            });
        }
        if spec.capacity == 0 {
            return Err(AllocationError::InvalidIteration {
                index: spec.index,
                reason: "capacity must be positive".into(),
            });
        }
    }
    Ok(())
}

/// Priority order with every run of equal priority sorted by id.
fn placement_order(ordered: &[ScoredItem]) -> Vec<&WorkItemId> {
    let mut order = Vec::with_capacity(ordered.len());
    let mut start = 0;
    while start < ordered.len() {
        let mut end = start + 1;
        while end < ordered.len() && ordered[end].same_priority(&ordered[start]) {
            end += 1;
        }
        let mut run: Vec<&WorkItemId> =
            ordered[start..end].iter().map(|s| &s.item_id).collect();
        run.sort();
        order.extend(run);
        start = end;
    }
    order
}

/// Whether `id` can ship on its own: every Hard predecessor sits in a
/// strictly earlier iteration of `plan`.
pub fn is_shippable(
    plan: &IterationPlan,
    graph: &DependencyGraph,
    id: &WorkItemId,
    iteration: usize,
) -> bool {
    graph
        .hard_predecessors(id)
        .into_iter()
        .all(|pred| plan.iteration_of(pred).is_some_and(|index| index < iteration))
}

/// Indices of non-empty iterations without a single shippable item.
pub fn iterations_without_deliverable_value(
    plan: &IterationPlan,
    graph: &DependencyGraph,
) -> Vec<usize> {
    plan.iterations
        .iter()
        .filter(|it| !it.is_empty())
        .filter(|it| {
            !it.allocated_items
                .iter()
                .any(|id| is_shippable(plan, graph, id, it.index))
        })
        .map(|it| it.index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DependencyEdge, ValueFactors, WorkItem};
    use crate::planning::dag::DependencyGraphBuilder;
    use crate::planning::prioritizer::Prioritizer;

    fn setup(items: &[WorkItem], edges: &[DependencyEdge]) -> (DependencyGraph, Vec<ScoredItem>) {
        let graph = DependencyGraphBuilder::new().build(items, edges).unwrap();
        let factors = items
            .iter()
            .map(|i| (i.id.clone(), ValueFactors::default()))
            .collect();
        let ranked = Prioritizer::new()
            .with_dependency_awareness(true)
            .rank(&graph, &factors)
            .unwrap();
        (graph, ranked)
    }

    fn ids(iteration: &Iteration) -> Vec<&str> {
        iteration.allocated_items.iter().map(WorkItemId::as_str).collect()
    }

    fn allocate(
        ranked: &[ScoredItem],
        graph: &DependencyGraph,
        specs: &[IterationSpec],
    ) -> Result<IterationPlan> {
        IterationAllocator::new().allocate(ranked, graph, specs)
    }

    #[test]
    fn test_allocate_example_backlog() {
        let items = vec![
            WorkItem::story("A", 3),
            WorkItem::story("B", 4),
            WorkItem::story("C", 2),
        ];
        let (graph, ranked) = setup(&items, &[DependencyEdge::hard("A", "B")]);

        let plan = allocate(&ranked, &graph, &IterationSpec::uniform(2, 5)).unwrap();
        assert_eq!(ids(&plan.iterations[0]), vec!["C", "A"]);
        assert_eq!(plan.iterations[0].allocated_size, 5);
        assert_eq!(ids(&plan.iterations[1]), vec!["B"]);
        assert!(plan.deferred.is_empty());
        assert!(plan.no_deliverable_value.is_empty());
        assert_eq!(plan.capacity_overflow, None);
    }

    #[test]
    fn test_dependent_waits_for_predecessor_iteration() {
        let items = vec![WorkItem::story("A", 4), WorkItem::story("B", 1)];
        let (graph, ranked) = setup(&items, &[DependencyEdge::hard("A", "B")]);

        let specs = vec![IterationSpec::new(0, 3), IterationSpec::new(1, 5)];
        let plan = allocate(&ranked, &graph, &specs).unwrap();
        // B would fit in iteration 0, but A only fits in iteration 1.
        assert_eq!(plan.iteration_of(&"A".into()), Some(1));
        assert_eq!(plan.iteration_of(&"B".into()), Some(1));
    }

    #[test]
    fn test_later_pass_places_dependent_ranked_first() {
        let items = vec![WorkItem::story("A", 5), WorkItem::story("B", 1)];
        let graph = DependencyGraphBuilder::new()
            .build(&items, &[DependencyEdge::hard("A", "B")])
            .unwrap();
        let factors = items
            .iter()
            .map(|i| (i.id.clone(), ValueFactors::default()))
            .collect();
        // Plain ranking puts B first.
        let ranked = Prioritizer::new().rank(&graph, &factors).unwrap();

        let plan = allocate(&ranked, &graph, &IterationSpec::uniform(2, 5)).unwrap();
        assert_eq!(plan.iteration_of(&"A".into()), Some(0));
        assert_eq!(plan.iteration_of(&"B".into()), Some(1));
    }

    #[test]
    fn test_deferral_reasons() {
        let items = vec![
            WorkItem::story("A", 5),
            WorkItem::story("B", 5),
            WorkItem::story("C", 1),
        ];
        let (graph, ranked) = setup(&items, &[DependencyEdge::hard("B", "C")]);

        let plan = allocate(&ranked, &graph, &IterationSpec::uniform(1, 5)).unwrap();
        assert_eq!(plan.allocated_count(), 1);
        assert_eq!(plan.iteration_of(&"A".into()), Some(0));
        assert_eq!(
            plan.deferred,
            vec![
                DeferredItem {
                    id: "B".into(),
                    size: 5,
                    reason: DeferralReason::InsufficientCapacity,
                },
                DeferredItem {
                    id: "C".into(),
                    size: 1,
                    reason: DeferralReason::PredecessorsUnplaced {
                        predecessors: vec!["B".into()],
                    },
                },
            ]
        );
        assert_eq!(
            plan.capacity_overflow,
            Some(CapacityOverflow {
                required: 11,
                available: 5,
            })
        );
    }

    #[test]
    fn test_mandatory_items_over_capacity_fail_the_run() {
        let items = vec![
            WorkItem::story("A", 4).mandatory(),
            WorkItem::story("B", 4).mandatory(),
        ];
        let (graph, ranked) = setup(&items, &[]);

        let err = allocate(&ranked, &graph, &IterationSpec::uniform(1, 5)).unwrap_err();
        assert_eq!(
            err,
            AllocationError::CapacityExceededGlobally {
                required: 8,
                available: 5,
            }
        );
    }

    #[test]
    fn test_capacity_total_saturates() {
        let items = vec![WorkItem::story("A", 3), WorkItem::story("B", 2)];
        let (graph, ranked) = setup(&items, &[]);
        let specs = vec![IterationSpec::new(0, u32::MAX), IterationSpec::new(1, 1)];

        let plan = allocate(&ranked, &graph, &specs).unwrap();
        assert_eq!(plan.allocated_count(), 2);
        assert_eq!(plan.capacity_overflow, None);
        assert_eq!(plan.total_capacity(), u32::MAX);
    }

    #[test]
    fn test_invalid_iteration_specs() {
        let items = vec![WorkItem::story("A", 1)];
        let (graph, ranked) = setup(&items, &[]);

        assert!(matches!(
            allocate(&ranked, &graph, &[]).unwrap_err(),
            AllocationError::InvalidIteration { .. }
        ));
        assert!(matches!(
            allocate(&ranked, &graph, &[IterationSpec::new(1, 5)]).unwrap_err(),
            AllocationError::InvalidIteration { index: 1, .. }
        ));
        assert!(matches!(
            allocate(&ranked, &graph, &[IterationSpec::new(0, 0)]).unwrap_err(),
            AllocationError::InvalidIteration { index: 0, .. }
        ));
    }

    #[test]
    fn test_unknown_ranked_item() {
        let items = vec![WorkItem::story("A", 1)];
        let (graph, _) = setup(&items, &[]);
        let stray = vec![ScoredItem::new("Q".into(), &ValueFactors::default(), 1.0)];
        assert_eq!(
            allocate(&stray, &graph, &IterationSpec::uniform(1, 5)).unwrap_err(),
            AllocationError::UnknownItem("Q".into())
        );
    }

    #[test]
    fn test_equal_priority_placed_by_id() {
        let items = vec![WorkItem::story("B", 3), WorkItem::story("A", 3)];
        let (graph, _) = setup(&items, &[]);
        let factors = ValueFactors::default();
        // Caller order lists B first, but the two are tied.
        let ranked = vec![
            ScoredItem::new("B".into(), &factors, 3.0),
            ScoredItem::new("A".into(), &factors, 3.0),
        ];

        let plan = allocate(&ranked, &graph, &IterationSpec::uniform(2, 3)).unwrap();
        assert_eq!(ids(&plan.iterations[0]), vec!["A"]);
        assert_eq!(ids(&plan.iterations[1]), vec!["B"]);
    }

    #[test]
    fn test_allocation_is_deterministic() {
        let items: Vec<WorkItem> = (0..20)
            .map(|i| WorkItem::story(format!("I-{:02}", i), (i % 5) + 1))
            .collect();
        let edges: Vec<DependencyEdge> = (1..20)
            .step_by(3)
            .map(|i| DependencyEdge::hard(format!("I-{:02}", i - 1), format!("I-{:02}", i)))
            .collect();
        let (graph, ranked) = setup(&items, &edges);
        let specs = IterationSpec::uniform(4, 10);

        let first = allocate(&ranked, &graph, &specs).unwrap();
        let second = allocate(&ranked, &graph, &specs).unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_deliverable_value_on_hand_built_plan() {
        let items = vec![WorkItem::story("A", 2), WorkItem::story("B", 2)];
        let graph = DependencyGraphBuilder::new()
            .build(&items, &[DependencyEdge::hard("A", "B")])
            .unwrap();

        let mut first = Iteration::from_spec(IterationSpec::new(0, 5));
        first.place("B".into(), 2);
        let mut second = Iteration::from_spec(IterationSpec::new(1, 5));
        second.place("A".into(), 2);
        let plan = IterationPlan::from_iterations(vec![first, second]);

        assert!(!is_shippable(&plan, &graph, &"B".into(), 0));
        assert!(is_shippable(&plan, &graph, &"A".into(), 1));
        assert_eq!(iterations_without_deliverable_value(&plan, &graph), vec![0]);
    }
}
