//! Integration tests for iteration allocation and readiness.

mod common;

use cadence_core::{
    DependencyEdge, DependencyGraph, DependencyGraphBuilder, IssueCode, Iteration,
    IterationAllocator, IterationSpec, Prioritizer, ReadinessValidator, ScoredItem, WorkItem,
};
use common::{
    assert_allocation_invariants, default_factors, hard_edges, iteration_sets, stories,
};
use pretty_assertions::assert_eq;

/// Deterministic pseudo-random backlog: sizes 1-5 and forward-only edges.
fn synthetic_backlog(count: usize, seed: u64) -> (Vec<WorkItem>, Vec<DependencyEdge>) {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        state >> 33
    };
    let items: Vec<WorkItem> = (0..count)
        .map(|i| WorkItem::story(format!("W{:03}", i), (next() % 5) as u32 + 1))
        .collect();
    let mut edges = Vec::new();
    for i in 1..count {
        if next() % 3 == 0 {
            let from = (next() as usize) % i;
            edges.push(DependencyEdge::hard(format!("W{:03}", from), format!("W{:03}", i)));
        }
    }
    (items, edges)
}

fn rank(graph: &DependencyGraph, items: &[WorkItem], aware: bool) -> Vec<ScoredItem> {
    Prioritizer::new()
        .with_dependency_awareness(aware)
        .rank(graph, &default_factors(items))
        .unwrap()
}

fn stored(iteration: usize, id: &str) -> Iteration {
    Iteration {
        index: iteration,
        capacity: 5,
        allocated_items: vec![id.into()],
        allocated_size: 2,
    }
}

#[test]
fn test_example_backlog_plan() {
    let items = stories(&[("A", 3), ("B", 4), ("C", 2)]);
    let edges = hard_edges(&[("A", "B")]);
    let graph = DependencyGraphBuilder::new().build(&items, &edges).unwrap();
    let ranking = rank(&graph, &items, true);

    let plan = IterationAllocator::new()
        .allocate(&ranking, &graph, &IterationSpec::uniform(2, 5))
        .unwrap();
    assert_eq!(
        iteration_sets(&plan),
        vec![vec!["A".to_string(), "C".to_string()], vec!["B".to_string()]]
    );
    assert_eq!(plan.iterations[0].allocated_size, 5);
    assert_eq!(plan.iterations[1].allocated_size, 4);

    let report = ReadinessValidator::new().validate(&plan, &graph, 5);
    assert!(report.is_ready());
}

#[test]
fn test_invariants_hold_on_synthetic_backlogs() {
    for seed in 1..=12 {
        let (items, edges) = synthetic_backlog(60, seed);
        let graph = DependencyGraphBuilder::new().build(&items, &edges).unwrap();
        let ranking = rank(&graph, &items, seed % 2 == 0);
        let plan = IterationAllocator::new()
            .allocate(&ranking, &graph, &IterationSpec::uniform(6, 20))
            .unwrap();

        assert_allocation_invariants(&plan, &edges);
        assert_eq!(plan.allocated_count() + plan.deferred.len(), items.len());

        let report = ReadinessValidator::new().validate(&plan, &graph, 5);
        assert!(report.is_ready(), "seed {} produced issues: {:?}", seed, report.issues);
    }
}

#[test]
fn test_allocation_output_is_reproducible() {
    let (items, edges) = synthetic_backlog(80, 42);
    let graph = DependencyGraphBuilder::new().build(&items, &edges).unwrap();
    let ranking = rank(&graph, &items, true);
    let specs = IterationSpec::uniform(5, 18);

    let allocate = || {
        let plan = IterationAllocator::new()
            .allocate(&ranking, &graph, &specs)
            .unwrap();
        serde_json::to_string(&plan).unwrap()
    };
    assert_eq!(allocate(), allocate());
}

#[test]
fn test_hand_built_violations_are_reported() {
    let items = stories(&[("A", 2), ("B", 2)]);
    let graph = DependencyGraphBuilder::new()
        .build(&items, &hard_edges(&[("A", "B")]))
        .unwrap();
    let ranking = rank(&graph, &items, false);
    let mut plan = IterationAllocator::new()
        .allocate(&ranking, &graph, &IterationSpec::uniform(2, 5))
        .unwrap();
    assert_eq!(
        iteration_sets(&plan),
        vec![vec!["A".to_string(), "B".to_string()], vec![]]
    );

    // Hand-edit the plan so that B lands ahead of A.
    plan.iterations[0] = stored(0, "B");
    plan.iterations[1] = stored(1, "A");

    let report = ReadinessValidator::new().validate(&plan, &graph, 5);
    assert!(!report.is_ready());
    assert!(report.has_code(IssueCode::DependencyOrderViolation));
    assert!(report.has_code(IssueCode::NoDeliverableValue));
}
