//! Planning stages.
//!
//! Leaf-first: [`decomposer`] splits oversized items, [`inference`] proposes
//! edges, [`dag`] builds and analyses the dependency graph, [`prioritizer`]
//! ranks items by WSJF, [`allocator`] packs them into iterations,
//! [`readiness`] checks the result and [`orchestrator`] runs them in order.

pub mod allocator;
pub mod dag;
pub mod decomposer;
pub mod inference;
pub mod orchestrator;
pub mod prioritizer;
pub mod readiness;

pub use allocator::{
    AllocationError, IterationAllocator, is_shippable, iterations_without_deliverable_value,
};
pub use dag::{
    CriticalPath, CycleError, DependencyGraph, DependencyGraphBuilder, GraphError, format_cycle,
};
pub use decomposer::{
    CriteriaMapping, DEFAULT_MAX_SPLIT_CHILDREN, DecompositionError, DecompositionResult,
    DecompositionWarning, Decomposer,
};
pub use inference::{
    EdgeInferencer, InferencerChain, KeywordInferencer, SharedComponentInferencer,
};
pub use orchestrator::{PlanningOrchestrator, PlanningRequest, PlanningResult};
pub use prioritizer::{PriorityError, Prioritizer, dependency_aware_order, priority_order};
pub use readiness::ReadinessValidator;
