//! Cadence Core - work item planning and allocation engine.
//!
//! This crate turns a backlog into an iteration plan:
//! - Decomposition of oversized items into implementable parts
//! - Dependency graph construction, cycle detection and critical path
//! - WSJF prioritization, optionally dependency-aware
//! - Capacity- and dependency-respecting iteration allocation
//! - Readiness validation of the resulting plan
//!
//! The engine is synchronous and keeps no state between runs. Callers hand
//! in a [`PlanningRequest`] snapshot and get a [`PlanningResult`] back; every
//! failure is reported as data inside the result.
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{
//!     DependencyEdge, IterationSpec, PlannerConfig, PlanningOrchestrator, PlanningRequest,
//!     WorkItem,
//! };
//!
//! let request = PlanningRequest {
//!     items: vec![
//!         WorkItem::story("A", 3),
//!         WorkItem::story("B", 4),
//!         WorkItem::story("C", 2),
//!     ],
//!     edges: vec![DependencyEdge::hard("A", "B")],
//!     iterations: IterationSpec::uniform(2, 5),
//!     ..PlanningRequest::default()
//! };
//!
//! let result = PlanningOrchestrator::new(PlannerConfig::default()).plan(&request);
//! assert!(result.is_ready());
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod planning;

pub use config::{ConfigError, CyclePolicy, InferenceConfig, PlannerConfig};
pub use error::{CadenceError, Result};
pub use models::{
    CapacityOverflow, DeferralReason, DeferredItem, DependencyEdge, DependencyKind,
    DependencyStrength, EdgeOrigin, IssueCode, Iteration, IterationPlan, IterationSpec,
    ReadinessIssue, ReadinessReport, ScoredItem, ValueFactors, WorkItem, WorkItemId, WorkItemKind,
};
pub use planning::{
    AllocationError, CriticalPath, CycleError, DecompositionError, DecompositionResult, Decomposer,
    DependencyGraph, DependencyGraphBuilder, EdgeInferencer, GraphError, InferencerChain,
    IterationAllocator, KeywordInferencer, PlanningOrchestrator, PlanningRequest, PlanningResult,
    PriorityError, Prioritizer, ReadinessValidator, SharedComponentInferencer,
};
