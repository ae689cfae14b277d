//! Shared data types for a planning run.
//!
//! Plain data only: work items, dependency edges, iterations, scores and
//! readiness reports. Every planning stage depends on these.

pub mod dependency;
pub mod iteration;
pub mod report;
pub mod scoring;
pub mod work_item;

pub use dependency::{DependencyEdge, DependencyKind, DependencyStrength, EdgeOrigin};
pub use iteration::{
    CapacityOverflow, DeferralReason, DeferredItem, Iteration, IterationPlan, IterationSpec,
};
pub use report::{IssueCode, ReadinessIssue, ReadinessReport};
pub use scoring::{ScoredItem, ValueFactors};
pub use work_item::{WorkItem, WorkItemId, WorkItemKind};
