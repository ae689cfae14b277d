//! Readiness reporting types.
//!
//! Every failure the engine detects ends up here as data, so callers can
//! render a plan's problems without handling errors.

use super::work_item::WorkItemId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable code for a readiness finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// An allocated item is larger than the maximum item size.
    OversizedItem,
    /// Hard dependencies form a cycle.
    CircularDependency,
    /// An iteration's allocated size exceeds its capacity.
    CapacityExceeded,
    /// A non-empty iteration has no shippable item.
    NoDeliverableValue,
    /// An item is planned before one of its Hard predecessors.
    DependencyOrderViolation,
    /// An item is planned before one of its Soft predecessors.
    SoftDependencyOrder,
    /// A referenced item id is unknown.
    UnknownItem,
    /// Two work items share one id.
    DuplicateItem,
    /// An item has size 0.
    ZeroSizedItem,
    /// An item could not be split under the maximum size.
    SizeTooLargeForSplit,
    /// A split produced children without acceptance criteria.
    EmptyAcceptanceCriteria,
    /// An item depends on an item excluded from the run.
    BlockedByExcludedItem,
    /// No value factors were supplied; defaults were used.
    MissingValueFactors,
    /// Value factors were not positive finite numbers.
    InvalidValueFactors,
    /// Iteration specs were malformed.
    InvalidIteration,
    /// Demand exceeds the capacity of the whole interval.
    CapacityExceededGlobally,
    /// An item could not be placed in any iteration.
    ItemDeferred,
    /// A mandatory item could not be placed in any iteration.
    MandatoryItemDeferred,
    /// A cycle was broken by downgrading its edges to Soft.
    CycleDowngraded,
}

impl IssueCode {
    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OversizedItem => "oversized_item",
            Self::CircularDependency => "circular_dependency",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::NoDeliverableValue => "no_deliverable_value",
            Self::DependencyOrderViolation => "dependency_order_violation",
            Self::SoftDependencyOrder => "soft_dependency_order",
            Self::UnknownItem => "unknown_item",
            Self::DuplicateItem => "duplicate_item",
            Self::ZeroSizedItem => "zero_sized_item",
            Self::SizeTooLargeForSplit => "size_too_large_for_split",
            Self::EmptyAcceptanceCriteria => "empty_acceptance_criteria",
            Self::BlockedByExcludedItem => "blocked_by_excluded_item",
            Self::MissingValueFactors => "missing_value_factors",
            Self::InvalidValueFactors => "invalid_value_factors",
            Self::InvalidIteration => "invalid_iteration",
            Self::CapacityExceededGlobally => "capacity_exceeded_globally",
            Self::ItemDeferred => "item_deferred",
            Self::MandatoryItemDeferred => "mandatory_item_deferred",
            Self::CycleDowngraded => "cycle_downgraded",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single readiness finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessIssue {
    /// Finding code.
    pub code: IssueCode,

    /// Human-readable explanation.
    pub message: String,

    /// Items involved, in a meaningful order (cycle order, placement order...).
    #[serde(default)]
    pub related_ids: Vec<WorkItemId>,
}

impl ReadinessIssue {
    /// Create a new finding.
    pub fn new(code: IssueCode, message: impl Into<String>, related_ids: Vec<WorkItemId>) -> Self {
        Self {
            code,
            message: message.into(),
            related_ids,
        }
    }
}

impl fmt::Display for ReadinessIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Outcome of readiness validation.
///
/// `issues` decide readiness; `advisories` are surfaced but never block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadinessReport {
    /// Blocking findings.
    pub issues: Vec<ReadinessIssue>,

    /// Non-blocking findings.
    #[serde(default)]
    pub advisories: Vec<ReadinessIssue>,
}

impl ReadinessReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the plan is ready: no blocking issues.
    pub fn is_ready(&self) -> bool {
        self.issues.is_empty()
    }

    /// Record a blocking issue.
    pub fn push_issue(&mut self, issue: ReadinessIssue) {
        self.issues.push(issue);
    }

    /// Record an advisory finding.
    pub fn push_advisory(&mut self, advisory: ReadinessIssue) {
        self.advisories.push(advisory);
    }

    /// Append all findings of `other`.
    pub fn merge(&mut self, other: Self) {
        self.issues.extend(other.issues);
        self.advisories.extend(other.advisories);
    }

    /// Whether any issue or advisory has `code`.
    pub fn has_code(&self, code: IssueCode) -> bool {
        self.issues.iter().chain(&self.advisories).any(|i| i.code == code)
    }

    /// Blocking issues with `code`.
    pub fn issues_with(&self, code: IssueCode) -> impl Iterator<Item = &ReadinessIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }

    /// Advisories with `code`.
    pub fn advisories_with(&self, code: IssueCode) -> impl Iterator<Item = &ReadinessIssue> {
        self.advisories.iter().filter(move |i| i.code == code)
    }
}
