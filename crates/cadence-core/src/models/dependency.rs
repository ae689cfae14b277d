//! Dependency edges between work items.

use super::work_item::WorkItemId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Nature of a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Code or infrastructure must exist first.
    #[default]
    Technical,

    /// Business sequencing (e.g., a launch must precede a promotion).
    Business,
}

/// Whether the allocator must honor a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStrength {
    /// Ordering constraint enforced during allocation.
    #[default]
    Hard,

    /// Advisory relationship, surfaced in reports only.
    Soft,
}

/// Where an edge came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum EdgeOrigin {
    /// Declared by the caller.
    #[default]
    Explicit,

    /// Produced by an edge inferencer.
    Inferred {
        /// Name of the inferencer that produced the edge.
        inferencer: String,
    },
}

/// `to` depends on `from`: `from` must complete first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Prerequisite item.
    pub from: WorkItemId,

    /// Dependent item.
    pub to: WorkItemId,

    /// Dependency kind.
    #[serde(default)]
    pub kind: DependencyKind,

    /// Dependency strength.
    #[serde(default)]
    pub strength: DependencyStrength,

    /// Edge provenance.
    #[serde(default)]
    pub origin: EdgeOrigin,
}

impl DependencyEdge {
    /// Create an explicit Hard technical edge.
    pub fn hard(from: impl Into<WorkItemId>, to: impl Into<WorkItemId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind: DependencyKind::Technical,
            strength: DependencyStrength::Hard,
            origin: EdgeOrigin::Explicit,
        }
    }

    /// Create an explicit Soft technical edge.
    pub fn soft(from: impl Into<WorkItemId>, to: impl Into<WorkItemId>) -> Self {
        Self {
            strength: DependencyStrength::Soft,
            ..Self::hard(from, to)
        }
    }

    /// Set the dependency kind.
    #[must_use]
    pub fn with_kind(mut self, kind: DependencyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark the edge as produced by the named inferencer.
    #[must_use]
    pub fn inferred_by(mut self, inferencer: impl Into<String>) -> Self {
        self.origin = EdgeOrigin::Inferred {
            inferencer: inferencer.into(),
        };
        self
    }

    /// Whether the allocator must enforce this edge.
    pub fn is_hard(&self) -> bool {
        self.strength == DependencyStrength::Hard
    }

    /// Copy of this edge with different endpoints.
    #[must_use]
    pub fn rewired(&self, from: WorkItemId, to: WorkItemId) -> Self {
        Self {
            from,
            to,
            ..self.clone()
        }
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = if self.is_hard() { "->" } else { "~>" };
        write!(f, "{} {} {}", self.from, arrow, self.to)
    }
}
