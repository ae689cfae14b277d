//! Iteration and plan data structures.
//!
//! An [`IterationPlan`] is the allocator's output: an ordered list of
//! time-boxed iterations plus whatever could not be placed.

use super::work_item::WorkItemId;
use serde::{Deserialize, Serialize};

/// Team-supplied capacity for one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationSpec {
    /// 0-based position within the planning interval.
    pub index: usize,

    /// Capacity in points.
    pub capacity: u32,
}

impl IterationSpec {
    /// Create a new iteration spec.
    pub fn new(index: usize, capacity: u32) -> Self {
        Self { index, capacity }
    }

    /// Build `count` consecutive iterations with the same capacity.
    pub fn uniform(count: usize, capacity: u32) -> Vec<Self> {
        (0..count).map(|index| Self::new(index, capacity)).collect()
    }
}

/// One iteration of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iteration {
    /// 0-based position within the planning interval.
    pub index: usize,

    /// Capacity in points.
    pub capacity: u32,

    /// Items placed in this iteration, in placement order.
    pub allocated_items: Vec<WorkItemId>,

    /// Sum of the sizes of `allocated_items`.
    pub allocated_size: u32,
}

impl Iteration {
    /// Create an empty iteration from its spec.
    pub fn from_spec(spec: IterationSpec) -> Self {
        Self {
            index: spec.index,
            capacity: spec.capacity,
            allocated_items: Vec::new(),
            allocated_size: 0,
        }
    }

    /// Points still available.
    pub fn remaining_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.allocated_size)
    }

    /// Whether an item of `size` points still fits.
    pub fn fits(&self, size: u32) -> bool {
        self.remaining_capacity() >= size
    }

    /// Fraction of capacity in use (0.0 - 1.0, can exceed 1.0 for hand-built plans).
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            f64::from(self.allocated_size) / f64::from(self.capacity)
        }
    }

    /// Whether nothing was placed.
    pub fn is_empty(&self) -> bool {
        self.allocated_items.is_empty()
    }

    /// Whether `id` was placed here.
    pub fn contains(&self, id: &WorkItemId) -> bool {
        self.allocated_items.contains(id)
    }

    pub(crate) fn place(&mut self, id: WorkItemId, size: u32) {
        self.allocated_items.push(id);
        self.allocated_size += size;
    }
}

/// Why an item was left out of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum DeferralReason {
    /// No eligible iteration had enough remaining capacity.
    InsufficientCapacity,

    /// Some Hard predecessors were never placed.
    PredecessorsUnplaced {
        /// The unplaced predecessors, sorted by id.
        predecessors: Vec<WorkItemId>,
    },
}

/// An item the allocator could not place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredItem {
    /// Deferred item.
    pub id: WorkItemId,

    /// Its size in points.
    pub size: u32,

    /// Why it was deferred.
    pub reason: DeferralReason,
}

/// Total demand compared with total capacity when demand is larger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityOverflow {
    /// Points requested by all ranked items.
    pub required: u32,

    /// Points available across all iterations.
    pub available: u32,
}

/// Allocation of a backlog across one planning interval.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IterationPlan {
    /// Iterations in index order.
    pub iterations: Vec<Iteration>,

    /// Items that could not be placed, in priority order.
    #[serde(default)]
    pub deferred: Vec<DeferredItem>,

    /// Set when total demand exceeded total capacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_overflow: Option<CapacityOverflow>,

    /// Indices of non-empty iterations without a shippable item.
    #[serde(default)]
    pub no_deliverable_value: Vec<usize>,
}

impl IterationPlan {
    /// Create a plan from iterations, with nothing deferred.
    pub fn from_iterations(iterations: Vec<Iteration>) -> Self {
        Self {
            iterations,
            ..Self::default()
        }
    }

    /// Iteration index an item was placed in.
    pub fn iteration_of(&self, id: &WorkItemId) -> Option<usize> {
        self.iterations.iter().find(|it| it.contains(id)).map(|it| it.index)
    }

    /// Total number of placed items.
    pub fn allocated_count(&self) -> usize {
        self.iterations.iter().map(|it| it.allocated_items.len()).sum()
    }

    /// Sum of allocated points, saturating at `u32::MAX`.
    pub fn allocated_size(&self) -> u32 {
        saturating_total(self.iterations.iter().map(|it| it.allocated_size))
    }

    /// Sum of all iteration capacities, saturating at `u32::MAX`.
    pub fn total_capacity(&self) -> u32 {
        saturating_total(self.iterations.iter().map(|it| it.capacity))
    }

    /// Whether `id` was deferred.
    pub fn is_deferred(&self, id: &WorkItemId) -> bool {
        self.deferred.iter().any(|d| &d.id == id)
    }
}

/// Sum of point values that never wraps.
pub(crate) fn saturating_total(points: impl IntoIterator<Item = u32>) -> u32 {
    points.into_iter().fold(0, u32::saturating_add)
}
