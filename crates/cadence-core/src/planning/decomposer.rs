//! Splitting of oversized work items.
//!
//! An item larger than the maximum item size is split into 2-4 children
//! (more only when needed to fit the limit) whose sizes sum to the parent's
//! size. Acceptance criteria are dealt out round-robin so that no criterion
//! is lost or duplicated.

use crate::models::{WorkItem, WorkItemId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

/// Preferred minimum number of children per split.
const MIN_CHILDREN: usize = 2;

/// Preferred maximum number of children per split.
const PREFERRED_MAX_CHILDREN: usize = 4;

/// Default hard ceiling on the number of children.
pub const DEFAULT_MAX_SPLIT_CHILDREN: usize = 6;

/// Errors that can occur while decomposing an item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecompositionError {
    /// Even the maximum number of children would exceed the size limit.
    #[error("item {id} of size {size} needs more than {max_children} parts of {max_item_size}")]
    SizeTooLargeForSplit {
        /// Item that could not be split.
        id: WorkItemId,
        /// Its size.
        size: u32,
        /// Size limit per child.
        max_item_size: u32,
        /// Child ceiling that was reached.
        max_children: usize,
    },

    /// The size limit must be positive.
    #[error("maximum item size must be positive")]
    InvalidMaxItemSize,
}

/// Result type for decomposition operations.
pub type Result<T> = std::result::Result<T, DecompositionError>;

/// Non-fatal finding about a split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum DecompositionWarning {
    /// Some children received no acceptance criteria and need manual review.
    EmptyAcceptanceCriteria {
        /// Children without criteria.
        child_ids: Vec<WorkItemId>,
    },
}

/// Which of the parent's criteria went to one child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaMapping {
    /// Child item.
    pub child_id: WorkItemId,

    /// Indices into the parent's `acceptance_criteria`, ascending.
    pub criteria_indices: Vec<usize>,
}

/// Outcome of decomposing one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompositionResult {
    /// Item that was decomposed.
    pub original_id: WorkItemId,

    /// Resulting items: the children, or the original item when unchanged.
    pub items: Vec<WorkItem>,

    /// Criteria traceability, one entry per child. Empty when unchanged.
    pub mapping: Vec<CriteriaMapping>,

    /// Findings needing manual review.
    pub warnings: Vec<DecompositionWarning>,
}

impl DecompositionResult {
    fn unchanged(item: &WorkItem) -> Self {
        Self {
            original_id: item.id.clone(),
            items: vec![item.clone()],
            mapping: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Whether the item was split.
    pub fn is_split(&self) -> bool {
        !self.mapping.is_empty()
    }

    /// Ids of the resulting items.
    pub fn item_ids(&self) -> Vec<WorkItemId> {
        self.items.iter().map(|i| i.id.clone()).collect()
    }
}

/// Splits oversized work items into implementable children.
#[derive(Debug, Clone)]
pub struct Decomposer {
    max_children: usize,
}

impl Decomposer {
    /// Create a decomposer with the default child ceiling.
    pub fn new() -> Self {
        Self {
            max_children: DEFAULT_MAX_SPLIT_CHILDREN,
        }
    }

    /// Set the hard ceiling on children per split (at least 2).
    #[must_use]
    pub fn with_max_children(mut self, max_children: usize) -> Self {
        self.max_children = max_children.max(MIN_CHILDREN);
        self
    }

    /// Decompose `item` so that every resulting item is at most `max_item_size`.
    ///
    /// Items already within the limit are returned unchanged.
    pub fn decompose(&self, item: &WorkItem, max_item_size: u32) -> Result<DecompositionResult> {
        self.decompose_avoiding(item, max_item_size, &HashSet::new())
    }

    /// Like [`Decomposer::decompose`], but child ids never take a value from
    /// `reserved`.
    ///
    /// Children are numbered `<parent>.<k>`; a suffix whose id is reserved is
    /// skipped, so a backlog holding both `P` and `P.1` yields `P.2`, `P.3`...
    pub fn decompose_avoiding(
        &self,
        item: &WorkItem,
        max_item_size: u32,
        reserved: &HashSet<WorkItemId>,
    ) -> Result<DecompositionResult> {
        if max_item_size == 0 {
            return Err(DecompositionError::InvalidMaxItemSize);
        }
        if item.size <= max_item_size {
            return Ok(DecompositionResult::unchanged(item));
        }

        let count = self.child_count(item, max_item_size)?;
        let sizes = split_sizes(item.size, count);
        let (criteria, mapping_indices) = deal_criteria(&item.acceptance_criteria, count);

        let mut children = Vec::with_capacity(count);
        let mut mapping = Vec::with_capacity(count);
        let mut suffix = 0;
        let parts = sizes.into_iter().zip(criteria).zip(mapping_indices);
        for (k, ((size, criteria), indices)) in parts.enumerate() {
            let child_id = loop {
                suffix += 1;
                let candidate = WorkItemId::new(format!("{}.{}", item.id, suffix));
                if !reserved.contains(&candidate) {
                    break candidate;
                }
                debug!(item = %item.id, taken = %candidate, "skipped reserved child id");
            };
            let title = format!("{} (part {}/{})", item.title, k + 1, count);
            mapping.push(CriteriaMapping {
                child_id: child_id.clone(),
                criteria_indices: indices,
            });
            children.push(item.split_child(child_id, title, size, criteria));
        }

        let empty: Vec<WorkItemId> = children
            .iter()
            .filter(|c| c.acceptance_criteria.is_empty())
            .map(|c| c.id.clone())
            .collect();
        let mut warnings = Vec::new();
        if !empty.is_empty() {
            warn!(
                item = %item.id,
                children = empty.len(),
                "split children without acceptance criteria"
            );
            warnings.push(DecompositionWarning::EmptyAcceptanceCriteria { child_ids: empty });
        }

        debug!(item = %item.id, size = item.size, children = count, "split work item");
        Ok(DecompositionResult {
            original_id: item.id.clone(),
            items: children,
            mapping,
            warnings,
        })
    }

    fn child_count(&self, item: &WorkItem, max_item_size: u32) -> Result<usize> {
        let needed = item.size.div_ceil(max_item_size) as usize;
        let mut count = needed.clamp(MIN_CHILDREN, PREFERRED_MAX_CHILDREN);
        while largest_part(item.size, count) > max_item_size {
            if count >= self.max_children {
                return Err(DecompositionError::SizeTooLargeForSplit {
                    id: item.id.clone(),
                    size: item.size,
                    max_item_size,
                    max_children: self.max_children,
                });
            }
            count += 1;
        }
        Ok(count)
    }
}

impl Default for Decomposer {
    fn default() -> Self {
        Self::new()
    }
}

fn largest_part(size: u32, count: usize) -> u32 {
    size.div_ceil(count as u32)
}

/// Near-even split; the remainder goes one point each to the first children.
fn split_sizes(size: u32, count: usize) -> Vec<u32> {
    let n = count as u32;
    let base = size / n;
    let remainder = size % n;
    (0..n).map(|k| base + u32::from(k < remainder)).collect()
}

/// Round-robin assignment of criteria to `count` children.
fn deal_criteria(criteria: &[String], count: usize) -> (Vec<Vec<String>>, Vec<Vec<usize>>) {
    let mut dealt = vec![Vec::new(); count];
    let mut indices = vec![Vec::new(); count];
    for (i, criterion) in criteria.iter().enumerate() {
        dealt[i % count].push(criterion.clone());
        indices[i % count].push(i);
    }
    (dealt, indices)
}
