//! WSJF scoring and ranking.
//!
//! `wsjf = (business_value + time_criticality + rr_oe) / job_size`, sorted
//! descending, ties broken by smaller job size and then by id.

use crate::models::{ScoredItem, ValueFactors, WorkItem, WorkItemId};
use crate::planning::dag::DependencyGraph;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while scoring items.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriorityError {
    /// A factor is zero, negative or not finite.
    #[error("invalid value factor {factor} for item {id}: must be a positive finite number")]
    InvalidValueFactors {
        /// Offending item.
        id: WorkItemId,
        /// Offending factor name.
        factor: &'static str,
    },

    /// The item's job size would be 0.
    #[error("item {0} has job size 0")]
    ZeroJobSize(WorkItemId),

    /// No factors were supplied for the item.
    #[error("no value factors supplied for item {0}")]
    MissingValueFactors(WorkItemId),
}

/// Result type for prioritization operations.
pub type Result<T> = std::result::Result<T, PriorityError>;

/// Total WSJF order: higher score first, then smaller job size, then id.
pub fn priority_order(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    b.wsjf
        .total_cmp(&a.wsjf)
        .then_with(|| a.job_size.total_cmp(&b.job_size))
        .then_with(|| a.item_id.cmp(&b.item_id))
}

/// Computes WSJF scores and a total order over items.
#[derive(Debug, Clone, Default)]
pub struct Prioritizer {
    dependency_aware: bool,
}

impl Prioritizer {
    /// Plain WSJF ranking.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the dependency-aware re-sort in [`Prioritizer::rank`].
    #[must_use]
    pub fn with_dependency_awareness(mut self, enabled: bool) -> Self {
        self.dependency_aware = enabled;
        self
    }

    /// Whether [`Prioritizer::rank`] applies the dependency-aware re-sort.
    pub fn is_dependency_aware(&self) -> bool {
        self.dependency_aware
    }

    /// Scores every item and sorts by [`priority_order`].
    ///
    /// # Errors
    /// Fails on the first item, in input order, with missing or invalid
    /// factors or a zero job size.
    pub fn score(
        &self,
        items: &[WorkItem],
        factors: &HashMap<WorkItemId, ValueFactors>,
    ) -> Result<Vec<ScoredItem>> {
        let mut scored = Vec::with_capacity(items.len());
        for item in items {
            let item_factors = factors
                .get(&item.id)
                .ok_or_else(|| PriorityError::MissingValueFactors(item.id.clone()))?;
            if let Some(factor) = item_factors.first_invalid() {
                return Err(PriorityError::InvalidValueFactors {
                    id: item.id.clone(),
                    factor,
                });
            }
            let job_size = item_factors.job_size.unwrap_or_else(|| f64::from(item.size));
            if job_size <= 0.0 {
                return Err(PriorityError::ZeroJobSize(item.id.clone()));
            }
            scored.push(ScoredItem::new(item.id.clone(), item_factors, job_size));
        }
        scored.sort_by(priority_order);
        Ok(scored)
    }

    /// Scores the graph's items and, in dependency-aware mode, re-sorts them.
    pub fn rank(
        &self,
        graph: &DependencyGraph,
        factors: &HashMap<WorkItemId, ValueFactors>,
    ) -> Result<Vec<ScoredItem>> {
        let items: Vec<WorkItem> = graph.items().cloned().collect();
        let scored = self.score(&items, factors)?;
        if self.dependency_aware {
            Ok(dependency_aware_order(scored, graph))
        } else {
            Ok(scored)
        }
    }
}

/// Stable topological re-sort of a WSJF ranking.
///
/// Kahn's algorithm over the Hard edges among the ranked items, always taking
/// the ready item with the best original rank. When the ranking already
/// respects every dependency the output equals the input.
pub fn dependency_aware_order(
    ranked: Vec<ScoredItem>,
    graph: &DependencyGraph,
) -> Vec<ScoredItem> {
    let rank_of: HashMap<&WorkItemId, usize> = ranked
        .iter()
        .enumerate()
        .map(|(i, s)| (&s.item_id, i))
        .collect();

    let mut pending = vec![0usize; ranked.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); ranked.len()];
    for (rank, scored) in ranked.iter().enumerate() {
        for pred in graph.hard_predecessors(&scored.item_id) {
            if let Some(&pred_rank) = rank_of.get(pred) {
                pending[rank] += 1;
                dependents[pred_rank].push(rank);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..ranked.len())
        .filter(|&r| pending[r] == 0)
        .map(Reverse)
        .collect();
    let mut order = Vec::with_capacity(ranked.len());
    while let Some(Reverse(rank)) = ready.pop() {
        order.push(rank);
        for &dependent in &dependents[rank] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    let moved = order
        .iter()
        .enumerate()
        .filter(|(pos, rank)| pos != *rank)
        .count();
    if moved > 0 {
        debug!(moved, "demoted items below their dependencies");
    }

    let mut slots: Vec<Option<ScoredItem>> = ranked.into_iter().map(Some).collect();
    order.into_iter().filter_map(|rank| slots[rank].take()).collect()
}
