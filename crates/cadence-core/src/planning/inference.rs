//! Heuristic dependency inference.
//!
//! Inferencers propose candidate [`DependencyEdge`]s from work item content.
//! The graph builder merges their output with explicit edges, so the graph
//! algorithms never depend on a particular heuristic.

use crate::models::{
    DependencyEdge, DependencyKind, DependencyStrength, WorkItem, WorkItemId, WorkItemKind,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Capability that proposes dependency edges for a set of items.
pub trait EdgeInferencer: Send + Sync {
    /// Short name recorded in the origin of every inferred edge.
    fn name(&self) -> &str;

    /// Propose edges between `items`. Edges must only reference ids in `items`.
    fn infer(&self, items: &[WorkItem]) -> Vec<DependencyEdge>;
}

/// Matches "depends on X", "blocked by X", "requires X" (Hard) and
/// "after X", "follows X" (Soft) in titles and descriptions.
static DEPENDENCY_CUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(depends\s+on|blocked\s+by|requires|after|follows)\s+([A-Za-z0-9][A-Za-z0-9_.\-]*)",
    )
    .expect("valid dependency cue regex")
});

/// Text keyword inferencer.
///
/// A reference to an item that has been split resolves to all of its
/// children, so references written against the original backlog survive
/// decomposition.
#[derive(Debug, Clone, Default)]
pub struct KeywordInferencer;

impl KeywordInferencer {
    /// Name recorded on inferred edges.
    pub const NAME: &'static str = "keywords";

    /// Create a new keyword inferencer.
    pub fn new() -> Self {
        Self
    }

    fn strength_for(cue: &str) -> DependencyStrength {
        let cue = cue.to_ascii_lowercase();
        if cue.starts_with("after") || cue.starts_with("follows") {
            DependencyStrength::Soft
        } else {
            DependencyStrength::Hard
        }
    }
}

impl EdgeInferencer for KeywordInferencer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn infer(&self, items: &[WorkItem]) -> Vec<DependencyEdge> {
        let known: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
        let mut children: HashMap<&str, Vec<&WorkItemId>> = HashMap::new();
        let mut parent_of: HashMap<&WorkItemId, &WorkItemId> = HashMap::new();
        for item in items {
            if let Some(parent) = item.parent_id() {
                children.entry(parent.as_str()).or_default().push(&item.id);
                parent_of.insert(&item.id, parent);
            }
        }

        let mut edges = Vec::new();
        for item in items {
            let text = item.searchable_text();
            for caps in DEPENDENCY_CUE.captures_iter(&text) {
                let token = caps[2].trim_end_matches(['.', '-', '_']);
                let strength = Self::strength_for(&caps[1]);

                let targets: Vec<&WorkItemId> = if known.contains(token) {
                    items
                        .iter()
                        .filter(|i| i.id.as_str() == token)
                        .map(|i| &i.id)
                        .collect()
                } else {
                    children.get(token).cloned().unwrap_or_default()
                };

                for target in targets {
                    if target == &item.id {
                        continue;
                    }
                    // Siblings inherit the parent's text and would otherwise point at each other.
                    let target_parent = parent_of.get(target).copied();
                    if target_parent.is_some() && target_parent == item.parent_id() {
                        continue;
                    }
                    debug!(
                        from = %target,
                        to = %item.id,
                        cue = &caps[1],
                        "inferred dependency from text"
                    );
                    let mut edge = DependencyEdge::hard(target.clone(), item.id.clone())
                        .inferred_by(Self::NAME);
                    edge.strength = strength;
                    edges.push(edge);
                }
            }
        }
        edges
    }
}

/// Within a component, Enabler items precede every other item (Soft).
#[derive(Debug, Clone, Default)]
pub struct SharedComponentInferencer;

impl SharedComponentInferencer {
    /// Name recorded on inferred edges.
    pub const NAME: &'static str = "shared_components";

    /// Create a new shared-component inferencer.
    pub fn new() -> Self {
        Self
    }
}

impl EdgeInferencer for SharedComponentInferencer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn infer(&self, items: &[WorkItem]) -> Vec<DependencyEdge> {
        let mut by_component: BTreeMap<&str, Vec<&WorkItem>> = BTreeMap::new();
        for item in items {
            for component in &item.components {
                by_component.entry(component.as_str()).or_default().push(item);
            }
        }

        let mut edges = Vec::new();
        for members in by_component.values() {
            let (enablers, others): (Vec<&WorkItem>, Vec<&WorkItem>) =
                members.iter().copied().partition(|i| i.kind == WorkItemKind::Enabler);
            for enabler in &enablers {
                for other in &others {
                    edges.push(
                        DependencyEdge::soft(enabler.id.clone(), other.id.clone())
                            .with_kind(DependencyKind::Technical)
                            .inferred_by(Self::NAME),
                    );
                }
            }
        }
        edges
    }
}

/// Ordered list of inferencers; earlier inferencers take precedence when two
/// propose the same `(from, to)` pair.
#[derive(Default)]
pub struct InferencerChain {
    inferencers: Vec<Box<dyn EdgeInferencer>>,
}

impl InferencerChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain with the built-in inferencers enabled by the flags.
    pub fn builtin(keywords: bool, shared_components: bool) -> Self {
        let mut chain = Self::new();
        if keywords {
            chain.push(Box::new(KeywordInferencer::new()));
        }
        if shared_components {
            chain.push(Box::new(SharedComponentInferencer::new()));
        }
        chain
    }

    /// Append an inferencer at the lowest precedence.
    pub fn push(&mut self, inferencer: Box<dyn EdgeInferencer>) {
        self.inferencers.push(inferencer);
    }

    /// Number of registered inferencers.
    pub fn len(&self) -> usize {
        self.inferencers.len()
    }

    /// Whether no inferencer is registered.
    pub fn is_empty(&self) -> bool {
        self.inferencers.is_empty()
    }

    /// Names of registered inferencers, in precedence order.
    pub fn names(&self) -> Vec<&str> {
        self.inferencers.iter().map(|i| i.name()).collect()
    }

    /// Run every inferencer and merge results, first proposal per pair wins.
    pub fn infer(&self, items: &[WorkItem]) -> Vec<DependencyEdge> {
        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for inferencer in &self.inferencers {
            for edge in inferencer.infer(items) {
                if seen.insert((edge.from.clone(), edge.to.clone())) {
                    merged.push(edge);
                }
            }
        }
        merged
    }
}

impl std::fmt::Debug for InferencerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencerChain").field("inferencers", &self.names()).finish()
    }
}
