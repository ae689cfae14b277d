//! Dependency graph construction and analysis.
//!
//! Provides DAG (Directed Acyclic Graph) functionality for work item
//! dependencies: merging explicit and inferred edges, cycle detection,
//! deterministic topological ordering and critical path computation.
//!
//! Only Hard edges constrain ordering. Soft edges are stored so they can be
//! reported, but cycle detection, topological order and the critical path
//! ignore them.

use crate::models::{DependencyEdge, WorkItem, WorkItemId};
use crate::planning::inference::{EdgeInferencer, InferencerChain};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Hard-edge cycles found in a dependency set.
///
/// Not every elementary cycle is listed: see [`DependencyGraph::find_cycles`].
///
/// Each cycle is listed in dependency order starting from its smallest id:
/// `[A, B, C]` means `A -> B -> C -> A`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub struct CycleError {
    /// Distinct cycles in discovery order.
    pub cycles: Vec<Vec<WorkItemId>>,
}

impl CycleError {
    /// Hard edges `(from, to)` that lie on any reported cycle.
    pub fn cycle_edges(&self) -> HashSet<(WorkItemId, WorkItemId)> {
        let mut edges = HashSet::new();
        for cycle in &self.cycles {
            for (i, from) in cycle.iter().enumerate() {
                let to = &cycle[(i + 1) % cycle.len()];
                edges.insert((from.clone(), to.clone()));
            }
        }
        edges
    }
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.cycles.iter().map(|c| format_cycle(c)).collect();
        write!(f, "{}", rendered.join("; "))
    }
}

/// Render a cycle as `A -> B -> C -> A`.
pub fn format_cycle(cycle: &[WorkItemId]) -> String {
    let mut parts: Vec<&str> = cycle.iter().map(WorkItemId::as_str).collect();
    if let Some(first) = cycle.first() {
        parts.push(first.as_str());
    }
    parts.join(" -> ")
}

/// Errors that can occur while building a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Hard dependencies form at least one cycle.
    #[error("circular dependency detected: {0}")]
    Cycle(#[from] CycleError),

    /// An explicit edge references an item that is not in the backlog.
    #[error("dependency references unknown item {id} (edge {edge})")]
    UnknownItem {
        /// Missing item.
        id: WorkItemId,
        /// Offending edge, rendered.
        edge: String,
    },

    /// Two work items share an id.
    #[error("duplicate work item id: {0}")]
    DuplicateItem(WorkItemId),
}

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Longest dependency chain by cumulative size.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CriticalPath {
    /// Chain in dependency order.
    pub ids: Vec<WorkItemId>,

    /// Sum of the sizes along the chain.
    pub total_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

struct Frame {
    node: NodeIndex,
    successors: Vec<NodeIndex>,
    next: usize,
}

/// Dependency graph for one planning run.
///
/// Nodes are inserted in id order, so node index order equals id order and
/// every traversal below is deterministic.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// The underlying graph structure.
    graph: DiGraph<WorkItem, DependencyEdge>,

    /// Mapping from item ID to node index.
    node_map: HashMap<WorkItemId, NodeIndex>,
}

impl DependencyGraph {
    /// Gets the number of nodes (items) in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Gets the number of edges (Hard and Soft) in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Gets the number of Hard edges.
    pub fn hard_edge_count(&self) -> usize {
        self.graph.edge_weights().filter(|e| e.is_hard()).count()
    }

    /// Whether `id` is a node.
    pub fn contains(&self, id: &WorkItemId) -> bool {
        self.node_map.contains_key(id)
    }

    /// Looks up an item.
    pub fn item(&self, id: &WorkItemId) -> Option<&WorkItem> {
        self.node_map.get(id).map(|&idx| &self.graph[idx])
    }

    /// Size of an item.
    pub fn size_of(&self, id: &WorkItemId) -> Option<u32> {
        self.item(id).map(|i| i.size)
    }

    /// All items in id order.
    pub fn items(&self) -> impl Iterator<Item = &WorkItem> {
        self.graph.node_weights()
    }

    /// All edges in insertion order (explicit first, then inferred).
    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.graph.edge_weights()
    }

    /// Soft edges only.
    pub fn soft_edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edges().filter(|e| !e.is_hard())
    }

    /// Items that must complete before `id`, in id order.
    pub fn hard_predecessors(&self, id: &WorkItemId) -> Vec<&WorkItemId> {
        self.node_map
            .get(id)
            .map(|&idx| self.hard_neighbors(idx, Direction::Incoming))
            .unwrap_or_default()
            .into_iter()
            .map(|n| &self.graph[n].id)
            .collect()
    }

    /// Items that wait for `id`, in id order.
    pub fn hard_successors(&self, id: &WorkItemId) -> Vec<&WorkItemId> {
        self.node_map
            .get(id)
            .map(|&idx| self.hard_neighbors(idx, Direction::Outgoing))
            .unwrap_or_default()
            .into_iter()
            .map(|n| &self.graph[n].id)
            .collect()
    }

    /// Every item reachable from `id` through Hard edges, excluding `id`.
    pub fn hard_descendants(&self, id: &WorkItemId) -> Vec<&WorkItemId> {
        let Some(&start) = self.node_map.get(id) else {
            return Vec::new();
        };
        let mut seen = HashSet::from([start]);
        let mut queue = vec![start];
        let mut found = Vec::new();
        while let Some(node) = queue.pop() {
            for next in self.hard_neighbors(node, Direction::Outgoing) {
                if seen.insert(next) {
                    found.push(next);
                    queue.push(next);
                }
            }
        }
        found.sort();
        found.into_iter().map(|n| &self.graph[n].id).collect()
    }

    fn hard_neighbors(&self, node: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self
            .graph
            .edges_directed(node, direction)
            .filter(|e| e.weight().is_hard())
            .map(|e| {
                if direction == Direction::Outgoing {
                    e.target()
                } else {
                    e.source()
                }
            })
            .collect();
        neighbors.sort();
        neighbors.dedup();
        neighbors
    }

    /// Reports the Hard-edge cycles closed by depth-first back edges.
    ///
    /// Iterative depth-first traversal with white/gray/black colouring; every
    /// edge into a gray node closes a cycle made of the gray path from that
    /// node to the current one. Each cyclic strongly connected region yields
    /// at least one cycle, but elementary cycles that only share nodes with an
    /// already finished branch are not listed. An empty result means the Hard
    /// edges form a DAG.
    pub fn find_cycles(&self) -> Vec<Vec<WorkItemId>> {
        let mut color = vec![Color::White; self.graph.node_count()];
        let mut depth: Vec<Option<usize>> = vec![None; self.graph.node_count()];
        let mut seen = HashSet::new();
        let mut cycles = Vec::new();

        for root in self.graph.node_indices() {
            if color[root.index()] != Color::White {
                continue;
            }
            color[root.index()] = Color::Gray;
            depth[root.index()] = Some(0);
            let mut stack = vec![Frame {
                node: root,
                successors: self.hard_neighbors(root, Direction::Outgoing),
                next: 0,
            }];

            loop {
                let Some(top) = stack.last_mut() else {
                    break;
                };
                let next = top.successors.get(top.next).copied();
                top.next += 1;

                let Some(next) = next else {
                    if let Some(done) = stack.pop() {
                        color[done.node.index()] = Color::Black;
                        depth[done.node.index()] = None;
                    }
                    continue;
                };

                match color[next.index()] {
                    Color::White => {
                        color[next.index()] = Color::Gray;
                        depth[next.index()] = Some(stack.len());
                        stack.push(Frame {
                            node: next,
                            successors: self.hard_neighbors(next, Direction::Outgoing),
                            next: 0,
                        });
                    }
                    Color::Gray => {
                        let start = depth[next.index()].unwrap_or(0);
                        let mut cycle: Vec<NodeIndex> =
                            stack[start..].iter().map(|f| f.node).collect();
                        let smallest = cycle
                            .iter()
                            .enumerate()
                            .min_by_key(|(_, n)| **n)
                            .map(|(p, _)| p);
                        if let Some(min_pos) = smallest {
                            cycle.rotate_left(min_pos);
                        }
                        if seen.insert(cycle.clone()) {
                            let ids: Vec<WorkItemId> =
                                cycle.iter().map(|&n| self.graph[n].id.clone()).collect();
                            debug!(cycle = %format_cycle(&ids), "found dependency cycle");
                            cycles.push(ids);
                        }
                    }
                    Color::Black => {}
                }
            }
        }

        cycles
    }

    /// Whether the Hard edges form a DAG.
    pub fn is_acyclic(&self) -> bool {
        self.find_cycles().is_empty()
    }

    /// Hard-edge topological order; among ready items the smallest id comes first.
    ///
    /// Items on a cycle never become ready and are left out. Graphs returned
    /// by [`DependencyGraphBuilder`] are acyclic, so this covers every item.
    pub fn topological_order(&self) -> Vec<WorkItemId> {
        self.topological_indices()
            .into_iter()
            .map(|n| self.graph[n].id.clone())
            .collect()
    }

    fn topological_indices(&self) -> Vec<NodeIndex> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.hard_neighbors(n, Direction::Incoming).len())
            .collect();
        let mut ready: BinaryHeap<Reverse<NodeIndex>> = self
            .graph
            .node_indices()
            .filter(|n| in_degree[n.index()] == 0)
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            for next in self.hard_neighbors(node, Direction::Outgoing) {
                in_degree[next.index()] -= 1;
                if in_degree[next.index()] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }
        order
    }

    /// Longest Hard-dependency chain by cumulative size.
    ///
    /// One dynamic-programming pass in topological order:
    /// `longest[v] = size[v] + max(longest[u] for u in predecessors(v))`.
    /// Ties go to the lexicographically smaller id, both when choosing a
    /// predecessor and when choosing where the path ends.
    pub fn critical_path(&self) -> CriticalPath {
        let n = self.graph.node_count();
        let mut longest = vec![0u64; n];
        let mut previous: Vec<Option<NodeIndex>> = vec![None; n];

        for node in self.topological_indices() {
            let mut best: Option<NodeIndex> = None;
            for pred in self.hard_neighbors(node, Direction::Incoming) {
                // Predecessors come in id order; strict comparison keeps the smaller id.
                if best.is_none_or(|b| longest[pred.index()] > longest[b.index()]) {
                    best = Some(pred);
                }
            }
            let base = best.map_or(0, |b| longest[b.index()]);
            longest[node.index()] = base.saturating_add(u64::from(self.graph[node].size));
            previous[node.index()] = best;
        }

        let mut end: Option<NodeIndex> = None;
        for node in self.graph.node_indices() {
            if end.is_none_or(|e| longest[node.index()] > longest[e.index()]) {
                end = Some(node);
            }
        }

        let Some(end) = end else {
            return CriticalPath::default();
        };
        let mut chain = vec![end];
        let mut cursor = end;
        while let Some(prev) = previous[cursor.index()] {
            chain.push(prev);
            cursor = prev;
        }
        chain.reverse();

        CriticalPath {
            ids: chain.iter().map(|&n| self.graph[n].id.clone()).collect(),
            total_size: u32::try_from(longest[end.index()]).unwrap_or(u32::MAX),
        }
    }
}

/// Builds [`DependencyGraph`]s from items, explicit edges and inferencers.
#[derive(Debug, Default)]
pub struct DependencyGraphBuilder {
    inferencers: InferencerChain,
}

impl DependencyGraphBuilder {
    /// Builder without inferencers: explicit edges only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder using the given inferencer chain.
    pub fn with_chain(inferencers: InferencerChain) -> Self {
        Self { inferencers }
    }

    /// Append an inferencer at the lowest precedence.
    #[must_use]
    pub fn with_inferencer(mut self, inferencer: Box<dyn EdgeInferencer>) -> Self {
        self.inferencers.push(inferencer);
        self
    }

    /// Registered inferencers.
    pub fn inferencers(&self) -> &InferencerChain {
        &self.inferencers
    }

    /// Builds the graph, failing with every Hard cycle found.
    pub fn build(
        &self,
        items: &[WorkItem],
        explicit_edges: &[DependencyEdge],
    ) -> Result<DependencyGraph> {
        let edges = self.merge_edges(items, explicit_edges)?;
        Self::assemble(items, &edges)
    }

    /// Explicit edges followed by inferred ones; the first edge per
    /// `(from, to)` pair wins.
    ///
    /// # Errors
    /// Returns [`GraphError::UnknownItem`] if an explicit edge references an
    /// item not in `items`.
    pub fn merge_edges(
        &self,
        items: &[WorkItem],
        explicit_edges: &[DependencyEdge],
    ) -> Result<Vec<DependencyEdge>> {
        let known: HashSet<&WorkItemId> = items.iter().map(|i| &i.id).collect();
        for edge in explicit_edges {
            for endpoint in [&edge.from, &edge.to] {
                if !known.contains(endpoint) {
                    return Err(GraphError::UnknownItem {
                        id: endpoint.clone(),
                        edge: edge.to_string(),
                    });
                }
            }
        }

        let inferred = self.inferencers.infer(items);
        let mut seen = HashSet::new();
        let mut merged = Vec::with_capacity(explicit_edges.len() + inferred.len());
        for edge in explicit_edges.iter().cloned().chain(inferred) {
            if !known.contains(&edge.from) || !known.contains(&edge.to) {
                debug!(edge = %edge, "dropping inferred edge with unknown endpoint");
                continue;
            }
            if seen.insert((edge.from.clone(), edge.to.clone())) {
                merged.push(edge);
            }
        }
        Ok(merged)
    }

    /// Builds the graph from an already merged edge set, running no inferencers.
    ///
    /// # Errors
    /// Returns [`GraphError::DuplicateItem`], [`GraphError::UnknownItem`] or
    /// [`GraphError::Cycle`].
    pub fn assemble(items: &[WorkItem], edges: &[DependencyEdge]) -> Result<DependencyGraph> {
        let mut sorted: Vec<&WorkItem> = items.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));

        let mut graph = DiGraph::with_capacity(items.len(), edges.len());
        let mut node_map = HashMap::with_capacity(items.len());
        for item in sorted {
            if node_map.contains_key(&item.id) {
                return Err(GraphError::DuplicateItem(item.id.clone()));
            }
            let node = graph.add_node(item.clone());
            node_map.insert(item.id.clone(), node);
        }

        let mut seen = HashSet::new();
        for edge in edges {
            let lookup = |id: &WorkItemId| {
                node_map
                    .get(id)
                    .copied()
                    .ok_or_else(|| GraphError::UnknownItem {
                        id: id.clone(),
                        edge: edge.to_string(),
                    })
            };
            let from = lookup(&edge.from)?;
            let to = lookup(&edge.to)?;
            if seen.insert((from, to)) {
                graph.add_edge(from, to, edge.clone());
            }
        }

        let dag = DependencyGraph { graph, node_map };
        let cycles = dag.find_cycles();
        if !cycles.is_empty() {
            return Err(CycleError { cycles }.into());
        }

        info!(
            items = dag.node_count(),
            edges = dag.edge_count(),
            hard_edges = dag.hard_edge_count(),
            "built dependency graph"
        );
        Ok(dag)
    }
}
