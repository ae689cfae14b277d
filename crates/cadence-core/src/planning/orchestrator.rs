//! Planning run sequencing.
//!
//! Runs decomposition, graph building, prioritization, allocation and
//! readiness validation in order. Every failure ends up in the returned
//! [`PlanningResult`]; nothing is thrown past this module.

use crate::config::{CyclePolicy, PlannerConfig};
use crate::error::Result;
use crate::models::{
    DeferralReason, DependencyEdge, DependencyStrength, IssueCode, IterationPlan, IterationSpec,
    ReadinessIssue, ReadinessReport, ScoredItem, ValueFactors, WorkItem, WorkItemId,
};
use crate::planning::allocator::{AllocationError, IterationAllocator};
use crate::planning::dag::{
    CycleError, DependencyGraph, DependencyGraphBuilder, GraphError, format_cycle,
};
use crate::planning::decomposer::{DecompositionResult, DecompositionWarning, Decomposer};
use crate::planning::inference::{EdgeInferencer, InferencerChain};
use crate::planning::prioritizer::{PriorityError, Prioritizer};
use crate::planning::readiness::ReadinessValidator;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

/// Input snapshot for one planning run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningRequest {
    /// Backlog items.
    pub items: Vec<WorkItem>,

    /// Explicitly declared dependencies.
    #[serde(default)]
    pub edges: Vec<DependencyEdge>,

    /// WSJF inputs per item id.
    #[serde(default)]
    pub value_factors: HashMap<WorkItemId, ValueFactors>,

    /// Iterations of the planning interval.
    #[serde(default)]
    pub iterations: Vec<IterationSpec>,
}

/// Output of one planning run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningResult {
    /// The allocation; absent when a stage failed for the whole run.
    pub plan: Option<IterationPlan>,

    /// Every finding of the run.
    pub validation: ReadinessReport,

    /// Longest Hard-dependency chain by cumulative size.
    pub critical_path: Vec<WorkItemId>,

    /// Total size along `critical_path`.
    pub critical_path_size: u32,

    /// Items that were split, with criteria traceability.
    pub decompositions: Vec<DecompositionResult>,

    /// Final priority order used for allocation.
    pub ranking: Vec<ScoredItem>,
}

impl PlanningResult {
    /// A plan was produced and it has no blocking issues.
    pub fn is_ready(&self) -> bool {
        self.plan.is_some() && self.validation.is_ready()
    }

    fn halt(mut self, report: ReadinessReport) -> Self {
        warn!(issues = report.issues.len(), "planning run halted");
        self.plan = None;
        self.validation = report;
        self
    }
}

/// Sequences the planning stages for a single run.
#[derive(Debug)]
pub struct PlanningOrchestrator {
    config: PlannerConfig,
    decomposer: Decomposer,
    graph_builder: DependencyGraphBuilder,
    prioritizer: Prioritizer,
    allocator: IterationAllocator,
    validator: ReadinessValidator,
}

impl PlanningOrchestrator {
    /// Create an orchestrator with the built-in inferencers enabled by `config`.
    pub fn new(config: PlannerConfig) -> Self {
        let chain = InferencerChain::builtin(
            config.inference.keywords,
            config.inference.shared_components,
        );
        Self {
            decomposer: Decomposer::new().with_max_children(config.max_split_children),
            graph_builder: DependencyGraphBuilder::with_chain(chain),
            prioritizer: Prioritizer::new()
                .with_dependency_awareness(config.dependency_aware_priority),
            allocator: IterationAllocator::new(),
            validator: ReadinessValidator::new(),
            config,
        }
    }

    /// Create an orchestrator from a configuration file.
    pub fn from_config_file(path: &Path) -> Result<Self> {
        let mut config = PlannerConfig::load_from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Create an orchestrator from the discovered global and local configuration.
    pub fn discover() -> Result<Self> {
        Ok(Self::new(PlannerConfig::discover_and_load()?))
    }

    /// Register a caller-supplied inferencer after the built-in ones.
    #[must_use]
    pub fn with_inferencer(mut self, inferencer: Box<dyn EdgeInferencer>) -> Self {
        self.graph_builder =
            std::mem::take(&mut self.graph_builder).with_inferencer(inferencer);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Run every stage on `request`.
    #[tracing::instrument(
        skip_all,
        fields(items = request.items.len(), iterations = request.iterations.len())
    )]
    pub fn plan(&self, request: &PlanningRequest) -> PlanningResult {
        let mut result = PlanningResult::default();
        let mut report = ReadinessReport::new();

        if let Some(duplicate) = first_duplicate(&request.items) {
            report.push_issue(ReadinessIssue::new(
                IssueCode::DuplicateItem,
                format!("work item id {duplicate} is used more than once"),
                vec![duplicate.clone()],
            ));
            return result.halt(report);
        }

        let mut excluded = BTreeSet::new();
        let outcomes = self.decompose_items(&request.items, &mut excluded, &mut report);
        if !excluded.is_empty() {
            // Text references to an excluded item only resolve against the original backlog.
            let mut blocking = request.edges.clone();
            blocking.extend(self.graph_builder.inferencers().infer(&request.items));
            exclude_blocked(&blocking, &mut excluded, &mut report);
        }

        let mut items = Vec::new();
        let mut children: HashMap<WorkItemId, Vec<WorkItemId>> = HashMap::new();
        for outcome in outcomes.into_iter().filter(|o| !excluded.contains(&o.original_id)) {
            items.extend(outcome.items.iter().cloned());
            if outcome.is_split() {
                children.insert(outcome.original_id.clone(), outcome.item_ids());
                result.decompositions.push(outcome);
            }
        }
        let edges = remap_edges(&request.edges, &excluded, &children);
        let factors = self.fill_value_factors(&items, &request.value_factors, &mut report);

        let Some(graph) = self.build_graph(&items, &edges, &mut report) else {
            return result.halt(report);
        };
        let path = graph.critical_path();
        result.critical_path = path.ids;
        result.critical_path_size = path.total_size;

        let ranking = match self.prioritizer.rank(&graph, &factors) {
            Ok(ranking) => ranking,
            Err(e) => {
                report.push_issue(priority_issue(&e));
                return result.halt(report);
            }
        };
        result.ranking = ranking;

        let allocation = self.allocator.allocate(&result.ranking, &graph, &request.iterations);
        let plan = match allocation {
            Ok(plan) => plan,
            Err(e) => {
                report.push_issue(allocation_issue(&e));
                return result.halt(report);
            }
        };
        report_allocation(&plan, &graph, &mut report);
        report.merge(self.validator.validate(&plan, &graph, self.config.max_item_size));

        info!(
            ready = report.is_ready(),
            issues = report.issues.len(),
            advisories = report.advisories.len(),
            critical_path_size = result.critical_path_size,
            "planning run complete"
        );
        result.plan = Some(plan);
        result.validation = report;
        result
    }

    /// Decompose every item; failed items go to `excluded`.
    ///
    /// Generated child ids never reuse an id already present in the backlog.
    #[tracing::instrument(skip_all)]
    fn decompose_items(
        &self,
        items: &[WorkItem],
        excluded: &mut BTreeSet<WorkItemId>,
        report: &mut ReadinessReport,
    ) -> Vec<DecompositionResult> {
        let mut reserved: HashSet<WorkItemId> = items.iter().map(|i| i.id.clone()).collect();
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            if item.size == 0 {
                report.push_issue(ReadinessIssue::new(
                    IssueCode::ZeroSizedItem,
                    format!("{} has size 0 and cannot be planned", item.id),
                    vec![item.id.clone()],
                ));
                excluded.insert(item.id.clone());
                continue;
            }
            let max_item_size = self.config.max_item_size;
            match self.decomposer.decompose_avoiding(item, max_item_size, &reserved) {
                Ok(outcome) => {
                    if outcome.is_split() {
                        reserved.extend(outcome.item_ids());
                    }
                    for warning in &outcome.warnings {
                        let DecompositionWarning::EmptyAcceptanceCriteria { child_ids } = warning;
                        report.push_advisory(ReadinessIssue::new(
                            IssueCode::EmptyAcceptanceCriteria,
                            format!("{} was split into parts without acceptance criteria", item.id),
                            child_ids.clone(),
                        ));
                    }
                    outcomes.push(outcome);
                }
                Err(e) => {
                    report.push_issue(ReadinessIssue::new(
                        IssueCode::SizeTooLargeForSplit,
                        e.to_string(),
                        vec![item.id.clone()],
                    ));
                    excluded.insert(item.id.clone());
                }
            }
        }
        info!(
            split = outcomes.iter().filter(|o| o.is_split()).count(),
            excluded = excluded.len(),
            "decomposed backlog"
        );
        outcomes
    }

    /// Caller factors, inherited by split children; defaults fill the gaps.
    fn fill_value_factors(
        &self,
        items: &[WorkItem],
        supplied: &HashMap<WorkItemId, ValueFactors>,
        report: &mut ReadinessReport,
    ) -> HashMap<WorkItemId, ValueFactors> {
        let mut missing = BTreeSet::new();
        let mut factors = HashMap::with_capacity(items.len());
        for item in items {
            let resolved = match supplied.get(&item.id) {
                Some(f) => *f,
                None => match item.parent_id().and_then(|p| supplied.get(p)) {
                    Some(parent) => ValueFactors {
                        job_size: None,
                        ..*parent
                    },
                    None => {
                        missing.insert(item.parent_id().unwrap_or(&item.id).clone());
                        self.config.default_value_factors
                    }
                },
            };
            factors.insert(item.id.clone(), resolved);
        }
        if !missing.is_empty() {
            let ids: Vec<WorkItemId> = missing.into_iter().collect();
            report.push_advisory(ReadinessIssue::new(
                IssueCode::MissingValueFactors,
                format!("{} item(s) have no value factors; defaults were used", ids.len()),
                ids,
            ));
        }
        factors
    }

    /// Build the graph, applying the configured cycle policy.
    #[tracing::instrument(skip_all, fields(items = items.len(), edges = edges.len()))]
    fn build_graph(
        &self,
        items: &[WorkItem],
        edges: &[DependencyEdge],
        report: &mut ReadinessReport,
    ) -> Option<DependencyGraph> {
        let mut merged = match self.graph_builder.merge_edges(items, edges) {
            Ok(merged) => merged,
            Err(e) => {
                push_graph_issues(e, report);
                return None;
            }
        };

        loop {
            match DependencyGraphBuilder::assemble(items, &merged) {
                Ok(graph) => return Some(graph),
                Err(GraphError::Cycle(cycles))
                    if self.config.cycle_policy == CyclePolicy::SoftFallback =>
                {
                    downgrade_cycles(&mut merged, &cycles);
                    for cycle in cycles.cycles {
                        let path = format_cycle(&cycle);
                        warn!(cycle = %path, "downgraded cycle to soft dependencies");
                        report.push_advisory(ReadinessIssue::new(
                            IssueCode::CycleDowngraded,
                            format!("cycle {path} downgraded to soft dependencies"),
                            cycle,
                        ));
                    }
                }
                Err(e) => {
                    push_graph_issues(e, report);
                    return None;
                }
            }
        }
    }
}

impl Default for PlanningOrchestrator {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

fn first_duplicate(items: &[WorkItem]) -> Option<&WorkItemId> {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().map(|i| &i.id).find(|id| !seen.insert(*id))
}

/// Adds the transitive Hard dependents of excluded items to `excluded`.
fn exclude_blocked(
    edges: &[DependencyEdge],
    excluded: &mut BTreeSet<WorkItemId>,
    report: &mut ReadinessReport,
) {
    let mut queue: Vec<WorkItemId> = excluded.iter().cloned().collect();
    while let Some(blocker) = queue.pop() {
        let mut dependents: Vec<&WorkItemId> = edges
            .iter()
            .filter(|e| e.is_hard() && e.from == blocker)
            .map(|e| &e.to)
            .collect();
        dependents.sort();
        dependents.dedup();
        for dependent in dependents {
            if excluded.insert(dependent.clone()) {
                report.push_issue(ReadinessIssue::new(
                    IssueCode::BlockedByExcludedItem,
                    format!("{dependent} depends on {blocker}, which was excluded from the plan"),
                    vec![dependent.clone(), blocker.clone()],
                ));
                queue.push(dependent.clone());
            }
        }
    }
}

/// Drops edges touching excluded items and points edges at split parents to
/// their children.
fn remap_edges(
    edges: &[DependencyEdge],
    excluded: &BTreeSet<WorkItemId>,
    children: &HashMap<WorkItemId, Vec<WorkItemId>>,
) -> Vec<DependencyEdge> {
    let expand = |id: &WorkItemId| {
        children
            .get(id)
            .cloned()
            .unwrap_or_else(|| vec![id.clone()])
    };
    let kept = edges
        .iter()
        .filter(|e| !excluded.contains(&e.from) && !excluded.contains(&e.to));
    let mut remapped = Vec::with_capacity(edges.len());
    for edge in kept {
        for from in expand(&edge.from) {
            for to in expand(&edge.to) {
                remapped.push(edge.rewired(from.clone(), to));
            }
        }
    }
    remapped
}

fn downgrade_cycles(edges: &mut [DependencyEdge], cycles: &CycleError) {
    let on_cycle = cycles.cycle_edges();
    for edge in edges.iter_mut().filter(|e| e.is_hard()) {
        if on_cycle.contains(&(edge.from.clone(), edge.to.clone())) {
            edge.strength = DependencyStrength::Soft;
        }
    }
}

fn push_graph_issues(error: GraphError, report: &mut ReadinessReport) {
    let (code, related) = match error {
        GraphError::Cycle(cycles) => {
            for cycle in cycles.cycles {
                report.push_issue(ReadinessIssue::new(
                    IssueCode::CircularDependency,
                    format!("circular dependency: {}", format_cycle(&cycle)),
                    cycle,
                ));
            }
            return;
        }
        GraphError::UnknownItem { ref id, .. } => (IssueCode::UnknownItem, vec![id.clone()]),
        GraphError::DuplicateItem(ref id) => (IssueCode::DuplicateItem, vec![id.clone()]),
    };
    report.push_issue(ReadinessIssue::new(code, error.to_string(), related));
}

fn priority_issue(error: &PriorityError) -> ReadinessIssue {
    let (code, id) = match error {
        PriorityError::InvalidValueFactors { id, .. } => (IssueCode::InvalidValueFactors, id),
        PriorityError::ZeroJobSize(id) => (IssueCode::ZeroSizedItem, id),
        PriorityError::MissingValueFactors(id) => (IssueCode::MissingValueFactors, id),
    };
    ReadinessIssue::new(code, error.to_string(), vec![id.clone()])
}

fn allocation_issue(error: &AllocationError) -> ReadinessIssue {
    let (code, related) = match error {
        AllocationError::InvalidIteration { .. } => (IssueCode::InvalidIteration, Vec::new()),
        AllocationError::UnknownItem(id) => (IssueCode::UnknownItem, vec![id.clone()]),
        AllocationError::CapacityExceededGlobally { .. } => {
            (IssueCode::CapacityExceededGlobally, Vec::new())
        }
    };
    ReadinessIssue::new(code, error.to_string(), related)
}

/// Deferred items and overflow as findings.
fn report_allocation(plan: &IterationPlan, graph: &DependencyGraph, report: &mut ReadinessReport) {
    if let Some(overflow) = plan.capacity_overflow {
        report.push_advisory(ReadinessIssue::new(
            IssueCode::CapacityExceededGlobally,
            format!(
                "backlog needs {} points but the interval offers {}",
                overflow.required, overflow.available
            ),
            Vec::new(),
        ));
    }
    for deferred in &plan.deferred {
        let why = match &deferred.reason {
            DeferralReason::InsufficientCapacity => "no eligible iteration has room".to_string(),
            DeferralReason::PredecessorsUnplaced { predecessors } => {
                let names: Vec<&str> = predecessors.iter().map(WorkItemId::as_str).collect();
                format!("waiting on unplaced {}", names.join(", "))
            }
        };
        let message = format!(
            "{} ({} points) could not be placed: {}",
            deferred.id, deferred.size, why
        );
        let related = vec![deferred.id.clone()];
        let code = if graph.item(&deferred.id).is_some_and(|i| i.mandatory) {
            IssueCode::MandatoryItemDeferred
        } else {
            IssueCode::ItemDeferred
        };
        let finding = ReadinessIssue::new(code, message, related);
        if code == IssueCode::MandatoryItemDeferred {
            report.push_issue(finding);
        } else {
            report.push_advisory(finding);
        }
    }
}
