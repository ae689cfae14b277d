//! Error types for Cadence Core.
//!
//! Each planning stage has its own error enum; [`CadenceError`] wraps them
//! for callers that drive several stages, such as
//! [`crate::PlanningOrchestrator::from_config_file`].

use crate::config::ConfigError;
use crate::planning::{AllocationError, DecompositionError, GraphError, PriorityError};
use thiserror::Error;

/// Core error type for Cadence operations.
#[derive(Error, Debug)]
pub enum CadenceError {
    /// Decomposition errors
    #[error("Decomposition error: {0}")]
    Decomposition(#[from] DecompositionError),

    /// Dependency graph errors
    #[error("Dependency graph error: {0}")]
    Graph(#[from] GraphError),

    /// Prioritization errors
    #[error("Prioritization error: {0}")]
    Priority(#[from] PriorityError),

    /// Allocation errors
    #[error("Allocation error: {0}")]
    Allocation(#[from] AllocationError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Cadence operations.
pub type Result<T> = std::result::Result<T, CadenceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkItemId;
    use crate::planning::CycleError;

    #[test]
    fn test_cadence_error_graph_conversion() {
        let cycle = CycleError {
            cycles: vec![vec![WorkItemId::from("A"), WorkItemId::from("B")]],
        };
        let err: CadenceError = GraphError::from(cycle).into();
        match err {
            CadenceError::Graph(GraphError::Cycle(c)) => assert_eq!(c.cycles.len(), 1),
            _ => panic!("Expected Graph error variant"),
        }
    }

    #[test]
    fn test_cadence_error_display() {
        let err: CadenceError = AllocationError::UnknownItem("Q".into()).into();
        assert_eq!(
            err.to_string(),
            "Allocation error: ranked item Q is not in the dependency graph"
        );

        let cycle = CycleError {
            cycles: vec![vec!["A".into(), "B".into()]],
        };
        let err: CadenceError = GraphError::from(cycle).into();
        assert_eq!(
            err.to_string(),
            "Dependency graph error: circular dependency detected: A -> B -> A"
        );
    }

    #[test]
    fn test_cadence_error_config() {
        let err: CadenceError = ConfigError::InvalidValue("max_item_size".into()).into();
        assert!(err.to_string().contains("max_item_size"));
    }
}
