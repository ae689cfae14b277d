//! Configuration module for Cadence Core.

pub mod planner_config;

pub use planner_config::{
    ConfigError, CyclePolicy, ENV_CYCLE_POLICY, ENV_MAX_ITEM_SIZE, InferenceConfig, PlannerConfig,
};
