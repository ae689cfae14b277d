//! WSJF scoring inputs and outputs.

use super::work_item::WorkItemId;
use serde::{Deserialize, Serialize};

/// Caller-supplied business judgment for one item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueFactors {
    /// Relative user/business value.
    pub business_value: f64,

    /// How much value decays with delay.
    pub time_criticality: f64,

    /// Risk reduction and/or opportunity enablement.
    pub risk_reduction_opportunity_enablement: f64,

    /// Overrides the item's size as WSJF denominator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_size: Option<f64>,
}

impl ValueFactors {
    /// Create factors with the job size taken from the item.
    pub fn new(
        business_value: f64,
        time_criticality: f64,
        risk_reduction_opportunity_enablement: f64,
    ) -> Self {
        Self {
            business_value,
            time_criticality,
            risk_reduction_opportunity_enablement,
            job_size: None,
        }
    }

    /// Override the job size.
    #[must_use]
    pub fn with_job_size(mut self, job_size: f64) -> Self {
        self.job_size = Some(job_size);
        self
    }

    /// Cost of delay: the WSJF numerator.
    pub fn cost_of_delay(&self) -> f64 {
        self.business_value + self.time_criticality + self.risk_reduction_opportunity_enablement
    }

    /// Name of the first factor that is not a positive finite number.
    pub fn first_invalid(&self) -> Option<&'static str> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.business_value) {
            Some("business_value")
        } else if !positive(self.time_criticality) {
            Some("time_criticality")
        } else if !positive(self.risk_reduction_opportunity_enablement) {
            Some("risk_reduction_opportunity_enablement")
        } else if self.job_size.is_some_and(|js| !positive(js)) {
            Some("job_size")
        } else {
            None
        }
    }
}

impl Default for ValueFactors {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

/// An item with its WSJF score.
///
/// Refers to the item by id only; the work item itself stays with the caller
/// or the dependency graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    /// Scored item.
    pub item_id: WorkItemId,

    /// Business value.
    pub business_value: f64,

    /// Time criticality.
    pub time_criticality: f64,

    /// Risk reduction / opportunity enablement.
    pub risk_reduction_opportunity_enablement: f64,

    /// WSJF denominator (defaults to the item's size).
    pub job_size: f64,

    /// Weighted shortest job first score.
    pub wsjf: f64,
}

impl ScoredItem {
    /// Score an item. `job_size` must be positive.
    pub fn new(item_id: WorkItemId, factors: &ValueFactors, job_size: f64) -> Self {
        Self {
            item_id,
            business_value: factors.business_value,
            time_criticality: factors.time_criticality,
            risk_reduction_opportunity_enablement: factors.risk_reduction_opportunity_enablement,
            job_size,
            wsjf: factors.cost_of_delay() / job_size,
        }
    }

    /// Whether two scored items share the same priority (WSJF and job size).
    pub fn same_priority(&self, other: &Self) -> bool {
        self.wsjf.total_cmp(&other.wsjf).is_eq() && self.job_size.total_cmp(&other.job_size).is_eq()
    }
}
