use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::DuplicationReport;
use crate::config::CheckConfig;

/// Thresholds a report must stay within. `None` disables a threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckPolicy {
    pub max_reduction_rate: Option<f64>,
    pub max_duplicate_keys: Option<u64>,
}

impl From<&CheckConfig> for CheckPolicy {
    fn from(config: &CheckConfig) -> Self {
        Self {
            max_reduction_rate: config.max_reduction_rate,
            max_duplicate_keys: config.max_duplicate_keys,
        }
    }
}

/// One exceeded threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckFailure {
    ReductionRate { actual: f64, limit: f64 },
    DuplicateKeys { actual: u64, limit: u64 },
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckFailure::ReductionRate { actual, limit } => {
                write!(f, "reduction rate {actual:.1}% exceeds {limit:.1}%")
            }
            CheckFailure::DuplicateKeys { actual, limit } => {
                write!(f, "{actual} duplicate keys exceed limit of {limit}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub passed: bool,
    pub policy: CheckPolicy,
    pub failures: Vec<CheckFailure>,
}

pub fn evaluate(report: &DuplicationReport, policy: &CheckPolicy) -> CheckOutcome {
    let mut failures = Vec::new();

    if let Some(limit) = policy.max_reduction_rate {
        let actual = report.reduction.reduction_rate;
        if actual > limit {
            failures.push(CheckFailure::ReductionRate { actual, limit });
        }
    }

    if let Some(limit) = policy.max_duplicate_keys {
        let actual = report.duplicate_summary.duplicate_key_count;
        if actual > limit {
            failures.push(CheckFailure::DuplicateKeys { actual, limit });
        }
    }

    CheckOutcome {
        passed: failures.is_empty(),
        policy: *policy,
        failures,
    }
}
