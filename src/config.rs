// ⚙️ Audit Configuration - calibration constants passed explicitly
//
// Both values are domain calibration constants for the district audit,
// not universal truths. Every run may override them.

use crate::error::{AuditError, AuditResult};
use crate::similarity::ScoringMethod;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default fuzzy-match acceptance threshold ("close match" cutoff)
pub const DEFAULT_ACCEPTANCE_THRESHOLD: f64 = 0.8;

/// Default minimum enrolment for a district to be operationally significant
pub const DEFAULT_ENROLMENT_FLOOR: u64 = 1000;

// ============================================================================
// AUDIT CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Minimum similarity for a canonical name to be accepted (default: 0.8)
    pub acceptance_threshold: f64,

    /// Enrolment a district must exceed before it can be flagged (default: 1000)
    pub enrolment_significance_floor: u64,

    /// Similarity metric used by the resolver (default: sequence ratio)
    pub scoring_method: ScoringMethod,
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            enrolment_significance_floor: DEFAULT_ENROLMENT_FLOOR,
            scoring_method: ScoringMethod::SequenceRatio,
        }
    }
}

impl AuditConfig {
    pub fn new(acceptance_threshold: f64, enrolment_significance_floor: u64) -> Self {
        AuditConfig {
            acceptance_threshold,
            enrolment_significance_floor,
            ..Self::default()
        }
    }

    pub fn with_scoring_method(mut self, method: ScoringMethod) -> Self {
        self.scoring_method = method;
        self
    }

    /// Load configuration from a JSON file; missing fields fall back to defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: AuditConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AuditResult<()> {
        let t = self.acceptance_threshold;
        if !t.is_finite() || !(0.0..=1.0).contains(&t) {
            return Err(AuditError::InvalidConfig {
                field: "acceptance_threshold",
                reason: format!("must be within [0.0, 1.0], got {}", t),
            });
        }
        Ok(())
    }
}
