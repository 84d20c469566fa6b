// 🚨 Robust Anomaly Classifier - ghost districts and high-volume outliers
//
// Administrative volume is heavy-tailed: a few metros carry most activity.
// A mean/std (Z-score) test flags those metros as anomalies, so bounds come
// from quartiles of the ACTIVE population instead (see stats.rs).
//
// Rules, in priority order:
// 1. GhostStructural   - enrolment > floor AND zero updates
// 2. HighVolumeAnomaly - intensity > upper bound AND enrolment > floor
// 3. Normal            - everything else (low-but-nonzero intensity included)

use crate::config::AuditConfig;
use crate::error::AuditResult;
use crate::features::{DerivedFeatures, EntityAggregate, EntityId};
use crate::stats::RobustBounds;
use serde::{Deserialize, Serialize};

// ============================================================================
// CLASSIFICATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Normal,

    /// Significant enrolment but no update activity at all (suspected linkage failure)
    GhostStructural,

    /// Update intensity above the robust upper fence
    HighVolumeAnomaly,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Normal => "Normal",
            Classification::GhostStructural => "Ghost District (Structural Failure)",
            Classification::HighVolumeAnomaly => "High Volume Anomaly",
        }
    }

    pub fn is_flagged(&self) -> bool {
        !matches!(self, Classification::Normal)
    }
}

// ============================================================================
// CLASSIFICATION RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub entity: EntityId,
    pub enrolment_total: f64,
    pub update_total: f64,
    pub update_intensity: f64,
    pub classification: Classification,

    /// Population bounds applied (None when no district had any updates)
    pub bounds_used: Option<RobustBounds>,
}

// ============================================================================
// ANOMALY CLASSIFIER
// ============================================================================

pub struct AnomalyClassifier {
    /// Enrolment a district must exceed before it can be flagged (default: 1000)
    pub enrolment_significance_floor: f64,
}

impl AnomalyClassifier {
    pub fn new(enrolment_significance_floor: u64) -> Self {
        AnomalyClassifier {
            enrolment_significance_floor: enrolment_significance_floor as f64,
        }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.enrolment_significance_floor)
    }

    /// Classify the full population.
    ///
    /// Every record is validated before anything is classified; one bad record
    /// fails the whole batch. Output order matches input order.
    pub fn classify_population(
        &self,
        records: &[DerivedFeatures],
    ) -> AuditResult<Vec<ClassificationRecord>> {
        for record in records {
            validate(record)?;
        }

        let bounds = self.bounds(records);

        Ok(records
            .iter()
            .map(|record| self.classify_one(record, bounds))
            .collect())
    }

    /// Robust bounds over districts with at least one update
    pub fn bounds(&self, records: &[DerivedFeatures]) -> Option<RobustBounds> {
        let active: Vec<f64> = records
            .iter()
            .filter(|r| r.is_active())
            .map(|r| r.update_intensity)
            .collect();

        RobustBounds::from_values(&active)
    }

    /// Classify one record against fixed population bounds
    pub fn classify_one(
        &self,
        record: &DerivedFeatures,
        bounds: Option<RobustBounds>,
    ) -> ClassificationRecord {
        let significant = record.enrolment_total > self.enrolment_significance_floor;

        let classification = match bounds {
            // No active districts: nothing to compare against
            None => Classification::Normal,
            Some(_) if significant && record.update_total == 0.0 => {
                Classification::GhostStructural
            }
            Some(b) if significant && b.is_above(record.update_intensity) => {
                Classification::HighVolumeAnomaly
            }
            Some(_) => Classification::Normal,
        };

        ClassificationRecord {
            entity: record.entity.clone(),
            enrolment_total: record.enrolment_total,
            update_total: record.update_total,
            update_intensity: record.update_intensity,
            classification,
            bounds_used: bounds,
        }
    }
}

impl Default for AnomalyClassifier {
    fn default() -> Self {
        Self::from_config(&AuditConfig::default())
    }
}

fn validate(record: &DerivedFeatures) -> AuditResult<()> {
    EntityAggregate::new(
        record.entity.clone(),
        record.enrolment_total,
        record.update_total,
    )
    .validate()
}

// ============================================================================
// TESTS
// ============================================================================
