// 🧮 Feature Deriver - per-district activity features
//
// update_intensity = update_total / (enrolment_total + 1)
//
// The +1 keeps zero-enrolment districts finite and damps the ratio for
// near-zero enrolment. A district with no updates always has intensity 0.

use crate::error::{AuditError, AuditResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column prefixes of the three linked data streams
pub const ENROLMENT_PREFIX: &str = "enrol_";
pub const DEMOGRAPHIC_PREFIX: &str = "demo_";
pub const BIOMETRIC_PREFIX: &str = "bio_";

// ============================================================================
// ENTITY ID
// ============================================================================

/// (region, name) pair identifying a district within a state
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub region: String,
    pub name: String,
}

impl EntityId {
    pub fn new(region: impl Into<String>, name: impl Into<String>) -> Self {
        EntityId {
            region: region.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.name)
    }
}

// ============================================================================
// ENTITY AGGREGATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAggregate {
    pub entity: EntityId,

    /// Sum of all enrolment-stream counts
    pub enrolment_total: f64,

    /// Sum of demographic + biometric update counts
    pub update_total: f64,
}

impl EntityAggregate {
    pub fn new(entity: EntityId, enrolment_total: f64, update_total: f64) -> Self {
        EntityAggregate {
            entity,
            enrolment_total,
            update_total,
        }
    }

    /// Build totals from prefixed profile columns.
    ///
    /// `enrol_*` columns feed enrolment; `demo_*` and `bio_*` feed updates.
    /// Other columns are ignored.
    pub fn from_stream_columns<'a, I>(entity: EntityId, columns: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut enrolment_total = 0.0;
        let mut update_total = 0.0;

        for (name, value) in columns {
            if name.starts_with(ENROLMENT_PREFIX) {
                enrolment_total += value;
            } else if name.starts_with(DEMOGRAPHIC_PREFIX) || name.starts_with(BIOMETRIC_PREFIX) {
                update_total += value;
            }
        }

        EntityAggregate::new(entity, enrolment_total, update_total)
    }

    /// Reject negative or non-finite totals (never clamp)
    pub fn validate(&self) -> AuditResult<()> {
        check_total(&self.entity, "enrolment_total", self.enrolment_total)?;
        check_total(&self.entity, "update_total", self.update_total)
    }
}

fn check_total(entity: &EntityId, field: &'static str, value: f64) -> AuditResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AuditError::InvalidAggregate {
            entity: entity.to_string(),
            field,
            value,
        })
    }
}

// ============================================================================
// DERIVED FEATURES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFeatures {
    pub entity: EntityId,
    pub enrolment_total: f64,
    pub update_total: f64,
    pub update_intensity: f64,
}

impl DerivedFeatures {
    pub fn is_active(&self) -> bool {
        self.update_total > 0.0
    }
}

/// Derive update intensity for one validated aggregate
pub fn derive(record: &EntityAggregate) -> AuditResult<DerivedFeatures> {
    record.validate()?;

    Ok(DerivedFeatures {
        entity: record.entity.clone(),
        enrolment_total: record.enrolment_total,
        update_total: record.update_total,
        update_intensity: update_intensity(record.enrolment_total, record.update_total),
    })
}

/// Derive a whole batch; fails on the first invalid record without partial output
pub fn derive_all(records: &[EntityAggregate]) -> AuditResult<Vec<DerivedFeatures>> {
    records.iter().map(derive).collect()
}

pub fn update_intensity(enrolment_total: f64, update_total: f64) -> f64 {
    update_total / (enrolment_total + 1.0)
}

// ============================================================================
// TESTS
// ============================================================================
