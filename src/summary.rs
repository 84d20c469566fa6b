// 🗺️ Audit Summaries - run-level counts and regional rollup
//
// Regional update rate:
//   update_rate = total_updates / (total_enrolment + 1) * 100

use crate::classifier::{Classification, ClassificationRecord};
use crate::resolver::{ResolutionRecord, ResolutionStatus};
use crate::stats::{mean, RobustBounds};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// RESOLUTION SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub total_labels: usize,
    pub valid_count: usize,
    pub healed_count: usize,
    pub ghost_count: usize,
}

impl ResolutionSummary {
    pub fn from_records(records: &[ResolutionRecord]) -> Self {
        let count = |status: ResolutionStatus| records.iter().filter(|r| r.status == status).count();

        ResolutionSummary {
            total_labels: records.len(),
            valid_count: count(ResolutionStatus::Valid),
            healed_count: count(ResolutionStatus::Healed),
            ghost_count: count(ResolutionStatus::Ghost),
        }
    }

    /// Share of non-valid labels that could be healed (1.0 when nothing drifted)
    pub fn recovery_rate(&self) -> f64 {
        let drifted = self.healed_count + self.ghost_count;
        if drifted == 0 {
            return 1.0;
        }
        self.healed_count as f64 / drifted as f64
    }

    pub fn summary(&self) -> String {
        format!(
            "{} labels: {} valid, {} healed, {} unresolved ({:.1}% recovery)",
            self.total_labels,
            self.valid_count,
            self.healed_count,
            self.ghost_count,
            self.recovery_rate() * 100.0
        )
    }
}

// ============================================================================
// CLASSIFICATION SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSummary {
    pub total_entities: usize,
    pub active_entities: usize,
    pub normal_count: usize,
    pub ghost_count: usize,
    pub anomaly_count: usize,

    /// Mean intensity of non-ghost districts (None if there are none)
    pub mean_intensity_non_ghost: Option<f64>,

    /// Mean intensity of ghost districts (0.0 by construction when present)
    pub mean_intensity_ghost: Option<f64>,

    pub bounds: Option<RobustBounds>,
}

impl ClassificationSummary {
    pub fn from_records(records: &[ClassificationRecord]) -> Self {
        let count = |c: Classification| records.iter().filter(|r| r.classification == c).count();

        let (ghosts, others): (Vec<&ClassificationRecord>, Vec<&ClassificationRecord>) = records
            .iter()
            .partition(|r| r.classification == Classification::GhostStructural);

        ClassificationSummary {
            total_entities: records.len(),
            active_entities: records.iter().filter(|r| r.update_total > 0.0).count(),
            normal_count: count(Classification::Normal),
            ghost_count: count(Classification::GhostStructural),
            anomaly_count: count(Classification::HighVolumeAnomaly),
            mean_intensity_non_ghost: mean_intensity(&others),
            mean_intensity_ghost: mean_intensity(&ghosts),
            bounds: records.iter().find_map(|r| r.bounds_used),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} districts ({} active): {} normal, {} ghost, {} high-volume anomalies",
            self.total_entities,
            self.active_entities,
            self.normal_count,
            self.ghost_count,
            self.anomaly_count
        )
    }
}

fn mean_intensity(records: &[&ClassificationRecord]) -> Option<f64> {
    let values: Vec<f64> = records.iter().map(|r| r.update_intensity).collect();
    mean(&values)
}

// ============================================================================
// REGION SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: String,
    pub entity_count: usize,
    pub total_enrolment: f64,
    pub total_updates: f64,

    /// Updates per enrolment, in percent
    pub update_rate: f64,

    pub ghost_count: usize,
    pub anomaly_count: usize,
}

/// Roll classified districts up to their region (state).
///
/// Sorted by update rate, highest first; ties by region name.
pub fn summarize_regions(records: &[ClassificationRecord]) -> Vec<RegionSummary> {
    let mut by_region: BTreeMap<&str, RegionSummary> = BTreeMap::new();

    for record in records {
        let entry = by_region
            .entry(record.entity.region.as_str())
            .or_insert_with(|| RegionSummary {
                region: record.entity.region.clone(),
                entity_count: 0,
                total_enrolment: 0.0,
                total_updates: 0.0,
                update_rate: 0.0,
                ghost_count: 0,
                anomaly_count: 0,
            });

        entry.entity_count += 1;
        entry.total_enrolment += record.enrolment_total;
        entry.total_updates += record.update_total;
        match record.classification {
            Classification::GhostStructural => entry.ghost_count += 1,
            Classification::HighVolumeAnomaly => entry.anomaly_count += 1,
            Classification::Normal => {}
        }
    }

    let mut regions: Vec<RegionSummary> = by_region
        .into_values()
        .map(|mut r| {
            r.update_rate = r.total_updates / (r.total_enrolment + 1.0) * 100.0;
            r
        })
        .collect();

    regions.sort_by(|a, b| {
        b.update_rate
            .total_cmp(&a.update_rate)
            .then_with(|| a.region.cmp(&b.region))
    });

    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::AnomalyClassifier;
    use crate::features::{derive_all, EntityAggregate, EntityId};

    fn classified() -> Vec<ClassificationRecord> {
        let aggregates = vec![
            EntityAggregate::new(EntityId::new("Bihar", "Patna"), 5000.0, 0.0),
            EntityAggregate::new(EntityId::new("Bihar", "Gaya"), 5000.0, 4000.0),
            EntityAggregate::new(EntityId::new("Kerala", "Kollam"), 5000.0, 4200.0),
            EntityAggregate::new(EntityId::new("Kerala", "Idukki"), 999.0, 0.0),
        ];
        let features = derive_all(&aggregates).unwrap();
        AnomalyClassifier::new(1000).classify_population(&features).unwrap()
    }

    #[test]
    fn test_region_rollup() {
        let regions = summarize_regions(&classified());

        assert_eq!(regions.len(), 2);
        // Kerala: 4200 / 6000 → 70%; Bihar: 4000 / 10001 → ~40%
        assert_eq!(regions[0].region, "Kerala");
        assert_eq!(regions[0].entity_count, 2);
        assert_eq!(regions[0].ghost_count, 0);
        assert!((regions[0].update_rate - 4200.0 / 6000.0 * 100.0).abs() < 1e-9);

        assert_eq!(regions[1].region, "Bihar");
        assert_eq!(regions[1].ghost_count, 1);
        assert_eq!(regions[1].total_enrolment, 10_000.0);
    }

    #[test]
    fn test_classification_summary() {
        let summary = ClassificationSummary::from_records(&classified());

        assert_eq!(summary.total_entities, 4);
        assert_eq!(summary.active_entities, 2);
        assert_eq!(summary.ghost_count, 1);
        assert_eq!(summary.normal_count, 3);
        assert_eq!(summary.anomaly_count, 0);
        assert_eq!(summary.mean_intensity_ghost, Some(0.0));
        assert!(summary.mean_intensity_non_ghost.unwrap() > 0.0);
        assert!(summary.bounds.is_some());
        assert!(summary.summary().contains("1 ghost"));
    }

    #[test]
    fn test_resolution_summary() {
        let records = vec![
            ResolutionRecord {
                input_label: "Pune".to_string(),
                resolved_name: Some("Pune".to_string()),
                confidence: 1.0,
                status: ResolutionStatus::Valid,
            },
            ResolutionRecord {
                input_label: "Puna".to_string(),
                resolved_name: Some("Pune".to_string()),
                confidence: 0.75,
                status: ResolutionStatus::Healed,
            },
            ResolutionRecord {
                input_label: "Zzyzyx".to_string(),
                resolved_name: None,
                confidence: 0.0,
                status: ResolutionStatus::Ghost,
            },
        ];

        let summary = ResolutionSummary::from_records(&records);
        assert_eq!(summary.total_labels, 3);
        assert_eq!(summary.valid_count, 1);
        assert_eq!(summary.healed_count, 1);
        assert_eq!(summary.ghost_count, 1);
        assert_eq!(summary.recovery_rate(), 0.5);
    }

    #[test]
    fn test_empty_summaries() {
        assert_eq!(ResolutionSummary::from_records(&[]).recovery_rate(), 1.0);
        let summary = ClassificationSummary::from_records(&[]);
        assert_eq!(summary.mean_intensity_non_ghost, None);
        assert!(summary.bounds.is_none());
        assert!(summarize_regions(&[]).is_empty());
    }
}
