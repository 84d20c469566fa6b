// 🧾 Audit Report - combined findings + flat exports
//
// JSON carries the whole run (config, fingerprint, summaries, records).
// CSV exports are one flat row per record for spreadsheets and document tooling.

use crate::classifier::ClassificationRecord;
use crate::config::AuditConfig;
use crate::resolver::ResolutionRecord;
use crate::summary::{ClassificationSummary, RegionSummary, ResolutionSummary};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::info;

// ============================================================================
// AUDIT REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    /// Unique id of this run (UUID v4)
    pub run_id: String,

    pub generated_at: DateTime<Utc>,

    pub engine_version: String,

    pub config: AuditConfig,

    /// SHA-256 over the sorted master set; equal fingerprints + config → equal resolutions
    pub master_fingerprint: String,

    pub master_size: usize,

    pub resolutions: Vec<ResolutionRecord>,
    pub resolution_summary: ResolutionSummary,

    pub classifications: Vec<ClassificationRecord>,
    pub classification_summary: ClassificationSummary,

    pub regions: Vec<RegionSummary>,
}

impl AuditReport {
    pub fn summary(&self) -> String {
        format!(
            "Audit {} | {} | {}",
            self.run_id,
            self.resolution_summary.summary(),
            self.classification_summary.summary()
        )
    }

    /// Healed labels: the naming drift that was hiding real activity
    pub fn healed(&self) -> impl Iterator<Item = &ResolutionRecord> {
        self.resolutions.iter().filter(|r| r.is_healed())
    }

    /// Districts with any non-Normal classification
    pub fn flagged(&self) -> impl Iterator<Item = &ClassificationRecord> {
        self.classifications
            .iter()
            .filter(|r| r.classification.is_flagged())
    }
}

/// Hex SHA-256 of names sorted and newline-joined
pub fn master_fingerprint<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut sorted: Vec<&str> = names.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut hasher = Sha256::new();
    hasher.update(sorted.join("\n").as_bytes());
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// FLAT ROWS
// ============================================================================

#[derive(Debug, Serialize)]
struct ResolutionRow<'a> {
    input_label: &'a str,
    resolved_name: Option<&'a str>,
    confidence: f64,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ClassificationRow<'a> {
    state: &'a str,
    district: &'a str,
    enrolment_total: f64,
    update_total: f64,
    update_intensity: f64,
    classification: &'static str,
    q1: Option<f64>,
    q3: Option<f64>,
    iqr: Option<f64>,
    lower_bound: Option<f64>,
    upper_bound: Option<f64>,
}

// ============================================================================
// WRITERS
// ============================================================================

pub fn write_json(path: &Path, report: &AuditReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize audit report")?;
    fs::write(path, json).with_context(|| format!("Failed to write report: {:?}", path))?;
    info!(path = %path.display(), "wrote audit report");
    Ok(())
}

pub fn read_json(path: &Path) -> Result<AuditReport> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read report: {:?}", path))?;
    serde_json::from_str(&content).context("Failed to parse audit report JSON")
}

pub fn write_resolutions_csv(path: &Path, records: &[ResolutionRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create resolutions file: {:?}", path))?;

    for record in records {
        wtr.serialize(ResolutionRow {
            input_label: &record.input_label,
            resolved_name: record.resolved_name.as_deref(),
            confidence: record.confidence,
            status: record.status.as_str(),
        })?;
    }

    wtr.flush().context("Failed to flush resolutions file")?;
    Ok(())
}

pub fn write_classifications_csv(path: &Path, records: &[ClassificationRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create classifications file: {:?}", path))?;

    for record in records {
        let bounds = record.bounds_used;
        wtr.serialize(ClassificationRow {
            state: &record.entity.region,
            district: &record.entity.name,
            enrolment_total: record.enrolment_total,
            update_total: record.update_total,
            update_intensity: record.update_intensity,
            classification: record.classification.as_str(),
            q1: bounds.map(|b| b.q1),
            q3: bounds.map(|b| b.q3),
            iqr: bounds.map(|b| b.iqr),
            lower_bound: bounds.map(|b| b.lower_bound),
            upper_bound: bounds.map(|b| b.upper_bound),
        })?;
    }

    wtr.flush().context("Failed to flush classifications file")?;
    Ok(())
}
