// 📥 Ingestion - CSV streams → district profiles
//
// Three linked streams (enrolment, demographic, biometric) arrive as CSV shards
// with `state`, `district`, `date`, `pincode` and per-age count columns.
//
// Pipeline:
// 1. load_stream:        headers trimmed + lowercased, non-numeric cells rejected
// 2. aggregate_streams:  group by (state, district), sum, outer-join the streams
// 3. DistrictProfile:    prefixed columns (enrol_*, demo_*, bio_*) → EntityAggregate

use crate::features::{
    EntityAggregate, EntityId, BIOMETRIC_PREFIX, DEMOGRAPHIC_PREFIX, ENROLMENT_PREFIX,
};
use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

const STATE_COLUMN: &str = "state";
const DISTRICT_COLUMN: &str = "district";

/// Text columns that are never summed; every other column must be numeric
const TEXT_COLUMNS: [&str; 3] = ["date", "pincode", "classification"];

// ============================================================================
// STREAM ROW / DISTRICT PROFILE
// ============================================================================

/// One raw record of a stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRow {
    pub entity: EntityId,
    pub values: BTreeMap<String, f64>,
}

/// Per-district sums across the three streams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictProfile {
    pub entity: EntityId,

    /// Prefixed column → sum (absent column = 0)
    pub columns: BTreeMap<String, f64>,
}

impl DistrictProfile {
    pub fn to_aggregate(&self) -> EntityAggregate {
        EntityAggregate::from_stream_columns(
            self.entity.clone(),
            self.columns.iter().map(|(k, v)| (k.as_str(), *v)),
        )
    }
}

// ============================================================================
// LABELS
// ============================================================================

/// Sorted unique non-empty values of one column (e.g. every `district` of a stream)
pub fn load_label_column(path: &Path, column: &str) -> Result<Vec<String>> {
    let (headers, records) = read_csv(path)?;
    let idx = column_index(&headers, &column.trim().to_lowercase(), path)?;

    let labels: BTreeSet<String> = records
        .iter()
        .filter_map(|r| r.get(idx))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();

    info!(path = %path.display(), column, count = labels.len(), "loaded labels");
    Ok(labels.into_iter().collect())
}

// ============================================================================
// STREAMS
// ============================================================================

/// Load one raw stream. Every column outside the key and text columns is numeric;
/// empty cells count as 0 and any other unparseable cell is an error.
pub fn load_stream(path: &Path) -> Result<Vec<StreamRow>> {
    let rows: Vec<StreamRow> = read_numeric_rows(path)?
        .into_iter()
        .map(|(entity, values)| StreamRow { entity, values })
        .collect();

    info!(path = %path.display(), rows = rows.len(), "loaded stream");
    Ok(rows)
}

/// Group each stream by district, sum, and outer-join the three streams.
///
/// Output is sorted by (state, district).
pub fn aggregate_streams(
    enrolment: &[StreamRow],
    demographic: &[StreamRow],
    biometric: &[StreamRow],
) -> Vec<DistrictProfile> {
    let mut joined: BTreeMap<EntityId, BTreeMap<String, f64>> = BTreeMap::new();

    for (rows, prefix) in [
        (enrolment, ENROLMENT_PREFIX),
        (demographic, DEMOGRAPHIC_PREFIX),
        (biometric, BIOMETRIC_PREFIX),
    ] {
        for row in rows {
            let columns = joined.entry(row.entity.clone()).or_default();
            for (name, value) in &row.values {
                *columns.entry(format!("{}{}", prefix, name)).or_insert(0.0) += value;
            }
        }
    }

    joined
        .into_iter()
        .map(|(entity, columns)| DistrictProfile { entity, columns })
        .collect()
}

// ============================================================================
// DISTRICT PROFILE CSV
// ============================================================================

/// Load a district profile (state, district, enrol_*, demo_*, bio_* ...)
pub fn load_district_profile(path: &Path) -> Result<Vec<DistrictProfile>> {
    let profiles: Vec<DistrictProfile> = read_numeric_rows(path)?
        .into_iter()
        .map(|(entity, columns)| DistrictProfile { entity, columns })
        .collect();

    info!(path = %path.display(), districts = profiles.len(), "loaded district profile");
    Ok(profiles)
}

/// Load a district profile straight into aggregates
pub fn load_aggregates(path: &Path) -> Result<Vec<EntityAggregate>> {
    Ok(load_district_profile(path)?
        .iter()
        .map(DistrictProfile::to_aggregate)
        .collect())
}

/// Write profiles with the union of all columns; missing cells are 0
pub fn write_district_profile(path: &Path, profiles: &[DistrictProfile]) -> Result<()> {
    let columns: BTreeSet<&str> = profiles
        .iter()
        .flat_map(|p| p.columns.keys().map(String::as_str))
        .collect();

    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create profile file: {:?}", path))?;

    let mut header = vec![STATE_COLUMN, DISTRICT_COLUMN];
    header.extend(columns.iter().copied());
    wtr.write_record(&header)?;

    for profile in profiles {
        let mut row = vec![profile.entity.region.clone(), profile.entity.name.clone()];
        row.extend(
            columns
                .iter()
                .map(|c| profile.columns.get(*c).copied().unwrap_or(0.0).to_string()),
        );
        wtr.write_record(&row)?;
    }

    wtr.flush().context("Failed to flush profile file")?;
    info!(path = %path.display(), districts = profiles.len(), "wrote district profile");
    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<StringRecord>)> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;

    let headers: Vec<String> = rdr
        .headers()
        .with_context(|| format!("Failed to read CSV headers: {:?}", path))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut records = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        // +2: header line plus 1-based numbering
        let record = result.with_context(|| format!("Failed to read line {} of {:?}", i + 2, path))?;
        records.push(record);
    }

    Ok((headers, records))
}

fn column_index(headers: &[String], column: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| anyhow!("Column '{}' not found in {:?}", column, path))
}

/// Key columns plus every numeric column of each record, keyed by (state, district)
fn read_numeric_rows(path: &Path) -> Result<Vec<(EntityId, BTreeMap<String, f64>)>> {
    let (headers, records) = read_csv(path)?;
    let state_idx = column_index(&headers, STATE_COLUMN, path)?;
    let district_idx = column_index(&headers, DISTRICT_COLUMN, path)?;

    let numeric = numeric_columns(&headers, &[state_idx, district_idx]);
    debug!(path = %path.display(), columns = ?numeric.iter().map(|(_, n)| n).collect::<Vec<_>>(), "numeric columns");

    let mut rows = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let entity = EntityId::new(
            record.get(state_idx).unwrap_or_default(),
            record.get(district_idx).unwrap_or_default(),
        );

        let mut values = BTreeMap::new();
        for (idx, name) in &numeric {
            // +2: header line plus 1-based numbering
            let value = parse_cell(record.get(*idx)).with_context(|| {
                format!("Invalid number in column '{}' at line {} of {:?}", name, i + 2, path)
            })?;
            values.insert(name.clone(), value);
        }

        rows.push((entity, values));
    }

    Ok(rows)
}

/// Every column except the key columns and known text columns
fn numeric_columns(headers: &[String], keys: &[usize]) -> Vec<(usize, String)> {
    headers
        .iter()
        .enumerate()
        .filter(|(idx, name)| !keys.contains(idx) && !TEXT_COLUMNS.contains(&name.as_str()))
        .map(|(idx, name)| (idx, name.clone()))
        .collect()
}

/// Empty or missing cell → 0
fn parse_cell(cell: Option<&str>) -> Result<f64> {
    match cell.map(str::trim) {
        None | Some("") => Ok(0.0),
        Some(c) => c
            .parse::<f64>()
            .map_err(|_| anyhow!("'{}' is not a number", c)),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_label_column_unique_sorted() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "bio.csv",
            " Date ,State,District,pincode\n01-03-2025,Bihar,Patna,800001\n01-03-2025,Bihar,Gaya,823001\n02-03-2025,Bihar,Patna,800002\n03-03-2025,Bihar,,800003\n",
        );

        let labels = load_label_column(&path, "District").unwrap();
        assert_eq!(labels, vec!["Gaya".to_string(), "Patna".to_string()]);
    }

    #[test]
    fn test_missing_column_is_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "x.csv", "state,name\nBihar,Patna\n");

        let err = load_label_column(&path, "district").unwrap_err();
        assert!(err.to_string().contains("district"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_stream(&dir.path().join("nope.csv")).is_err());
    }

    #[test]
    fn test_load_stream_skips_identifiers() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "enrol.csv",
            "date,state,district,pincode,age_0_5,age_5_17\n01-03-2025,Bihar,Patna,800001,10,5\n01-03-2025,Bihar,Patna,800002,,7\n",
        );

        let rows = load_stream(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].entity, EntityId::new("Bihar", "Patna"));
        assert_eq!(rows[0].values.keys().collect::<Vec<_>>(), vec!["age_0_5", "age_5_17"]);
        assert_eq!(rows[1].values["age_0_5"], 0.0);
        assert_eq!(rows[1].values["age_5_17"], 7.0);
    }

    #[test]
    fn test_load_stream_rejects_non_numeric_cell() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "enrol.csv",
            "date,state,district,pincode,age_18_greater\n01-03-2025,Bihar,Patna,800001,5000\n01-03-2025,Bihar,Gaya,823001,N/A\n",
        );

        let err = load_stream(&path).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("age_18_greater"), "{}", message);
        assert!(message.contains("line 3"), "{}", message);
        assert!(message.contains("enrol.csv"), "{}", message);
        assert!(message.contains("N/A"), "{}", message);
    }

    #[test]
    fn test_load_district_profile_rejects_non_numeric_cell() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "profile.csv",
            "state,district,enrol_age_0_5,demo_demo_age_17_\nBihar,Patna,120,40\nBihar,Gaya,??,3\n",
        );

        let err = load_aggregates(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("enrol_age_0_5"));
    }

    #[test]
    fn test_aggregate_streams_outer_join() {
        let row = |state: &str, district: &str, cols: &[(&str, f64)]| StreamRow {
            entity: EntityId::new(state, district),
            values: cols.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        };

        let enrolment = vec![
            row("Bihar", "Patna", &[("age_0_5", 100.0), ("age_18_greater", 50.0)]),
            row("Bihar", "Patna", &[("age_0_5", 20.0), ("age_18_greater", 0.0)]),
            row("Bihar", "Gaya", &[("age_0_5", 30.0), ("age_18_greater", 10.0)]),
        ];
        let demographic = vec![row("Bihar", "Patna", &[("demo_age_17_", 40.0)])];
        // Only present in the biometric stream
        let biometric = vec![row("Bihar", "Purnea", &[("bio_age_17_", 9.0)])];

        let profiles = aggregate_streams(&enrolment, &demographic, &biometric);
        let names: Vec<&str> = profiles.iter().map(|p| p.entity.name.as_str()).collect();
        assert_eq!(names, vec!["Gaya", "Patna", "Purnea"]);

        let patna = profiles[1].to_aggregate();
        assert_eq!(patna.enrolment_total, 170.0);
        assert_eq!(patna.update_total, 40.0);

        let gaya = profiles[0].to_aggregate();
        assert_eq!(gaya.enrolment_total, 40.0);
        assert_eq!(gaya.update_total, 0.0);

        let purnea = profiles[2].to_aggregate();
        assert_eq!(purnea.enrolment_total, 0.0);
        assert_eq!(purnea.update_total, 9.0);
    }

    #[test]
    fn test_profile_write_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("district_profile.csv");

        let mut patna = BTreeMap::new();
        patna.insert("enrol_age_0_5".to_string(), 120.0);
        patna.insert("demo_demo_age_17_".to_string(), 40.0);
        let mut gaya = BTreeMap::new();
        gaya.insert("enrol_age_0_5".to_string(), 30.0);
        gaya.insert("bio_bio_age_17_".to_string(), 2.5);

        let profiles = vec![
            DistrictProfile { entity: EntityId::new("Bihar", "Gaya"), columns: gaya },
            DistrictProfile { entity: EntityId::new("Bihar", "Patna"), columns: patna },
        ];
        write_district_profile(&path, &profiles).unwrap();

        let aggregates = load_aggregates(&path).unwrap();
        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].entity, EntityId::new("Bihar", "Gaya"));
        assert_eq!(aggregates[0].enrolment_total, 30.0);
        assert_eq!(aggregates[0].update_total, 2.5);
        assert_eq!(aggregates[1].enrolment_total, 120.0);
        assert_eq!(aggregates[1].update_total, 40.0);
    }

    #[test]
    fn test_profile_with_scored_columns() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "scored.csv",
            "state,district,enrol_age_0_5,demo_demo_age_17_,bio_bio_age_17_,total_enrol,classification\nKerala,Idukki,5000,0,0,5000,Ghost District (Structural Failure)\n",
        );

        let aggregates = load_aggregates(&path).unwrap();
        assert_eq!(aggregates[0].enrolment_total, 5000.0);
        assert_eq!(aggregates[0].update_total, 0.0);
    }
}
