use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use drift_audit::{
    aggregate_streams, derive_all, load_aggregates, load_label_column, load_stream, report,
    write_district_profile, AnomalyClassifier, AuditConfig, AuditOrchestrator, AuditReport,
    CanonicalResolver, ClassificationSummary, ResolutionSummary, ScoringMethod,
};

#[derive(Parser)]
#[command(name = "drift-audit", version, about = "District naming-drift and anomaly audit")]
struct Cli {
    #[command(flatten)]
    tuning: Tuning,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Tuning {
    /// JSON config file (acceptance_threshold, enrolment_significance_floor, scoring_method)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fuzzy-match acceptance threshold, overrides the config file
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Enrolment significance floor, overrides the config file
    #[arg(long, global = true)]
    floor: Option<u64>,

    /// sequence_ratio | jaro_winkler | normalized_levenshtein
    #[arg(long, global = true)]
    method: Option<ScoringMethod>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve labels against the master set
    Resolve {
        /// CSV holding the trusted names
        #[arg(long)]
        master: PathBuf,
        #[arg(long, default_value = "district")]
        master_column: String,
        /// Single label to test
        #[arg(long, conflicts_with = "dirty")]
        label: Option<String>,
        /// CSV holding the labels to audit
        #[arg(long, required_unless_present = "label")]
        dirty: Option<PathBuf>,
        #[arg(long, default_value = "district")]
        dirty_column: String,
        /// Write resolutions CSV here
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Classify a district profile
    Classify {
        #[arg(long)]
        profile: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Aggregate the three raw streams into a district profile
    Aggregate {
        #[arg(long)]
        enrolment: PathBuf,
        #[arg(long)]
        demographic: PathBuf,
        #[arg(long)]
        biometric: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },

    /// Full audit: resolution + classification + report files
    Audit {
        #[arg(long)]
        master: PathBuf,
        #[arg(long, default_value = "district")]
        master_column: String,
        #[arg(long)]
        dirty: PathBuf,
        #[arg(long, default_value = "district")]
        dirty_column: String,
        #[arg(long)]
        profile: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.tuning)?;
    info!(
        threshold = config.acceptance_threshold,
        floor = config.enrolment_significance_floor,
        method = config.scoring_method.as_str(),
        "configuration"
    );

    match cli.command {
        Command::Resolve {
            master,
            master_column,
            label,
            dirty,
            dirty_column,
            out,
        } => {
            let names = load_label_column(&master, &master_column)?;
            let resolver = CanonicalResolver::new(names, &config)?;

            if let Some(label) = label {
                let record = resolver.resolve(&label);
                println!("{}", serde_json::to_string_pretty(&record)?);
                return Ok(());
            }

            let dirty = dirty.context("--dirty is required when --label is absent")?;
            let labels = load_label_column(&dirty, &dirty_column)?;
            let records = resolver.resolve_batch(&resolver.suspects(&labels));

            for record in records.iter().filter(|r| r.is_healed()) {
                println!(
                    "{} → {} ({:.0}%)",
                    record.input_label,
                    record.resolved_name.as_deref().unwrap_or_default(),
                    record.confidence * 100.0
                );
            }
            println!("{}", ResolutionSummary::from_records(&records).summary());

            if let Some(out) = out {
                report::write_resolutions_csv(&out, &records)?;
            }
        }

        Command::Classify { profile, out } => {
            let features = derive_all(&load_aggregates(&profile)?)?;
            let records = AnomalyClassifier::from_config(&config).classify_population(&features)?;

            for record in records.iter().filter(|r| r.classification.is_flagged()) {
                println!(
                    "{:<40} {:>12.0} {:>12.0} {:>10.4}  {}",
                    record.entity.to_string(),
                    record.enrolment_total,
                    record.update_total,
                    record.update_intensity,
                    record.classification.as_str()
                );
            }
            println!("{}", ClassificationSummary::from_records(&records).summary());

            if let Some(out) = out {
                report::write_classifications_csv(&out, &records)?;
            }
        }

        Command::Aggregate {
            enrolment,
            demographic,
            biometric,
            out,
        } => {
            let profiles = aggregate_streams(
                &load_stream(&enrolment)?,
                &load_stream(&demographic)?,
                &load_stream(&biometric)?,
            );
            write_district_profile(&out, &profiles)?;
            println!("{} districts written to {}", profiles.len(), out.display());
        }

        Command::Audit {
            master,
            master_column,
            dirty,
            dirty_column,
            profile,
            out_dir,
        } => {
            let names = load_label_column(&master, &master_column)?;
            let labels = load_label_column(&dirty, &dirty_column)?;
            let aggregates = load_aggregates(&profile)?;

            let orchestrator = AuditOrchestrator::new(names, config)?;
            let audit = orchestrator.run(&labels, &aggregates)?;

            write_outputs(&out_dir, &audit)?;
            println!("{}", audit.summary());
        }
    }

    Ok(())
}

fn load_config(tuning: &Tuning) -> Result<AuditConfig> {
    let mut config = match &tuning.config {
        Some(path) => AuditConfig::from_json_file(path)?,
        None => AuditConfig::default(),
    };

    if let Some(threshold) = tuning.threshold {
        config.acceptance_threshold = threshold;
    }
    if let Some(floor) = tuning.floor {
        config.enrolment_significance_floor = floor;
    }
    if let Some(method) = tuning.method {
        config.scoring_method = method;
    }

    config.validate()?;
    Ok(config)
}

fn write_outputs(out_dir: &Path, audit: &AuditReport) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", out_dir))?;

    report::write_json(&out_dir.join("audit_report.json"), audit)?;
    report::write_resolutions_csv(&out_dir.join("resolutions.csv"), &audit.resolutions)?;
    report::write_classifications_csv(&out_dir.join("classifications.csv"), &audit.classifications)?;
    Ok(())
}
