// District Drift Audit - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod config;
pub mod similarity;     // Similarity Scorer
pub mod resolver;       // Canonical Entity Resolver
pub mod features;       // Feature Deriver
pub mod stats;          // Quartiles + IQR fence
pub mod classifier;     // Robust Anomaly Classifier
pub mod summary;        // Regional rollup + run summaries
pub mod ingest;         // CSV streams → district profiles
pub mod report;         // JSON / CSV findings
pub mod audit;          // Audit Orchestrator

#[cfg(feature = "server")]
pub mod api;            // HTTP API (axum)

// Re-export commonly used types
pub use error::{AuditError, AuditResult};
pub use config::{AuditConfig, DEFAULT_ACCEPTANCE_THRESHOLD, DEFAULT_ENROLMENT_FLOOR};
pub use similarity::{sequence_ratio, ScoringMethod};
pub use resolver::{CanonicalResolver, ResolutionRecord, ResolutionStatus};
pub use features::{derive, derive_all, DerivedFeatures, EntityAggregate, EntityId};
pub use stats::{quantile, RobustBounds, FENCE_MULTIPLIER};
pub use classifier::{AnomalyClassifier, Classification, ClassificationRecord};
pub use summary::{summarize_regions, ClassificationSummary, RegionSummary, ResolutionSummary};
pub use ingest::{
    aggregate_streams, load_aggregates, load_district_profile, load_label_column, load_stream,
    write_district_profile, DistrictProfile, StreamRow,
};
pub use report::{
    master_fingerprint, write_classifications_csv, write_json, write_resolutions_csv, AuditReport,
};
pub use audit::AuditOrchestrator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
