// 🛡️ Audit Orchestrator - naming drift + anomaly classification in one run
//
// Two independent passes merged into one report:
// - suspects (labels not in the master set) → resolver → Healed / Ghost
// - district aggregates → deriver → classifier → Normal / Ghost / Anomaly

use crate::classifier::{AnomalyClassifier, ClassificationRecord};
use crate::config::AuditConfig;
use crate::error::AuditResult;
use crate::features::{derive_all, EntityAggregate};
use crate::report::{master_fingerprint, AuditReport};
use crate::resolver::{CanonicalResolver, ResolutionRecord};
use crate::summary::{summarize_regions, ClassificationSummary, ResolutionSummary};
use chrono::Utc;
use tracing::{info, warn};

pub struct AuditOrchestrator {
    config: AuditConfig,
    resolver: CanonicalResolver,
    classifier: AnomalyClassifier,
}

impl AuditOrchestrator {
    pub fn new<I, S>(master: I, config: AuditConfig) -> AuditResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let resolver = CanonicalResolver::new(master, &config)?;
        let classifier = AnomalyClassifier::from_config(&config);

        Ok(AuditOrchestrator {
            config,
            resolver,
            classifier,
        })
    }

    pub fn resolver(&self) -> &CanonicalResolver {
        &self.resolver
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Resolve only the labels that are not exact master members
    pub fn resolve_suspects<S: AsRef<str>>(&self, labels: &[S]) -> Vec<ResolutionRecord> {
        let suspects = self.resolver.suspects(labels);
        info!(
            labels = labels.len(),
            suspects = suspects.len(),
            "attempting resolution of suspects"
        );
        self.resolver.resolve_batch(&suspects)
    }

    pub fn classify(&self, aggregates: &[EntityAggregate]) -> AuditResult<Vec<ClassificationRecord>> {
        let features = derive_all(aggregates)?;
        self.classifier.classify_population(&features)
    }

    /// Full run. Fails only on invalid aggregates, before anything is reported.
    pub fn run<S: AsRef<str>>(
        &self,
        dirty_labels: &[S],
        aggregates: &[EntityAggregate],
    ) -> AuditResult<AuditReport> {
        let classifications = self.classify(aggregates)?;
        let resolutions = self.resolve_suspects(dirty_labels);

        let resolution_summary = ResolutionSummary::from_records(&resolutions);
        let classification_summary = ClassificationSummary::from_records(&classifications);

        info!("{}", resolution_summary.summary());
        info!("{}", classification_summary.summary());
        if resolution_summary.healed_count > 0 {
            warn!(
                healed = resolution_summary.healed_count,
                "naming anomalies found: activity was split across spellings"
            );
        }

        Ok(AuditReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            engine_version: crate::VERSION.to_string(),
            config: self.config.clone(),
            master_fingerprint: master_fingerprint(self.resolver.canonical_names()),
            master_size: self.resolver.len(),
            regions: summarize_regions(&classifications),
            resolutions,
            resolution_summary,
            classifications,
            classification_summary,
        })
    }
}
