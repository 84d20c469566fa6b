// 🧭 Canonical Entity Resolver - heal naming drift against a master set
//
// Problem solved:
// - "Visakhapatanam" in one stream, "Visakhapatnam" in another → same district
// - Without healing, the district shows zero activity in one stream (a false ghost)
//
// Resolution order:
// 1. Exact member of the master set → Valid (1.0)
// 2. Cached result → returned unchanged
// 3. Best fuzzy candidate at or above the acceptance threshold → Healed
// 4. Nothing acceptable → Ghost (reported, never guessed)

use crate::config::AuditConfig;
use crate::error::{AuditError, AuditResult};
use crate::similarity::ScoringMethod;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

// ============================================================================
// RESOLUTION STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionStatus {
    /// Label is an exact member of the master set
    Valid,

    /// Label differs slightly and was mapped to a canonical name
    Healed,

    /// No canonical name is close enough
    Ghost,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::Valid => "Valid",
            ResolutionStatus::Healed => "Healed",
            ResolutionStatus::Ghost => "Ghost",
        }
    }
}

// ============================================================================
// RESOLUTION RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub input_label: String,

    /// Canonical name (None for Ghost)
    pub resolved_name: Option<String>,

    /// Similarity against the resolved name (1.0 Valid, 0.0 Ghost)
    pub confidence: f64,

    pub status: ResolutionStatus,
}

impl ResolutionRecord {
    fn valid(label: &str) -> Self {
        ResolutionRecord {
            input_label: label.to_string(),
            resolved_name: Some(label.to_string()),
            confidence: 1.0,
            status: ResolutionStatus::Valid,
        }
    }

    fn healed(label: &str, canonical: &str, confidence: f64) -> Self {
        ResolutionRecord {
            input_label: label.to_string(),
            resolved_name: Some(canonical.to_string()),
            confidence,
            status: ResolutionStatus::Healed,
        }
    }

    fn ghost(label: &str) -> Self {
        ResolutionRecord {
            input_label: label.to_string(),
            resolved_name: None,
            confidence: 0.0,
            status: ResolutionStatus::Ghost,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == ResolutionStatus::Valid
    }

    pub fn is_healed(&self) -> bool {
        self.status == ResolutionStatus::Healed
    }

    pub fn is_ghost(&self) -> bool {
        self.status == ResolutionStatus::Ghost
    }
}

// ============================================================================
// CANONICAL RESOLVER
// ============================================================================

/// Resolver over an immutable master set.
///
/// The cache is owned by this instance and guarded by an RwLock, so a resolver
/// can be shared across threads behind an `Arc`. Concurrent misses on the same
/// label may both search; the first completed record is the one kept.
pub struct CanonicalResolver {
    /// Exact-membership index
    canonical: HashSet<String>,

    /// Same names, sorted; fixes candidate iteration order
    ordered: Vec<String>,

    acceptance_threshold: f64,

    scoring_method: ScoringMethod,

    /// input label → resolution (Healed and Ghost only)
    cache: RwLock<HashMap<String, ResolutionRecord>>,

    /// Number of fuzzy searches actually run
    searches: AtomicU64,
}

impl CanonicalResolver {
    /// Build a resolver; an empty master set is rejected
    pub fn new<I, S>(names: I, config: &AuditConfig) -> AuditResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        config.validate()?;

        let ordered: Vec<String> = names
            .into_iter()
            .map(Into::into)
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect();

        if ordered.is_empty() {
            return Err(AuditError::EmptyMasterSet);
        }

        Ok(CanonicalResolver {
            canonical: ordered.iter().cloned().collect(),
            ordered,
            acceptance_threshold: config.acceptance_threshold,
            scoring_method: config.scoring_method,
            cache: RwLock::new(HashMap::new()),
            searches: AtomicU64::new(0),
        })
    }

    /// Resolve one label. Never fails: unresolvable labels come back as Ghost.
    pub fn resolve(&self, input_label: &str) -> ResolutionRecord {
        if self.canonical.contains(input_label) {
            return ResolutionRecord::valid(input_label);
        }

        if let Some(hit) = self.read_cache().get(input_label) {
            return hit.clone();
        }

        let record = self.search(input_label);

        self.write_cache()
            .entry(input_label.to_string())
            .or_insert(record)
            .clone()
    }

    /// Resolve labels in order, one record per input
    pub fn resolve_batch<S: AsRef<str>>(&self, labels: &[S]) -> Vec<ResolutionRecord> {
        labels.iter().map(|l| self.resolve(l.as_ref())).collect()
    }

    /// Unique labels that are not exact members, sorted
    pub fn suspects<S: AsRef<str>>(&self, labels: &[S]) -> Vec<String> {
        labels
            .iter()
            .map(|l| l.as_ref())
            .filter(|l| !self.contains(l))
            .map(str::to_string)
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.canonical.contains(label)
    }

    /// Canonical names in sorted order
    pub fn canonical_names(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn acceptance_threshold(&self) -> f64 {
        self.acceptance_threshold
    }

    pub fn scoring_method(&self) -> ScoringMethod {
        self.scoring_method
    }

    pub fn cache_len(&self) -> usize {
        self.read_cache().len()
    }

    pub fn searches_performed(&self) -> u64 {
        self.searches.load(Ordering::Relaxed)
    }

    /// Fuzzy search over the master set.
    ///
    /// Candidates are ranked by score(candidate, input); the reported confidence is
    /// score(input, candidate). A candidate is only accepted when BOTH clear the
    /// threshold, so a Healed confidence never sits below it.
    fn search(&self, input_label: &str) -> ResolutionRecord {
        self.searches.fetch_add(1, Ordering::Relaxed);

        let threshold = self.acceptance_threshold;
        let method = self.scoring_method;

        let mut candidates: Vec<(f64, &str)> = self
            .ordered
            .iter()
            .filter(|name| method.upper_bound(name, input_label) >= threshold)
            .map(|name| (method.score(name, input_label), name.as_str()))
            .filter(|(score, _)| *score >= threshold)
            .collect();

        // Best score first; equal scores go to the greater name
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| b.1.cmp(a.1)));

        for (selection_score, name) in candidates {
            let confidence = method.score(input_label, name);
            if confidence >= threshold {
                debug!(
                    label = input_label,
                    canonical = name,
                    confidence,
                    "healed naming drift"
                );
                return ResolutionRecord::healed(input_label, name, confidence);
            }

            debug!(
                label = input_label,
                canonical = name,
                selection_score,
                confidence,
                "candidate skipped: confidence below threshold"
            );
        }

        debug!(label = input_label, "no canonical match");
        ResolutionRecord::ghost(input_label)
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, HashMap<String, ResolutionRecord>> {
        // Entries are only ever inserted whole, so a poisoned map is still consistent
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<String, ResolutionRecord>> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn resolver(names: &[&str]) -> CanonicalResolver {
        CanonicalResolver::new(names.iter().copied(), &AuditConfig::default()).unwrap()
    }

    #[test]
    fn test_exact_member_is_valid() {
        let r = resolver(&["Mumbai", "Delhi"]);
        let record = r.resolve("Mumbai");

        assert_eq!(record.resolved_name.as_deref(), Some("Mumbai"));
        assert_eq!(record.confidence, 1.0);
        assert_eq!(record.status, ResolutionStatus::Valid);
        assert_eq!(r.searches_performed(), 0);
        assert_eq!(r.cache_len(), 0);
    }

    #[test]
    fn test_every_member_resolves_valid() {
        let names = ["Mumbai", "Delhi", "Pune", "Thane", "Nagpur"];
        let r = resolver(&names);
        for name in names {
            let record = r.resolve(name);
            assert!(record.is_valid());
            assert_eq!(record.confidence, 1.0);
        }
    }

    #[test]
    fn test_typo_is_healed() {
        let r = resolver(&["Visakhapatnam"]);
        let record = r.resolve("Visakhapatanam");

        assert_eq!(record.status, ResolutionStatus::Healed);
        assert_eq!(record.resolved_name.as_deref(), Some("Visakhapatnam"));
        assert!(record.confidence >= 0.8);
        assert!(record.confidence < 1.0);
    }

    #[test]
    fn test_unmatched_label_is_ghost() {
        let r = resolver(&["Chennai"]);
        let record = r.resolve("Zzyzyx");

        assert_eq!(record.status, ResolutionStatus::Ghost);
        assert_eq!(record.resolved_name, None);
        assert_eq!(record.confidence, 0.0);
    }

    #[test]
    fn test_empty_master_set_rejected() {
        let names: Vec<String> = Vec::new();
        let result = CanonicalResolver::new(names, &AuditConfig::default());
        assert!(matches!(result, Err(AuditError::EmptyMasterSet)));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let config = AuditConfig::new(-0.1, 1000);
        assert!(matches!(
            CanonicalResolver::new(["Pune"], &config),
            Err(AuditError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_second_resolve_hits_cache() {
        let r = resolver(&["Visakhapatnam", "Vizianagaram"]);

        let first = r.resolve("Visakhapatanam");
        assert_eq!(r.searches_performed(), 1);

        let second = r.resolve("Visakhapatanam");
        assert_eq!(first, second);
        assert_eq!(r.searches_performed(), 1);
        assert_eq!(r.cache_len(), 1);
    }

    #[test]
    fn test_ghost_result_is_cached() {
        let r = resolver(&["Chennai"]);

        let first = r.resolve("Zzyzyx");
        let second = r.resolve("Zzyzyx");

        assert_eq!(first, second);
        assert_eq!(r.searches_performed(), 1);
    }

    #[test]
    fn test_best_candidate_wins() {
        let r = resolver(&["Bangalore Rural", "Bangalore Urban", "Belgaum"]);
        let record = r.resolve("Bangalore Urbn");

        assert!(record.is_healed());
        assert_eq!(record.resolved_name.as_deref(), Some("Bangalore Urban"));
    }

    #[test]
    fn test_equal_scores_resolve_to_greater_name() {
        // "Xatna" shares "atna" with both names → 0.8 each
        let r = resolver(&["Patna", "Batna"]);
        let record = r.resolve("Xatna");

        assert!(record.is_healed());
        assert_eq!(record.resolved_name.as_deref(), Some("Patna"));
        assert_eq!(record.confidence, 0.8);
    }

    fn resolver_at(names: &[&str], threshold: f64) -> CanonicalResolver {
        CanonicalResolver::new(names.iter().copied(), &AuditConfig::new(threshold, 1000)).unwrap()
    }

    #[test]
    fn test_candidate_skipped_when_confidence_below_threshold() {
        // ranked by ratio("diet", "tide") = 0.5, reported ratio("tide", "diet") = 0.25
        let r = resolver_at(&["diet"], 0.5);
        let record = r.resolve("tide");

        assert!(record.is_ghost());
        assert_eq!(record.resolved_name, None);
        assert_eq!(record.confidence, 0.0);
    }

    #[test]
    fn test_next_candidate_accepted_after_skip() {
        // "diet" ranks first (0.5) but reports 0.25; "tiabc" ranks second at 4/9 both ways
        let r = resolver_at(&["diet", "tiabc"], 0.4);
        let record = r.resolve("tide");

        assert!(record.is_healed());
        assert_eq!(record.resolved_name.as_deref(), Some("tiabc"));
        assert!((record.confidence - 4.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_determinism_across_instances() {
        let labels = ["Gurgaon", "Gurugram", "Mysore", "Mysuru", "Ahmadnagar", "Zzyzyx"];
        let master = ["Gurugram", "Mysuru", "Ahmednagar", "Pune"];

        let a = resolver(&master).resolve_batch(&labels);
        let b = resolver(&master).resolve_batch(&labels);
        assert_eq!(a, b);
    }

    #[test]
    fn test_healed_confidence_never_below_threshold() {
        let master = ["Ahmednagar", "Aurangabad", "Bengaluru Urban", "Gurugram", "Mysuru"];
        let labels = ["Ahmadnagar", "Aurangabad ", "Bengaluru", "Gurgaon", "Mysore", "Auranagabad"];

        for threshold in [0.5, 0.6, 0.7, 0.8, 0.9] {
            let config = AuditConfig::new(threshold, 1000);
            let r = CanonicalResolver::new(master, &config).unwrap();
            for record in r.resolve_batch(&labels) {
                if record.is_healed() {
                    assert!(record.confidence >= threshold, "{:?}", record);
                    assert!(r.contains(record.resolved_name.as_deref().unwrap()));
                }
            }
        }
    }

    #[test]
    fn test_suspects_are_unique_non_members() {
        let r = resolver(&["Mumbai", "Delhi"]);
        let labels = ["Delhi", "Mumbay", "Mumbay", "New Delhi", "Mumbai"];

        assert_eq!(r.suspects(&labels), vec!["Mumbay".to_string(), "New Delhi".to_string()]);
    }

    #[test]
    fn test_duplicate_master_names_collapse() {
        let r = resolver(&["Pune", "Pune", "Delhi"]);
        assert_eq!(r.len(), 2);
        assert_eq!(r.canonical_names().collect::<Vec<_>>(), vec!["Delhi", "Pune"]);
    }

    #[test]
    fn test_alternative_scoring_method() {
        let config = AuditConfig::default().with_scoring_method(ScoringMethod::JaroWinkler);
        let r = CanonicalResolver::new(["Visakhapatnam"], &config).unwrap();

        let record = r.resolve("Visakhapatanam");
        assert!(record.is_healed());
        assert!(record.confidence >= 0.8);
    }

    #[test]
    fn test_concurrent_resolution_is_consistent() {
        let r = Arc::new(resolver(&["Visakhapatnam", "Vijayawada", "Guntur", "Chennai"]));
        let labels = ["Visakhapatanam", "Vijaywada", "Gunturu", "Zzyzyx"];

        let expected = resolver(&["Visakhapatnam", "Vijayawada", "Guntur", "Chennai"])
            .resolve_batch(&labels);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let r = Arc::clone(&r);
                thread::spawn(move || r.resolve_batch(&labels))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }

        assert_eq!(r.cache_len(), labels.len());
        // At most one search per label per thread; usually exactly one per label
        assert!(r.searches_performed() >= labels.len() as u64);
        assert!(r.searches_performed() <= 8 * labels.len() as u64);
    }
}
