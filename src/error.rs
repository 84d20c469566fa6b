// ⛔ Audit Errors - boundary-input violations
//
// Unresolvable labels, ghost districts and anomalies are RESULTS, not errors.
// Only malformed input at the entry of the core ends up here.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuditError {
    /// Resolver constructed without any canonical names
    #[error("Master set is empty: at least one canonical name is required")]
    EmptyMasterSet,

    /// Negative or non-finite totals handed to the deriver or classifier
    #[error("Invalid aggregate for {entity}: {field} = {value} (totals must be finite and non-negative)")]
    InvalidAggregate {
        entity: String,
        field: &'static str,
        value: f64,
    },

    /// Configuration value outside its domain
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
}

pub type AuditResult<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_aggregate_message_names_record() {
        let err = AuditError::InvalidAggregate {
            entity: "Andhra Pradesh/Guntur".to_string(),
            field: "update_total",
            value: -3.0,
        };

        let msg = err.to_string();
        assert!(msg.contains("Andhra Pradesh/Guntur"));
        assert!(msg.contains("update_total"));
        assert!(msg.contains("-3"));
    }

    #[test]
    fn test_empty_master_set_message() {
        assert!(AuditError::EmptyMasterSet.to_string().contains("empty"));
    }
}
