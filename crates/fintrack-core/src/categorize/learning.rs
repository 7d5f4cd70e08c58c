//! Learning write-back for resolved categories

use serde::Serialize;
use tracing::{debug, warn};

use super::CategoryStore;
use crate::models::LearningConfidence;

/// What a learning write-back did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum LearnOutcome {
    /// New mapping row seeded from the confidence
    Created { mapping_id: i64 },
    /// Existing row had its usage incremented
    Reinforced { mapping_id: i64 },
}

/// Record a (merchant, category) association
///
/// Never fails: store errors are logged and `None` is returned.
pub fn record_mapping<S: CategoryStore + ?Sized>(
    store: &S,
    merchant_name: &str,
    app_category: &str,
    confidence: LearningConfidence,
) -> Option<LearnOutcome> {
    match store.record_learned_mapping(merchant_name, app_category, confidence) {
        Ok(outcome) => {
            debug!(
                merchant = merchant_name,
                category = app_category,
                confidence = %confidence,
                ?outcome,
                "Recorded learned merchant mapping"
            );
            Some(outcome)
        }
        Err(e) => {
            warn!(
                merchant = merchant_name,
                category = app_category,
                error = %e,
                "Failed to record learned merchant mapping"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorize::memory_store::MemoryStore;

    #[test]
    fn test_first_write_seeds_priority_from_confidence() {
        let store = MemoryStore::default();

        let outcome = record_mapping(&store, "Starbucks", "Coffee Shops", LearningConfidence::Exact);
        assert!(matches!(outcome, Some(LearnOutcome::Created { .. })));
        record_mapping(&store, "Costco", "Groceries", LearningConfidence::Pattern);
        record_mapping(&store, "Esso", "Gas", LearningConfidence::Fallback);

        let rows = store.mappings();
        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].priority, rows[0].usage_count), (10, 1));
        assert_eq!((rows[1].priority, rows[1].usage_count), (5, 1));
        assert_eq!((rows[2].priority, rows[2].usage_count), (1, 1));
    }

    #[test]
    fn test_repeat_write_is_idempotent_on_rows() {
        let store = MemoryStore::default();

        record_mapping(&store, "Starbucks", "Coffee Shops", LearningConfidence::Fallback);
        let second = record_mapping(&store, "Starbucks", "Coffee Shops", LearningConfidence::Exact);

        assert!(matches!(second, Some(LearnOutcome::Reinforced { .. })));
        let rows = store.mappings();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].usage_count, 2);
        // Priority stays at its seeded value
        assert_eq!(rows[0].priority, 1);
        assert!(rows[0].last_used.is_some());
    }

    #[test]
    fn test_store_failure_is_swallowed() {
        let store = MemoryStore::failing_writes();
        let outcome = record_mapping(&store, "Starbucks", "Coffee Shops", LearningConfidence::Exact);
        assert!(outcome.is_none());
        assert!(store.mappings().is_empty());
    }
}
