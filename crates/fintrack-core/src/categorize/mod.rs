//! Transaction categorization
//!
//! Resolution order (first success wins):
//! 1. Merchant mapping store (exact name, then regex pattern)
//! 2. Admin-curated structured category override (detailed, then primary)
//! 3. Built-in raw category table
//! 4. Merchant keyword rules
//!
//! Resolution only reads from the store and returns the writes it wants
//! (usage bumps, learned mappings) as effects; `CategoryResolver::apply`
//! performs them.

mod keywords;
mod learning;
mod matcher;
mod pipeline;
mod static_table;

#[cfg(test)]
pub(crate) mod memory_store;

pub use keywords::{match_keywords, resolve_merchant_keywords, KEYWORD_RULES};
pub use learning::{record_mapping, LearnOutcome};
pub use matcher::{compile_pattern, match_mapping, select_exact, select_pattern};
pub use pipeline::{CategoryEffect, CategoryInput, CategoryResolver, Resolution, ResolutionSource};
pub use static_table::{
    app_categories, lookup_raw_category, raw_categories_for, resolve_raw_category, CATEGORY_TABLE,
};

use crate::error::Result;
use crate::models::{LearningConfidence, MerchantMapping};

/// Category used when nothing else applies
pub const DEFAULT_CATEGORY: &str = "Miscellaneous";

/// Persistence operations the categorization pipeline needs
pub trait CategoryStore {
    /// Active mappings whose merchant name equals `merchant_name` (ASCII case-insensitive)
    fn exact_mapping_candidates(&self, merchant_name: &str) -> Result<Vec<MerchantMapping>>;

    /// Active mappings carrying a non-empty pattern
    fn pattern_mapping_candidates(&self) -> Result<Vec<MerchantMapping>>;

    /// Admin override for a structured category: detailed code first, then primary-only rows
    fn structured_override(
        &self,
        primary: Option<&str>,
        detailed: Option<&str>,
    ) -> Result<Option<String>>;

    /// Increment usage and refresh last_used for a matched mapping
    fn record_mapping_usage(&self, mapping_id: i64) -> Result<()>;

    /// Reinforce an existing (merchant, category) mapping or create one seeded by confidence
    fn record_learned_mapping(
        &self,
        merchant_name: &str,
        app_category: &str,
        confidence: LearningConfidence,
    ) -> Result<LearnOutcome>;
}
