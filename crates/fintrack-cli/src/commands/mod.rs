//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Database init and shared utilities (open_db, filter config)
//! - `categorize` - One-off category resolution
//! - `categories` - Raw and structured category mappings
//! - `ingest` - Bank transaction ingestion
//! - `mappings` - Merchant mapping management
//! - `merchant_rules` - Merchant category rules
//! - `recurring` - Recurring rules and patterns
//! - `serve` - REST API server

pub mod categories;
pub mod categorize;
pub mod core;
pub mod ingest;
pub mod mappings;
pub mod merchant_rules;
pub mod recurring;
pub mod serve;

pub use categories::*;
pub use categorize::*;
pub use core::*;
pub use ingest::*;
pub use mappings::*;
pub use merchant_rules::*;
pub use recurring::*;
pub use serve::*;

/// List the transactions a rule pass could not update
pub fn print_rule_errors(report: &fintrack_core::models::RuleApplyReport) {
    if report.errors.is_empty() {
        return;
    }
    println!();
    println!("⚠️  {} transactions failed:", report.errors.len());
    for err in &report.errors {
        println!("   #{:<6} │ {}", err.transaction_id, truncate(&err.error, 60));
    }
}

/// Truncate a string to at most `max` characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
