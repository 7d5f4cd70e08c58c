//! Fintrack Core Library
//!
//! Shared functionality for the fintrack personal finance backend:
//! - Database access and migrations
//! - Tiered transaction categorization with learned merchant mappings
//! - Recurring pattern detection and recurring rules
//! - Merchant category rules and bulk mapping operations
//! - Bank transaction ingestion with date filtering

pub mod bulk;
pub mod categorize;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod merchant_rules;
pub mod models;
pub mod recurring;

pub use bulk::{
    bulk_assign, bulk_create_mappings, BulkAssignReport, BulkAssignRequest, BulkCreateReport,
};
pub use categorize::{
    CategoryEffect, CategoryInput, CategoryResolver, CategoryStore, Resolution, ResolutionSource,
    DEFAULT_CATEGORY,
};
pub use config::{TransactionFilterConfig, TransactionFilterUpdate};
pub use db::{AuditEntry, Database, TransactionQuery};
pub use error::{Error, Result};
pub use ingest::{parse_bank_transactions, BankTransaction, IngestReport, Ingestor};
pub use recurring::{apply_rules, classify_cadence, detect_patterns};
