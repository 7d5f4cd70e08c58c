//! Bulk mapping operations
//!
//! Items are processed one at a time and failures are collected per item,
//! so a partial failure never discards work already done. Re-running a bulk
//! call with the same input is safe.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{MerchantMapping, NewMerchantMapping};

/// Priority given to bulk-assigned mappings when none is requested
pub const DEFAULT_BULK_PRIORITY: i64 = 5;

/// One failed item of a bulk create
#[derive(Debug, Clone, Serialize)]
pub struct BulkItemError {
    pub mapping: NewMerchantMapping,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkCreateSummary {
    pub total_requested: usize,
    pub created: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkCreateReport {
    pub created: Vec<MerchantMapping>,
    pub errors: Vec<BulkItemError>,
    pub summary: BulkCreateSummary,
}

/// Create each mapping independently
pub fn bulk_create_mappings(db: &Database, items: &[NewMerchantMapping]) -> Result<BulkCreateReport> {
    if items.is_empty() {
        return Err(Error::InvalidData("mappings must be a non-empty array".into()));
    }

    let mut report = BulkCreateReport {
        summary: BulkCreateSummary {
            total_requested: items.len(),
            ..Default::default()
        },
        ..Default::default()
    };

    for item in items {
        if item.merchant_name.trim().is_empty() || item.app_category.trim().is_empty() {
            report.errors.push(BulkItemError {
                mapping: item.clone(),
                error: "Missing required fields".into(),
            });
            continue;
        }

        match db.create_merchant_mapping(item) {
            Ok(mapping) => report.created.push(mapping),
            Err(Error::Conflict(_)) => report.errors.push(BulkItemError {
                mapping: item.clone(),
                error: "Mapping already exists".into(),
            }),
            Err(e) => {
                warn!(merchant = %item.merchant_name, error = %e, "Bulk create item failed");
                report.errors.push(BulkItemError {
                    mapping: item.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    report.summary.created = report.created.len();
    report.summary.failed = report.errors.len();
    info!(
        requested = report.summary.total_requested,
        created = report.summary.created,
        failed = report.summary.failed,
        "Bulk mapping create finished"
    );
    Ok(report)
}

/// Bulk assign request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkAssignRequest {
    /// Comma-separated merchant name fragments
    pub partial_names: String,
    pub app_category: String,
    pub priority: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Created,
    Updated,
    Error,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Error => "error",
        }
    }
}

/// Outcome for one merchant of a bulk assign
#[derive(Debug, Clone, Serialize)]
pub struct BulkAssignDetail {
    pub merchant_name: String,
    pub action: BulkAction,
    pub mapping_id: Option<i64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkAssignReport {
    pub mappings_created: usize,
    pub mappings_updated: usize,
    pub total_affected: usize,
    pub transactions_updated: usize,
    /// Set when the final transaction recategorization failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions_error: Option<String>,
    pub details: Vec<BulkAssignDetail>,
}

/// Split "a, b,,c" into ["a", "b", "c"]
pub fn split_partial_names(partial_names: &str) -> Vec<String> {
    partial_names
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Point every merchant containing any fragment at one category
///
/// Merchants come from transaction details and existing mapping names.
/// Each gets its mapping created or refreshed, then matching transactions
/// are recategorized once.
pub fn bulk_assign(db: &Database, request: &BulkAssignRequest) -> Result<BulkAssignReport> {
    let parts = split_partial_names(&request.partial_names);
    let category = request.app_category.trim();
    if parts.is_empty() || category.is_empty() {
        return Err(Error::InvalidData(
            "partial_names and app_category are required".into(),
        ));
    }
    let priority = request.priority.unwrap_or(DEFAULT_BULK_PRIORITY);
    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());
    let default_description = format!("Bulk assigned - contains any of: {}", parts.join(", "));

    // Case-insensitive dedup; first spelling wins
    let mut seen = BTreeSet::new();
    let mut merchants = Vec::new();
    let lowered: Vec<String> = parts.iter().map(|p| p.to_lowercase()).collect();
    let from_mappings = db
        .list_merchant_mappings(&Default::default())?
        .into_iter()
        .map(|m| m.merchant_name)
        .filter(|name| {
            let name = name.to_lowercase();
            lowered.iter().any(|p| name.contains(p.as_str()))
        });
    for name in db.distinct_details_containing(&parts)?.into_iter().chain(from_mappings) {
        if seen.insert(name.to_lowercase()) {
            merchants.push(name);
        }
    }

    let mut report = BulkAssignReport::default();
    for merchant in merchants {
        let outcome = match db.find_merchant_mapping(&merchant, category) {
            Ok(Some(existing)) => db
                .refresh_bulk_mapping(existing.id, priority, description)
                .map(|_| (BulkAction::Updated, existing.id)),
            Ok(None) => db
                .insert_bulk_mapping(
                    &merchant,
                    category,
                    priority,
                    description.unwrap_or(default_description.as_str()),
                )
                .map(|id| (BulkAction::Created, id)),
            Err(e) => Err(e),
        };

        let detail = match outcome {
            Ok((action, id)) => {
                match action {
                    BulkAction::Created => report.mappings_created += 1,
                    _ => report.mappings_updated += 1,
                }
                BulkAssignDetail {
                    merchant_name: merchant,
                    action,
                    mapping_id: Some(id),
                    error: None,
                }
            }
            Err(e) => {
                warn!(merchant = %merchant, error = %e, "Bulk assign item failed");
                BulkAssignDetail {
                    merchant_name: merchant,
                    action: BulkAction::Error,
                    mapping_id: None,
                    error: Some(e.to_string()),
                }
            }
        };
        report.details.push(detail);
    }

    report.total_affected = report.mappings_created + report.mappings_updated;
    match db.set_app_category_where_details_contain(&parts, category) {
        Ok(updated) => report.transactions_updated = updated,
        Err(e) => {
            warn!(category, error = %e, "Bulk assign could not recategorize transactions");
            report.transactions_error = Some(e.to_string());
        }
    }

    info!(
        category,
        created = report.mappings_created,
        updated = report.mappings_updated,
        transactions = report.transactions_updated,
        "Bulk assign finished"
    );
    Ok(report)
}
