//! Merchant mapping commands

use anyhow::Result;
use fintrack_core::models::{MerchantMappingFilter, NewMerchantMapping};
use fintrack_core::{bulk_assign, BulkAssignRequest, Database};

use super::truncate;

pub fn cmd_mappings_list(
    db: &Database,
    merchant: Option<&str>,
    category: Option<&str>,
    include_inactive: bool,
) -> Result<()> {
    let filter = MerchantMappingFilter {
        merchant_name: merchant.map(String::from),
        app_category: category.map(String::from),
        is_active: if include_inactive { None } else { Some(true) },
    };
    let mappings = db.list_merchant_mappings(&filter)?;

    if mappings.is_empty() {
        println!("No merchant mappings found. Add one with:");
        println!("  fintrack mappings add \"Starbucks\" \"Coffee Shops\"");
        return Ok(());
    }

    println!();
    println!("🗂️  Merchant Mappings");
    println!("   ─────────────────────────────────────────────────────────────");

    for m in mappings {
        let pattern = m
            .merchant_pattern
            .as_deref()
            .map(|p| format!(" /{}/", truncate(p, 20)))
            .unwrap_or_default();
        let inactive = if m.is_active { "" } else { " (inactive)" };
        println!(
            "   #{:<4} p{:<3} │ {:<28} │ {}{}{} │ used {}",
            m.id,
            m.priority,
            truncate(&m.merchant_name, 28),
            truncate(&m.app_category, 24),
            pattern,
            inactive,
            m.usage_count
        );
    }

    Ok(())
}

pub fn cmd_mappings_add(
    db: &Database,
    merchant: &str,
    category: &str,
    pattern: Option<&str>,
    priority: i64,
    description: Option<&str>,
) -> Result<()> {
    let mapping = db.create_merchant_mapping(&NewMerchantMapping {
        merchant_name: merchant.to_string(),
        merchant_pattern: pattern.map(String::from),
        app_category: category.to_string(),
        priority,
        description: description.map(String::from),
        created_by: Some("cli".to_string()),
    })?;

    println!(
        "✅ Created mapping #{}: {} -> {} (priority {})",
        mapping.id, mapping.merchant_name, mapping.app_category, mapping.priority
    );

    Ok(())
}

pub fn cmd_mappings_delete(db: &Database, id: i64) -> Result<()> {
    db.delete_merchant_mapping(id)?;
    println!("✅ Deleted mapping #{}", id);

    Ok(())
}

pub fn cmd_mappings_match(db: &Database, merchant: &str) -> Result<()> {
    let result = db.match_merchant(merchant)?;

    match result.mapping {
        Some(mapping) => {
            println!(
                "🔍 \"{}\" -> {} ({} match, mapping #{})",
                merchant, mapping.app_category, result.confidence, mapping.id
            );
        }
        None => println!("No mapping matches \"{}\"", merchant),
    }

    Ok(())
}

pub fn cmd_mappings_stats(db: &Database) -> Result<()> {
    let stats = db.mapping_stats()?;

    println!();
    println!("📊 Mapping Statistics");
    println!("   ─────────────────────────────");
    println!("   Total mappings: {}", stats.total_mappings);
    println!("   Active mappings: {}", stats.active_mappings);
    println!("   Total usage: {}", stats.total_usage);

    if !stats.top_categories.is_empty() {
        println!();
        println!("   Top categories:");
        for c in &stats.top_categories {
            println!(
                "   {:<28} {:>6} uses ({} mappings)",
                truncate(&c.app_category, 28),
                c.total_usage,
                c.mapping_count
            );
        }
    }
    if !stats.top_merchants.is_empty() {
        println!();
        println!("   Top merchants:");
        for m in &stats.top_merchants {
            println!(
                "   {:<28} {:>6} uses -> {}",
                truncate(&m.merchant_name, 28),
                m.usage_count,
                m.app_category
            );
        }
    }

    Ok(())
}

pub fn cmd_mappings_bulk_assign(
    db: &Database,
    names: &str,
    category: &str,
    priority: Option<i64>,
) -> Result<()> {
    let report = bulk_assign(
        db,
        &BulkAssignRequest {
            partial_names: names.to_string(),
            app_category: category.to_string(),
            priority,
            description: None,
        },
    )?;

    for detail in &report.details {
        match &detail.error {
            Some(err) => println!("   ❌ {}: {}", detail.merchant_name, err),
            None => println!(
                "   {} {}",
                detail.action.as_str(),
                detail.merchant_name
            ),
        }
    }
    println!(
        "✅ {} created, {} updated, {} transactions recategorized",
        report.mappings_created, report.mappings_updated, report.transactions_updated
    );

    Ok(())
}
