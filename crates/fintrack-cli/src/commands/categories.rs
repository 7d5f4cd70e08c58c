//! Category mapping commands

use anyhow::Result;
use fintrack_core::models::NewCategoryMapping;
use fintrack_core::Database;

use super::truncate;

pub fn cmd_categories_list(db: &Database) -> Result<()> {
    let mappings = db.list_category_mappings()?;

    if mappings.is_empty() {
        println!("No category mappings. Built-in raw categories still apply.");
        return Ok(());
    }

    println!();
    println!("🗺️  Category Mappings");
    println!("   ─────────────────────────────────────────────────────────────");

    for m in mappings {
        let source = match (
            m.plaid_category.as_deref(),
            m.personal_finance_primary.as_deref(),
            m.personal_finance_detailed.as_deref(),
        ) {
            (Some(raw), _, _) => raw.to_string(),
            (None, primary, detailed) => format!(
                "{} / {}",
                primary.unwrap_or("*"),
                detailed.unwrap_or("*")
            ),
        };
        println!(
            "   #{:<4} │ {:<40} │ {}{}",
            m.id,
            truncate(&source, 40),
            m.app_category,
            if m.is_active { "" } else { " (inactive)" }
        );
    }

    Ok(())
}

/// Raw categories are upserted; structured codes create a new override row
pub fn cmd_categories_set(
    db: &Database,
    category: &str,
    raw: Option<&str>,
    primary: Option<&str>,
    detailed: Option<&str>,
) -> Result<()> {
    let mapping = match (raw, primary, detailed) {
        (Some(raw), None, None) => db.upsert_plaid_category_mapping(raw, category)?,
        (None, None, None) => {
            anyhow::bail!("Specify --raw, or --primary and/or --detailed")
        }
        _ => db.create_category_mapping(&NewCategoryMapping {
            plaid_category: raw.map(String::from),
            personal_finance_primary: primary.map(String::from),
            personal_finance_detailed: detailed.map(String::from),
            app_category: category.to_string(),
            description: None,
        })?,
    };

    println!(
        "✅ Category mapping #{} -> {}",
        mapping.id, mapping.app_category
    );

    Ok(())
}

pub fn cmd_categories_delete(db: &Database, raw: &str) -> Result<()> {
    let deleted = db.delete_category_mapping_by_plaid(raw)?;
    if deleted == 0 {
        println!("No mapping for raw category \"{}\"", raw);
    } else {
        println!("✅ Deleted {} mapping(s) for \"{}\"", deleted, raw);
    }

    Ok(())
}

pub fn cmd_categories_backfill(db: &Database) -> Result<()> {
    let updated = db.backfill_categories()?;
    println!("✅ Backfilled {} transactions", updated);

    Ok(())
}

pub fn cmd_categories_stats(db: &Database) -> Result<()> {
    let stats = db.category_stats()?;

    println!();
    println!("📊 Category Statistics");
    println!("   ─────────────────────────────");
    println!("   Category mappings: {}", stats.total_mappings);
    println!(
        "   Categorized: {} of {} ({:.2}%)",
        stats.categorized_transactions, stats.total_transactions, stats.categorization_rate
    );

    if !stats.category_distribution.is_empty() {
        println!();
        for d in &stats.category_distribution {
            println!(
                "   {:<28} {:>6} │ ${:.2}",
                truncate(&d.category, 28),
                d.count,
                d.total_amount
            );
        }
    }

    Ok(())
}
