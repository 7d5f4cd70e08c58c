//! One-off category resolution

use anyhow::Result;
use fintrack_core::models::PersonalFinanceCategory;
use fintrack_core::{CategoryEffect, CategoryInput, CategoryResolver, Database};

/// Build pipeline input from command-line flags
pub fn category_input(
    merchant: Option<String>,
    name: Option<String>,
    primary: Option<String>,
    detailed: Option<String>,
    raw: Option<String>,
) -> CategoryInput {
    let personal_finance_category = if primary.is_some() || detailed.is_some() {
        Some(PersonalFinanceCategory { primary, detailed })
    } else {
        None
    };
    CategoryInput {
        merchant_name: merchant,
        name,
        personal_finance_category,
        category: raw.map(|r| vec![r]),
    }
}

pub fn cmd_categorize(db: &Database, input: &CategoryInput, dry_run: bool) -> Result<()> {
    let resolver = CategoryResolver::new(db);
    let resolution = if dry_run {
        resolver.resolve(input)?
    } else {
        resolver.categorize(input)?
    };

    println!();
    println!("🏷️  {}", resolution.category);
    println!("   Source: {}", resolution.source);
    if let Some(mapping) = resolution
        .mapping_match
        .as_ref()
        .and_then(|m| m.mapping.as_ref())
    {
        println!(
            "   Mapping: #{} {} (priority {}, used {} times)",
            mapping.id, mapping.merchant_name, mapping.priority, mapping.usage_count
        );
    }

    for effect in &resolution.effects {
        let verb = if dry_run { "Would" } else { "Did" };
        match effect {
            CategoryEffect::RecordUsage { mapping_id } => {
                println!("   {} record usage of mapping #{}", verb, mapping_id);
            }
            CategoryEffect::Learn {
                merchant_name,
                app_category,
                confidence,
            } => {
                println!(
                    "   {} learn {} -> {} ({})",
                    verb, merchant_name, app_category, confidence
                );
            }
        }
    }

    Ok(())
}
