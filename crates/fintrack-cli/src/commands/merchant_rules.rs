//! Merchant category rule commands

use anyhow::Result;
use fintrack_core::models::NewMerchantCategoryRule;
use fintrack_core::Database;

use super::{print_rule_errors, truncate};

pub fn cmd_merchant_rules_list(db: &Database) -> Result<()> {
    let rules = db.list_merchant_rules()?;

    if rules.is_empty() {
        println!("No merchant rules. Add one with:");
        println!("  fintrack merchant-rules add \"^uber\" \"Taxi & Ride Shares\"");
        return Ok(());
    }

    println!();
    println!("📏 Merchant Rules");
    println!("   ─────────────────────────────────────────────────────────────");

    for rule in rules {
        println!(
            "   #{:<4} │ {:<5} │ {:<30} │ {}{}",
            rule.id,
            if rule.exact_match { "exact" } else { "regex" },
            truncate(&rule.merchant_pattern, 30),
            rule.category,
            if rule.is_active { "" } else { " (inactive)" }
        );
    }

    Ok(())
}

pub fn cmd_merchant_rules_add(
    db: &Database,
    pattern: &str,
    category: &str,
    exact: bool,
) -> Result<()> {
    let rule = db.create_merchant_rule(&NewMerchantCategoryRule {
        merchant_pattern: pattern.to_string(),
        category: category.to_string(),
        exact_match: exact,
    })?;

    println!(
        "✅ Created merchant rule #{}: {} -> {}",
        rule.id, rule.merchant_pattern, rule.category
    );

    Ok(())
}

pub fn cmd_merchant_rules_delete(db: &Database, id: i64) -> Result<()> {
    db.delete_merchant_rule(id)?;
    println!("✅ Deleted merchant rule #{}", id);

    Ok(())
}

pub fn cmd_merchant_rules_apply(db: &Database) -> Result<()> {
    let report = db.apply_merchant_rules()?;
    println!("✅ Recategorized {} transactions", report.updated);
    print_rule_errors(&report);

    Ok(())
}
