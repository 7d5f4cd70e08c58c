//! Recurring rule and pattern commands

use anyhow::Result;
use fintrack_core::models::{MatchType, NewRecurringRule, RecurrencePattern};
use fintrack_core::Database;

use super::{print_rule_errors, truncate};

pub fn cmd_recurring_rules(db: &Database) -> Result<()> {
    let rules = db.list_recurring_rules()?;

    if rules.is_empty() {
        println!("No recurring rules. Add one with:");
        println!("  fintrack recurring add-rule netflix --match-type contains --pattern monthly");
        return Ok(());
    }

    println!();
    println!("🔁 Recurring Rules");
    println!("   ─────────────────────────────────────────────────────────────");

    for rule in rules {
        println!(
            "   #{:<4} │ {:<8} │ {:<30} │ {}{}",
            rule.id,
            rule.match_type.as_str(),
            truncate(&rule.merchant, 30),
            rule.recurrence_pattern
                .map(|p| p.as_str())
                .unwrap_or("-"),
            if rule.active { "" } else { " (inactive)" }
        );
    }

    Ok(())
}

pub fn cmd_recurring_add_rule(
    db: &Database,
    merchant: &str,
    match_type_str: &str,
    pattern: Option<&str>,
) -> Result<()> {
    let match_type: MatchType = match_type_str
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{} (valid types: exact, contains, regex)", e))?;
    let recurrence_pattern = pattern
        .map(str::parse::<RecurrencePattern>)
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    let rule = db.create_recurring_rule(&NewRecurringRule {
        merchant: merchant.to_string(),
        match_type,
        recurrence_pattern,
    })?;

    println!(
        "✅ Created recurring rule #{}: {} ({})",
        rule.id, rule.merchant, rule.match_type
    );

    Ok(())
}

pub fn cmd_recurring_delete_rule(db: &Database, id: i64) -> Result<()> {
    db.delete_recurring_rule(id)?;
    println!("✅ Deleted recurring rule #{}", id);

    Ok(())
}

pub fn cmd_recurring_patterns(db: &Database) -> Result<()> {
    let patterns = db.recurring_patterns()?;

    if patterns.is_empty() {
        println!("No recurring transactions yet. Flag some with:");
        println!("  fintrack recurring apply");
        return Ok(());
    }

    println!();
    println!("📅 Recurring Patterns");
    println!("   ─────────────────────────────────────────────────────────────");

    for p in patterns {
        println!(
            "   {:<28} │ {:<8} │ every ~{} days │ {} charges │ avg ${:.2}",
            truncate(&p.merchant, 28),
            p.pattern.as_str(),
            p.avg_interval_days,
            p.transaction_count,
            p.avg_amount
        );
    }

    Ok(())
}

pub fn cmd_recurring_apply(db: &Database) -> Result<()> {
    let report = db.apply_recurring_rules()?;
    println!("✅ Flagged {} transactions as recurring", report.updated);
    print_rule_errors(&report);

    Ok(())
}
