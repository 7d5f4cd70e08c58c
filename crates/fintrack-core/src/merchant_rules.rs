//! Merchant category rules: bulk and per-transaction retrocategorization

use regex::Regex;
use tracing::{info, warn};

use crate::categorize::compile_pattern;
use crate::db::Database;
use crate::error::Result;
use crate::models::{MerchantCategoryRule, RuleApplyReport, Transaction};

enum Matcher {
    Exact(String),
    Regex(Regex),
    /// Fallback for patterns that are not valid regexes
    Literal(String),
}

/// A merchant category rule ready for matching
pub struct CompiledMerchantRule<'a> {
    pub rule: &'a MerchantCategoryRule,
    matcher: Matcher,
}

impl<'a> CompiledMerchantRule<'a> {
    pub fn new(rule: &'a MerchantCategoryRule) -> Self {
        let pattern = rule.merchant_pattern.trim();
        let matcher = if rule.exact_match {
            Matcher::Exact(pattern.to_lowercase())
        } else {
            match compile_pattern(pattern) {
                Ok(re) => Matcher::Regex(re),
                Err(e) => {
                    warn!(
                        rule_id = rule.id,
                        pattern,
                        error = %e,
                        "Merchant rule pattern is not a valid regex, matching as text"
                    );
                    Matcher::Literal(pattern.to_lowercase())
                }
            }
        };
        Self { rule, matcher }
    }

    pub fn matches(&self, details: &str) -> bool {
        match &self.matcher {
            Matcher::Exact(text) => details.trim().to_lowercase() == *text,
            Matcher::Regex(re) => re.is_match(details),
            Matcher::Literal(text) => details.to_lowercase().contains(text.as_str()),
        }
    }
}

/// Active rules compiled in the order given
pub fn compile_rules(rules: &[MerchantCategoryRule]) -> Vec<CompiledMerchantRule<'_>> {
    rules
        .iter()
        .filter(|r| r.is_active)
        .map(CompiledMerchantRule::new)
        .collect()
}

/// Category from the first compiled rule matching `details`
pub fn first_match<'r>(rules: &'r [CompiledMerchantRule<'_>], details: &str) -> Option<&'r str> {
    rules
        .iter()
        .find(|r| r.matches(details))
        .map(|r| r.rule.category.as_str())
}

/// (transaction id, new app category) for every transaction a rule changes
pub fn plan_merchant_rules(
    rules: &[MerchantCategoryRule],
    transactions: &[Transaction],
) -> Vec<(i64, String)> {
    let compiled = compile_rules(rules);
    transactions
        .iter()
        .filter_map(|tx| {
            first_match(&compiled, &tx.details)
                .filter(|category| *category != tx.app_category)
                .map(|category| (tx.id, category.to_string()))
        })
        .collect()
}

impl Database {
    /// One-shot pass of all active merchant rules over stored transactions
    ///
    /// A failed write is recorded in the report and the pass continues.
    pub fn apply_merchant_rules(&self) -> Result<RuleApplyReport> {
        let rules = self.list_merchant_rules()?;
        let transactions = self.all_transactions()?;

        let mut report = RuleApplyReport::default();
        for (id, category) in plan_merchant_rules(&rules, &transactions) {
            report.record(id, self.update_transaction_app_category(id, &category));
        }

        info!(
            scanned = transactions.len(),
            updated = report.updated,
            failed = report.errors.len(),
            "Applied merchant category rules"
        );
        Ok(report)
    }
}
