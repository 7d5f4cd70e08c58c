//! Recurring transaction detection and rule-based tagging
//!
//! Two independent pieces:
//! - `detect_patterns` summarizes already-recurring transactions per merchant
//!   and classifies their cadence from the mean gap between dates.
//! - `apply_rules` tags not-yet-recurring transactions using the first
//!   matching recurring rule.

use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::categorize::compile_pattern;
use crate::db::Database;
use crate::error::Result;
use crate::models::{
    Cadence, MatchType, RecurrencePattern, RecurringPatternSummary, RecurringRule,
    RuleApplyReport, Transaction,
};

/// Cadence for a mean gap (in whole days)
///
/// Bands: 6-8 weekly, 13-15 biweekly, 25-35 monthly.
pub fn classify_cadence(mean_gap_days: i64) -> Cadence {
    match mean_gap_days {
        25..=35 => Cadence::Monthly,
        13..=15 => Cadence::Biweekly,
        6..=8 => Cadence::Weekly,
        _ => Cadence::Unknown,
    }
}

/// Group key for a transaction's detail text
fn merchant_key(details: &str) -> String {
    details.to_lowercase()
}

/// Summarize recurring transactions per merchant, largest groups first
///
/// Groups with a single transaction produce nothing.
pub fn detect_patterns(transactions: &[Transaction]) -> Vec<RecurringPatternSummary> {
    let mut groups: BTreeMap<String, Vec<&Transaction>> = BTreeMap::new();
    for tx in transactions {
        groups.entry(merchant_key(&tx.details)).or_default().push(tx);
    }

    let mut summaries: Vec<RecurringPatternSummary> = groups
        .into_iter()
        .filter_map(|(merchant, mut group)| {
            if group.len() < 2 {
                return None;
            }
            group.sort_by_key(|t| t.date);

            let gaps: Vec<i64> = group
                .windows(2)
                .map(|w| (w[1].date - w[0].date).num_days())
                .collect();
            let mean_gap = gaps.iter().sum::<i64>() as f64 / gaps.len() as f64;
            let avg_interval_days = mean_gap.round() as i64;

            let total_amount: f64 = group.iter().map(|t| t.amount).sum();
            let count = group.len();

            Some(RecurringPatternSummary {
                merchant,
                transaction_count: count,
                first_date: group[0].date,
                last_date: group[count - 1].date,
                avg_interval_days,
                pattern: classify_cadence(avg_interval_days),
                total_amount,
                avg_amount: total_amount / count as f64,
            })
        })
        .collect();

    // Stable: equal counts keep merchant order
    summaries.sort_by(|a, b| b.transaction_count.cmp(&a.transaction_count));
    summaries
}

/// A recurring rule ready for matching
enum RuleMatcher {
    Exact(String),
    Contains(String),
    Regex(Regex),
}

struct CompiledRule<'a> {
    rule: &'a RecurringRule,
    matcher: RuleMatcher,
}

impl<'a> CompiledRule<'a> {
    /// `None` for inactive rules and regexes that fail to compile
    fn compile(rule: &'a RecurringRule) -> Option<Self> {
        if !rule.active {
            return None;
        }
        let matcher = match rule.match_type {
            MatchType::Exact => RuleMatcher::Exact(rule.merchant.to_lowercase()),
            MatchType::Contains => RuleMatcher::Contains(rule.merchant.to_lowercase()),
            MatchType::Regex => match compile_pattern(&rule.merchant) {
                Ok(re) => RuleMatcher::Regex(re),
                Err(e) => {
                    warn!(
                        rule_id = rule.id,
                        pattern = %rule.merchant,
                        error = %e,
                        "Invalid regex in recurring rule, skipping"
                    );
                    return None;
                }
            },
        };
        Some(Self { rule, matcher })
    }

    fn matches(&self, details: &str) -> bool {
        match &self.matcher {
            RuleMatcher::Exact(needle) => details.to_lowercase() == *needle,
            RuleMatcher::Contains(needle) => details.to_lowercase().contains(needle.as_str()),
            RuleMatcher::Regex(re) => re.is_match(details),
        }
    }
}

/// A rule tagging a transaction as recurring
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleApplication {
    pub transaction_id: i64,
    pub rule_id: i64,
    pub recurrence_pattern: Option<RecurrencePattern>,
}

/// First-match-wins rule evaluation over non-recurring transactions
///
/// Rules are tried in the order given.
pub fn apply_rules(rules: &[RecurringRule], transactions: &[Transaction]) -> Vec<RuleApplication> {
    let compiled: Vec<CompiledRule> = rules.iter().filter_map(CompiledRule::compile).collect();

    transactions
        .iter()
        .filter(|tx| !tx.is_recurring)
        .filter_map(|tx| {
            compiled
                .iter()
                .find(|c| c.matches(&tx.details))
                .map(|c| RuleApplication {
                    transaction_id: tx.id,
                    rule_id: c.rule.id,
                    recurrence_pattern: c.rule.recurrence_pattern,
                })
        })
        .collect()
}

impl Database {
    /// Cadence summaries over transactions flagged recurring
    pub fn recurring_patterns(&self) -> Result<Vec<RecurringPatternSummary>> {
        let transactions = self.list_transactions_by_recurring(true)?;
        Ok(detect_patterns(&transactions))
    }

    /// Tag matching transactions as recurring
    ///
    /// A failed write is recorded in the report and the pass continues.
    pub fn apply_recurring_rules(&self) -> Result<RuleApplyReport> {
        let mut report = RuleApplyReport::default();
        let rules = self.active_recurring_rules_in_order()?;
        if rules.is_empty() {
            return Ok(report);
        }
        let transactions = self.list_transactions_by_recurring(false)?;

        for app in apply_rules(&rules, &transactions) {
            report.record(
                app.transaction_id,
                self.mark_transaction_recurring(app.transaction_id, app.recurrence_pattern),
            );
        }

        info!(
            rules = rules.len(),
            scanned = transactions.len(),
            updated = report.updated,
            failed = report.errors.len(),
            "Applied recurring rules"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};

    use crate::models::TransactionType;

    fn tx(id: i64, details: &str, date: NaiveDate, amount: f64) -> Transaction {
        Transaction {
            id,
            transaction_id: None,
            account_id: None,
            date,
            details: details.to_string(),
            amount,
            category: "Uncategorized".into(),
            app_category: "Other".into(),
            transaction_type: TransactionType::Debit,
            notes: None,
            is_recurring: false,
            recurrence_pattern: None,
            created_at: Utc::now(),
        }
    }

    fn series(details: &str, offsets: &[i64]) -> Vec<Transaction> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        offsets
            .iter()
            .enumerate()
            .map(|(i, d)| tx(i as i64 + 1, details, start + Duration::days(*d), 10.0))
            .collect()
    }

    fn rule(id: i64, merchant: &str, match_type: MatchType) -> RecurringRule {
        RecurringRule {
            id,
            merchant: merchant.to_string(),
            match_type,
            active: true,
            recurrence_pattern: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_classify_cadence_bands() {
        assert_eq!(classify_cadence(5), Cadence::Unknown);
        assert_eq!(classify_cadence(6), Cadence::Weekly);
        assert_eq!(classify_cadence(8), Cadence::Weekly);
        assert_eq!(classify_cadence(9), Cadence::Unknown);
        assert_eq!(classify_cadence(13), Cadence::Biweekly);
        assert_eq!(classify_cadence(15), Cadence::Biweekly);
        assert_eq!(classify_cadence(24), Cadence::Unknown);
        assert_eq!(classify_cadence(25), Cadence::Monthly);
        assert_eq!(classify_cadence(35), Cadence::Monthly);
        assert_eq!(classify_cadence(36), Cadence::Unknown);
    }

    #[test]
    fn test_monthly_biweekly_weekly_groups() {
        let mut all = series("Netflix", &[0, 30, 60, 90]);
        all.extend(series("Payroll", &[0, 14, 28]));
        all.extend(series("Gym Class", &[0, 7]));

        let patterns = detect_patterns(&all);
        assert_eq!(patterns.len(), 3);

        assert_eq!(patterns[0].merchant, "netflix");
        assert_eq!(patterns[0].pattern, Cadence::Monthly);
        assert_eq!(patterns[0].transaction_count, 4);
        assert_eq!(patterns[0].avg_interval_days, 30);

        assert_eq!(patterns[1].merchant, "payroll");
        assert_eq!(patterns[1].pattern, Cadence::Biweekly);

        assert_eq!(patterns[2].merchant, "gym class");
        assert_eq!(patterns[2].pattern, Cadence::Weekly);
    }

    #[test]
    fn test_single_transaction_group_dropped() {
        let patterns = detect_patterns(&series("Once Off", &[0]));
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_groups_case_insensitively_and_sorts_dates() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let all = vec![
            tx(1, "SPOTIFY", start + Duration::days(30), 11.99),
            tx(2, "spotify", start, 11.99),
        ];
        let patterns = detect_patterns(&all);
        assert_eq!(patterns.len(), 1);
        let p = &patterns[0];
        assert_eq!(p.first_date, start);
        assert_eq!(p.last_date, start + Duration::days(30));
        assert!((p.total_amount - 23.98).abs() < 1e-9);
        assert!((p.avg_amount - 11.99).abs() < 1e-9);
    }

    #[test]
    fn test_mean_gap_rounds_before_banding() {
        // Gaps 14 and 15 average 14.5, which rounds to 15
        let patterns = detect_patterns(&series("Sitter", &[0, 14, 29]));
        assert_eq!(patterns[0].avg_interval_days, 15);
        assert_eq!(patterns[0].pattern, Cadence::Biweekly);

        // Irregular gaps fall outside every band
        let patterns = detect_patterns(&series("Bakery", &[0, 3, 20]));
        assert_eq!(patterns[0].pattern, Cadence::Unknown);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let txs = vec![tx(1, "UBER EATS TORONTO", start, 25.0)];
        let mut uber = rule(1, "UBER", MatchType::Contains);
        uber.recurrence_pattern = Some(RecurrencePattern::Weekly);
        let mut eats = rule(2, "EATS", MatchType::Contains);
        eats.recurrence_pattern = Some(RecurrencePattern::Monthly);

        let applied = apply_rules(&[uber, eats], &txs);
        assert_eq!(
            applied,
            vec![RuleApplication {
                transaction_id: 1,
                rule_id: 1,
                recurrence_pattern: Some(RecurrencePattern::Weekly),
            }]
        );
    }

    #[test]
    fn test_match_types() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let txs = vec![
            tx(1, "Netflix.com", start, 15.0),
            tx(2, "NETFLIX", start, 15.0),
            tx(3, "Hydro-Quebec 0042", start, 80.0),
        ];

        let exact = apply_rules(&[rule(1, "netflix", MatchType::Exact)], &txs);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].transaction_id, 2);

        let contains = apply_rules(&[rule(1, "netflix", MatchType::Contains)], &txs);
        assert_eq!(contains.len(), 2);

        let regex = apply_rules(&[rule(1, r"^hydro-\w+ \d+$", MatchType::Regex)], &txs);
        assert_eq!(regex.len(), 1);
        assert_eq!(regex[0].transaction_id, 3);
    }

    #[test]
    fn test_matching_lowercases_without_trimming() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let txs = vec![tx(1, "Gym ", start, 40.0), tx(2, "GYM", start, 40.0)];

        let exact = apply_rules(&[rule(1, "gym", MatchType::Exact)], &txs);
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].transaction_id, 2);

        let groups = detect_patterns(&txs);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_invalid_regex_and_inactive_rules_skipped() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let txs = vec![tx(1, "Spotify P123", start, 11.99)];
        let mut inactive = rule(2, "spotify", MatchType::Contains);
        inactive.active = false;
        let rules = vec![
            rule(1, "(spotify", MatchType::Regex),
            inactive,
            rule(3, "spotify", MatchType::Contains),
        ];

        let applied = apply_rules(&rules, &txs);
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].rule_id, 3);
    }

    #[test]
    fn test_already_recurring_untouched() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut already = tx(1, "Rent", start, 1200.0);
        already.is_recurring = true;
        let applied = apply_rules(&[rule(1, "rent", MatchType::Exact)], &[already]);
        assert!(applied.is_empty());
    }
}
