//! Domain models for fintrack

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// App category assigned to transactions that have not been categorized yet
pub const UNASSIGNED_APP_CATEGORY: &str = "Other";

/// Raw category stored when the bank supplied none
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A stored bank transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// Bank-side transaction id
    pub transaction_id: Option<String>,
    /// Bank-side account id
    pub account_id: Option<String>,
    pub date: NaiveDate,
    /// Detail text (the bank's display name for the transaction)
    pub details: String,
    /// Always non-negative; direction is carried by `transaction_type`
    pub amount: f64,
    /// Raw category as supplied by the bank
    pub category: String,
    /// Resolved budgeting category
    pub app_category: String,
    pub transaction_type: TransactionType,
    pub notes: Option<String>,
    pub is_recurring: bool,
    pub recurrence_pattern: Option<RecurrencePattern>,
    pub created_at: DateTime<Utc>,
}

/// A transaction to insert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub transaction_id: Option<String>,
    pub account_id: Option<String>,
    pub date: NaiveDate,
    pub details: String,
    pub amount: f64,
    pub category: Option<String>,
    pub app_category: Option<String>,
    pub transaction_type: TransactionType,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurrence_pattern: Option<RecurrencePattern>,
}

/// Direction of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Debit,
    Credit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "Debit",
            Self::Credit => "Credit",
        }
    }

    /// Bank convention: negative amounts are money in
    pub fn from_signed_amount(amount: f64) -> Self {
        if amount < 0.0 {
            Self::Credit
        } else {
            Self::Debit
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Debit" => Ok(Self::Debit),
            "Credit" => Ok(Self::Credit),
            _ => Err(format!("Type must be either \"Debit\" or \"Credit\", got: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How often a transaction is expected to repeat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecurrencePattern {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "weekly")]
    Weekly,
    #[serde(rename = "biweekly", alias = "bi-weekly")]
    Biweekly,
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "bi-monthly", alias = "bimonthly")]
    Bimonthly,
    #[serde(rename = "annually")]
    Annually,
    #[serde(rename = "custom")]
    Custom,
}

impl RecurrencePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Bimonthly => "bi-monthly",
            Self::Annually => "annually",
            Self::Custom => "custom",
        }
    }
}

impl std::str::FromStr for RecurrencePattern {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "biweekly" | "bi-weekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            "bi-monthly" | "bimonthly" => Ok(Self::Bimonthly),
            "annually" => Ok(Self::Annually),
            "custom" => Ok(Self::Custom),
            _ => Err(format!("Unknown recurrence pattern: {}", s)),
        }
    }
}

impl std::fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a recurring rule compares its merchant text to transaction details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Case-insensitive full-string equality
    #[default]
    Exact,
    /// Case-insensitive substring
    Contains,
    /// Case-insensitive regular expression
    Regex,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Contains => "contains",
            Self::Regex => "regex",
        }
    }
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "contains" => Ok(Self::Contains),
            "regex" => Ok(Self::Regex),
            _ => Err(format!("Unknown match type: {}", s)),
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which tier of the merchant mapping store produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    Exact,
    Pattern,
    None,
}

impl MatchConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Pattern => "pattern",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for MatchConfidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a category was derived when it is written back as a learned mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningConfidence {
    Exact,
    Pattern,
    Fallback,
}

impl LearningConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Pattern => "pattern",
            Self::Fallback => "fallback",
        }
    }

    /// Priority given to a newly learned mapping
    pub fn seed_priority(&self) -> i64 {
        match self {
            Self::Exact => 10,
            Self::Pattern => 5,
            Self::Fallback => 1,
        }
    }
}

impl std::str::FromStr for LearningConfidence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "pattern" => Ok(Self::Pattern),
            "fallback" => Ok(Self::Fallback),
            _ => Err(format!("Unknown confidence: {}", s)),
        }
    }
}

impl std::fmt::Display for LearningConfidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Detected interval class of a recurring merchant group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Weekly,
    Biweekly,
    Monthly,
    Unknown,
}

impl Cadence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured bank category (primary + detailed code)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalFinanceCategory {
    pub primary: Option<String>,
    pub detailed: Option<String>,
}

// ============================================
// Merchant category mappings
// ============================================

/// A learned or curated merchant -> app category association
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantMapping {
    pub id: i64,
    pub merchant_name: String,
    /// Optional regex matched case-insensitively against merchant names
    pub merchant_pattern: Option<String>,
    pub app_category: String,
    /// Higher wins
    pub priority: i64,
    pub is_active: bool,
    pub description: Option<String>,
    pub created_by: Option<String>,
    pub usage_count: i64,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_mapping_priority() -> i64 {
    1
}

/// A merchant mapping to create
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMerchantMapping {
    #[serde(default)]
    pub merchant_name: String,
    pub merchant_pattern: Option<String>,
    #[serde(default)]
    pub app_category: String,
    #[serde(default = "default_mapping_priority")]
    pub priority: i64,
    pub description: Option<String>,
    pub created_by: Option<String>,
}

/// Partial update for a merchant mapping
///
/// An empty `merchant_pattern` clears the stored pattern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MerchantMappingUpdate {
    pub merchant_name: Option<String>,
    pub merchant_pattern: Option<String>,
    pub app_category: Option<String>,
    pub priority: Option<i64>,
    pub is_active: Option<bool>,
    pub description: Option<String>,
}

/// Filters for listing merchant mappings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MerchantMappingFilter {
    /// Substring of the merchant name (case-insensitive)
    pub merchant_name: Option<String>,
    pub app_category: Option<String>,
    pub is_active: Option<bool>,
}

/// Result of matching a merchant name against the mapping store
#[derive(Debug, Clone, Serialize)]
pub struct MappingMatch {
    pub matched: bool,
    pub category: Option<String>,
    pub mapping: Option<MerchantMapping>,
    pub confidence: MatchConfidence,
}

impl MappingMatch {
    pub fn none() -> Self {
        Self {
            matched: false,
            category: None,
            mapping: None,
            confidence: MatchConfidence::None,
        }
    }

    pub fn found(mapping: MerchantMapping, confidence: MatchConfidence) -> Self {
        Self {
            matched: true,
            category: Some(mapping.app_category.clone()),
            mapping: Some(mapping),
            confidence,
        }
    }
}

/// Usage summary for one app category across mappings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryUsage {
    pub app_category: String,
    pub total_usage: i64,
    pub mapping_count: i64,
}

/// Usage summary for one merchant mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantUsage {
    pub merchant_name: String,
    pub usage_count: i64,
    pub app_category: String,
}

/// Aggregate statistics over merchant mappings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingStats {
    pub total_mappings: i64,
    pub active_mappings: i64,
    pub total_usage: i64,
    pub top_categories: Vec<CategoryUsage>,
    pub top_merchants: Vec<MerchantUsage>,
}

// ============================================
// Structured category mappings
// ============================================

/// Admin-curated bank category -> app category override
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryMapping {
    pub id: i64,
    /// Legacy flat category (e.g., "Food and Drink")
    pub plaid_category: Option<String>,
    /// Structured primary code (e.g., "FOOD_AND_DRINK")
    pub personal_finance_primary: Option<String>,
    /// Structured detailed code (e.g., "FOOD_AND_DRINK_COFFEE")
    pub personal_finance_detailed: Option<String>,
    pub app_category: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A category mapping to create
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCategoryMapping {
    pub plaid_category: Option<String>,
    pub personal_finance_primary: Option<String>,
    pub personal_finance_detailed: Option<String>,
    pub app_category: String,
    pub description: Option<String>,
}

/// Transaction count and total for one app category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDistribution {
    pub category: String,
    pub count: i64,
    pub total_amount: f64,
}

/// Categorization coverage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStats {
    pub total_mappings: i64,
    pub total_transactions: i64,
    pub categorized_transactions: i64,
    /// Percentage with two decimals
    pub categorization_rate: f64,
    pub category_distribution: Vec<CategoryDistribution>,
}

// ============================================
// Rules
// ============================================

/// Rule that marks matching transactions as recurring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringRule {
    pub id: i64,
    /// Text compared against transaction details
    pub merchant: String,
    pub match_type: MatchType,
    pub active: bool,
    pub recurrence_pattern: Option<RecurrencePattern>,
    pub created_at: DateTime<Utc>,
}

/// A recurring rule to create
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRecurringRule {
    #[serde(default)]
    pub merchant: String,
    #[serde(default)]
    pub match_type: MatchType,
    pub recurrence_pattern: Option<RecurrencePattern>,
}

/// Partial update for a recurring rule
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecurringRuleUpdate {
    pub merchant: Option<String>,
    pub match_type: Option<MatchType>,
    pub active: Option<bool>,
    pub recurrence_pattern: Option<RecurrencePattern>,
}

/// Rule used for bulk retrocategorization of transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantCategoryRule {
    pub id: i64,
    /// Plain text or regex, compared case-insensitively
    pub merchant_pattern: String,
    pub category: String,
    pub exact_match: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A merchant category rule to create
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMerchantCategoryRule {
    #[serde(default)]
    pub merchant_pattern: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub exact_match: bool,
}

/// Partial update for a merchant category rule
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MerchantCategoryRuleUpdate {
    pub merchant_pattern: Option<String>,
    pub category: Option<String>,
    pub exact_match: Option<bool>,
    pub is_active: Option<bool>,
}

/// Summary of one recurring merchant group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringPatternSummary {
    /// Lowercased detail text shared by the group
    pub merchant: String,
    pub transaction_count: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    /// Mean gap between consecutive dates, rounded to whole days
    pub avg_interval_days: i64,
    pub pattern: Cadence,
    pub total_amount: f64,
    pub avg_amount: f64,
}

// ============================================
// Transaction summaries
// ============================================

/// Count and total for a group of transactions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmountBucket {
    pub count: i64,
    pub total_amount: f64,
}

/// Overview of all stored transactions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub total_transactions: i64,
    pub total_debits: i64,
    pub total_credits: i64,
    pub total_amount: f64,
    pub total_debit_amount: f64,
    pub total_credit_amount: f64,
    /// Keyed by raw category
    pub categories: std::collections::BTreeMap<String, AmountBucket>,
    /// Keyed by bank account id
    pub accounts: std::collections::BTreeMap<String, AmountBucket>,
}

/// A stored transaction a rule pass could not update
#[derive(Debug, Clone, Serialize)]
pub struct RuleApplyError {
    pub transaction_id: i64,
    pub error: String,
}

/// Outcome of a bulk rule pass over stored transactions
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleApplyReport {
    pub updated: usize,
    pub errors: Vec<RuleApplyError>,
}

impl RuleApplyReport {
    /// Count a successful write or keep the failure and carry on
    pub(crate) fn record(&mut self, transaction_id: i64, outcome: crate::error::Result<()>) {
        match outcome {
            Ok(()) => self.updated += 1,
            Err(e) => {
                tracing::warn!(transaction_id, error = %e, "Rule application failed");
                self.errors.push(RuleApplyError {
                    transaction_id,
                    error: e.to_string(),
                });
            }
        }
    }
}
