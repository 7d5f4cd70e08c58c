//! Ingestion of bank-provider transactions
//!
//! Each incoming record is date-filtered, de-duplicated by bank identity,
//! categorized through the pipeline, stored, and finally passed through
//! the active merchant category rules.

use std::io::Read;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::categorize::{CategoryInput, CategoryResolver};
use crate::config::TransactionFilterConfig;
use crate::db::{Database, TransactionInsertResult};
use crate::error::{Error, Result};
use crate::merchant_rules::{compile_rules, first_match, CompiledMerchantRule};
use crate::models::{
    NewTransaction, PersonalFinanceCategory, RecurrencePattern, TransactionType, UNCATEGORIZED,
};

/// A transaction as supplied by the bank-data provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankTransaction {
    pub transaction_id: String,
    pub account_id: String,
    pub date: NaiveDate,
    pub name: String,
    #[serde(default)]
    pub merchant_name: Option<String>,
    /// Signed per provider convention: negative is money in
    pub amount: f64,
    #[serde(default)]
    pub category: Option<Vec<String>>,
    #[serde(default)]
    pub personal_finance_category: Option<PersonalFinanceCategory>,
}

impl BankTransaction {
    pub fn category_input(&self) -> CategoryInput {
        CategoryInput {
            merchant_name: self.merchant_name.clone(),
            name: Some(self.name.clone()),
            personal_finance_category: self.personal_finance_category.clone(),
            category: self.category.clone(),
        }
    }

    fn raw_category(&self) -> String {
        self.category
            .as_ref()
            .and_then(|c| c.first())
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED)
            .to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BankPayload {
    List(Vec<BankTransaction>),
    Wrapped { transactions: Vec<BankTransaction> },
}

/// Parse a provider JSON payload: a list, or `{"transactions": [...]}`
pub fn parse_bank_transactions<R: Read>(reader: R) -> Result<Vec<BankTransaction>> {
    let payload: BankPayload = serde_json::from_reader(reader)?;
    Ok(match payload {
        BankPayload::List(list) => list,
        BankPayload::Wrapped { transactions } => transactions,
    })
}

/// One record that could not be stored
#[derive(Debug, Clone, Serialize)]
pub struct IngestError {
    pub transaction_id: String,
    pub error: String,
}

/// Outcome of an ingestion run
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub fetched: usize,
    pub saved: usize,
    pub filtered: usize,
    pub duplicates: usize,
    pub errors: Vec<IngestError>,
    pub date_filtering: bool,
    pub start_date: Option<NaiveDate>,
}

/// Stores provider transactions using an explicit filter config
pub struct Ingestor<'a> {
    db: &'a Database,
    filter: TransactionFilterConfig,
}

enum Outcome {
    Saved,
    Duplicate,
}

impl<'a> Ingestor<'a> {
    pub fn new(db: &'a Database, filter: TransactionFilterConfig) -> Self {
        Self { db, filter }
    }

    pub fn ingest(&self, transactions: &[BankTransaction]) -> Result<IngestReport> {
        let mut report = IngestReport {
            fetched: transactions.len(),
            date_filtering: self.filter.enable_date_filtering,
            start_date: self.filter.default_start_date,
            ..Default::default()
        };

        let rules = self.db.active_merchant_rules()?;
        let compiled = compile_rules(&rules);
        let resolver = CategoryResolver::new(self.db);

        for bank_tx in transactions {
            if !self.filter.should_include(bank_tx.date) {
                debug!(transaction_id = %bank_tx.transaction_id, date = %bank_tx.date, "Filtered by date");
                report.filtered += 1;
                continue;
            }

            match self.ingest_one(bank_tx, &resolver, &compiled) {
                Ok(Outcome::Saved) => report.saved += 1,
                Ok(Outcome::Duplicate) => report.duplicates += 1,
                Err(e) => {
                    warn!(transaction_id = %bank_tx.transaction_id, error = %e, "Failed to ingest transaction");
                    report.errors.push(IngestError {
                        transaction_id: bank_tx.transaction_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            fetched = report.fetched,
            saved = report.saved,
            filtered = report.filtered,
            duplicates = report.duplicates,
            errors = report.errors.len(),
            "Ingestion complete"
        );
        Ok(report)
    }

    fn ingest_one(
        &self,
        bank_tx: &BankTransaction,
        resolver: &CategoryResolver<'_, Database>,
        rules: &[CompiledMerchantRule<'_>],
    ) -> Result<Outcome> {
        if bank_tx.transaction_id.trim().is_empty() || bank_tx.account_id.trim().is_empty() {
            return Err(Error::InvalidData(
                "transaction_id and account_id are required".into(),
            ));
        }
        if self
            .db
            .transaction_exists(&bank_tx.transaction_id, &bank_tx.account_id)?
        {
            return Ok(Outcome::Duplicate);
        }

        let resolution = resolver.categorize(&bank_tx.category_input())?;
        let app_category = first_match(rules, &bank_tx.name)
            .map(String::from)
            .unwrap_or(resolution.category);

        let new_tx = NewTransaction {
            transaction_id: Some(bank_tx.transaction_id.clone()),
            account_id: Some(bank_tx.account_id.clone()),
            date: bank_tx.date,
            details: bank_tx.name.clone(),
            amount: bank_tx.amount.abs(),
            category: Some(bank_tx.raw_category()),
            app_category: Some(app_category),
            transaction_type: TransactionType::from_signed_amount(bank_tx.amount),
            notes: bank_tx.merchant_name.clone(),
            is_recurring: false,
            recurrence_pattern: Some(RecurrencePattern::None),
        };

        Ok(match self.db.insert_transaction(&new_tx)? {
            TransactionInsertResult::Inserted(_) => Outcome::Saved,
            TransactionInsertResult::Duplicate(_) => Outcome::Duplicate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_and_wrapped_payloads() {
        let list = r#"[{"transaction_id":"t1","account_id":"a1","date":"2025-02-01",
                       "name":"Starbucks","amount":4.5}]"#;
        let parsed = parse_bank_transactions(list.as_bytes()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].category.is_none());

        let wrapped = r#"{"transactions":[{"transaction_id":"t1","account_id":"a1",
                          "date":"2025-02-01","name":"Payroll","amount":-1500.0,
                          "category":["PAYROLL"],
                          "personal_finance_category":{"primary":"INCOME","detailed":"INCOME_WAGES"}}]}"#;
        let parsed = parse_bank_transactions(wrapped.as_bytes()).unwrap();
        assert_eq!(parsed[0].raw_category(), "PAYROLL");
        assert_eq!(
            parsed[0]
                .personal_finance_category
                .as_ref()
                .and_then(|p| p.detailed.as_deref()),
            Some("INCOME_WAGES")
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_bank_transactions("{\"nope\": 1}".as_bytes()).is_err());
    }

    #[test]
    fn test_raw_category_default() {
        let tx = BankTransaction {
            transaction_id: "t".into(),
            account_id: "a".into(),
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            name: "x".into(),
            merchant_name: None,
            amount: 1.0,
            category: Some(vec![]),
            personal_finance_category: None,
        };
        assert_eq!(tx.raw_category(), UNCATEGORIZED);
    }
}
