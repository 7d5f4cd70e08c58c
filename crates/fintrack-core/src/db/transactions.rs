//! Transaction operations

use std::collections::BTreeMap;

use rusqlite::{params, OptionalExtension};

use super::transaction_query::TransactionQuery;
use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    AmountBucket, NewTransaction, RecurrencePattern, Transaction, TransactionSummary,
    TransactionType, UNASSIGNED_APP_CATEGORY, UNCATEGORIZED,
};

/// Column order expected by `row_to_transaction`
const TX_COLUMNS: &str = "id, transaction_id, account_id, date, details, amount, category, \
     app_category, transaction_type, notes, is_recurring, recurrence_pattern, created_at";

/// Result of inserting a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionInsertResult {
    Inserted(i64),
    /// A row with the same bank identity exists; carries its id
    Duplicate(i64),
}

fn validate_new_transaction(tx: &NewTransaction) -> Result<()> {
    if tx.details.trim().is_empty() {
        return Err(Error::InvalidData("Transaction details are required".into()));
    }
    if !tx.amount.is_finite() {
        return Err(Error::InvalidData(format!("Invalid amount: {}", tx.amount)));
    }
    Ok(())
}

impl Database {
    /// Insert a transaction, skipping duplicates by (transaction_id, account_id)
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<TransactionInsertResult> {
        validate_new_transaction(tx)?;
        let conn = self.conn()?;

        if let (Some(tid), Some(aid)) = (tx.transaction_id.as_deref(), tx.account_id.as_deref()) {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM transactions WHERE transaction_id = ? AND account_id = ?",
                    params![tid, aid],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(id) = existing {
                return Ok(TransactionInsertResult::Duplicate(id));
            }
        }

        conn.execute(
            r#"
            INSERT INTO transactions (transaction_id, account_id, date, details, amount, category,
                                      app_category, transaction_type, notes, is_recurring, recurrence_pattern)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.transaction_id,
                tx.account_id,
                tx.date.to_string(),
                tx.details.trim(),
                tx.amount.abs(),
                tx.category.as_deref().unwrap_or(UNCATEGORIZED),
                tx.app_category.as_deref().unwrap_or(UNASSIGNED_APP_CATEGORY),
                tx.transaction_type.as_str(),
                tx.notes,
                tx.is_recurring,
                tx.recurrence_pattern.unwrap_or(RecurrencePattern::None).as_str(),
            ],
        )?;

        Ok(TransactionInsertResult::Inserted(conn.last_insert_rowid()))
    }

    /// Whether a bank transaction is already stored
    pub fn transaction_exists(&self, transaction_id: &str, account_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE transaction_id = ? AND account_id = ?",
            params![transaction_id, account_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List transactions matching `query`, newest first
    pub fn list_transactions(&self, query: &TransactionQuery) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let parts = query.build()?;

        let mut sql = format!(
            "SELECT {} FROM transactions {} ORDER BY date DESC, id DESC",
            TX_COLUMNS, parts.where_clause
        );
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit.max(0), query.offset.unwrap_or(0).max(0)));
        }

        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(parts.params_refs().as_slice(), Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Count transactions matching `query` (ignores limit/offset)
    pub fn count_transactions(&self, query: &TransactionQuery) -> Result<i64> {
        let conn = self.conn()?;
        let parts = query.build()?;
        let sql = format!("SELECT COUNT(*) FROM transactions {}", parts.where_clause);
        let count: i64 = conn.query_row(&sql, parts.params_refs().as_slice(), |row| row.get(0))?;
        Ok(count)
    }

    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(3)?;
        let type_str: String = row.get(8)?;
        let pattern_str: Option<String> = row.get(11)?;
        let created_at_str: String = row.get(12)?;
        Ok(Transaction {
            id: row.get(0)?,
            transaction_id: row.get(1)?,
            account_id: row.get(2)?,
            date: chrono::NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
            details: row.get(4)?,
            amount: row.get(5)?,
            category: row.get(6)?,
            app_category: row.get(7)?,
            transaction_type: type_str.parse().unwrap_or(TransactionType::Debit),
            notes: row.get(9)?,
            is_recurring: row.get(10)?,
            recurrence_pattern: pattern_str.and_then(|s| s.parse().ok()),
            created_at: parse_datetime(&created_at_str),
        })
    }

    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM transactions WHERE id = ?", TX_COLUMNS);
        let transaction = conn
            .query_row(&sql, params![id], Self::row_to_transaction)
            .optional()?;
        Ok(transaction)
    }

    /// Run a single-row UPDATE, mapping zero affected rows to NotFound
    fn update_transaction_row(
        &self,
        id: i64,
        set_clause: &str,
        values: &[&dyn rusqlite::ToSql],
    ) -> Result<()> {
        let conn = self.conn()?;
        let sql = format!("UPDATE transactions SET {} WHERE id = ?", set_clause);
        let mut all: Vec<&dyn rusqlite::ToSql> = values.to_vec();
        all.push(&id);
        let changed = conn.execute(&sql, all.as_slice())?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Transaction {}", id)));
        }
        Ok(())
    }

    /// Overwrite the raw category
    pub fn update_transaction_category(&self, id: i64, category: &str) -> Result<()> {
        let category = category.trim();
        if category.is_empty() {
            return Err(Error::InvalidData("Category is required".into()));
        }
        self.update_transaction_row(id, "category = ?", &[&category])
    }

    /// Overwrite the resolved budgeting category
    pub fn update_transaction_app_category(&self, id: i64, app_category: &str) -> Result<()> {
        let app_category = app_category.trim();
        if app_category.is_empty() {
            return Err(Error::InvalidData("App category is required".into()));
        }
        self.update_transaction_row(id, "app_category = ?", &[&app_category])
    }

    pub fn update_transaction_type(&self, id: i64, transaction_type: TransactionType) -> Result<()> {
        self.update_transaction_row(id, "transaction_type = ?", &[&transaction_type.as_str()])
    }

    /// Set the recurring flag; the pattern is cleared to "none" when not recurring
    pub fn set_transaction_recurrence(
        &self,
        id: i64,
        is_recurring: bool,
        pattern: Option<RecurrencePattern>,
    ) -> Result<()> {
        let pattern = if is_recurring {
            pattern.unwrap_or(RecurrencePattern::None)
        } else {
            RecurrencePattern::None
        };
        self.update_transaction_row(
            id,
            "is_recurring = ?, recurrence_pattern = ?",
            &[&is_recurring, &pattern.as_str()],
        )
    }

    /// Flag as recurring, keeping the stored pattern unless one is given
    pub(crate) fn mark_transaction_recurring(
        &self,
        id: i64,
        pattern: Option<RecurrencePattern>,
    ) -> Result<()> {
        match pattern {
            Some(p) => self.update_transaction_row(
                id,
                "is_recurring = 1, recurrence_pattern = ?",
                &[&p.as_str()],
            ),
            None => self.update_transaction_row(id, "is_recurring = 1", &[]),
        }
    }

    pub fn delete_transaction(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM transactions WHERE id = ?", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Transaction {}", id)));
        }
        Ok(())
    }

    /// Transactions with `is_recurring` equal to `recurring`, oldest first
    pub fn list_transactions_by_recurring(&self, recurring: bool) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM transactions WHERE is_recurring = ? ORDER BY date ASC, id ASC",
            TX_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params![recurring], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    /// Every stored transaction, in id order
    pub fn all_transactions(&self) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM transactions ORDER BY id ASC", TX_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map([], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    /// Distinct detail texts containing any of `parts` (case-insensitive)
    pub fn distinct_details_containing(&self, parts: &[String]) -> Result<Vec<String>> {
        if parts.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let (clause, patterns) = like_any("details", parts);
        let sql = format!(
            "SELECT DISTINCT details FROM transactions WHERE {} ORDER BY details",
            clause
        );
        let refs: Vec<&dyn rusqlite::ToSql> =
            patterns.iter().map(|p| p as &dyn rusqlite::ToSql).collect();
        let mut stmt = conn.prepare(&sql)?;
        let details = stmt
            .query_map(refs.as_slice(), |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(details)
    }

    /// Set app_category on every transaction whose details contain any of `parts`
    pub fn set_app_category_where_details_contain(
        &self,
        parts: &[String],
        app_category: &str,
    ) -> Result<usize> {
        if parts.is_empty() {
            return Ok(0);
        }
        let conn = self.conn()?;
        let (clause, patterns) = like_any("details", parts);
        let sql = format!("UPDATE transactions SET app_category = ? WHERE {}", clause);
        let mut refs: Vec<&dyn rusqlite::ToSql> = vec![&app_category];
        refs.extend(patterns.iter().map(|p| p as &dyn rusqlite::ToSql));
        Ok(conn.execute(&sql, refs.as_slice())?)
    }

    /// Totals by type, raw category and account
    pub fn transaction_summary(&self) -> Result<TransactionSummary> {
        let conn = self.conn()?;
        let mut summary = TransactionSummary::default();

        let mut stmt = conn.prepare(
            "SELECT transaction_type, category, COALESCE(account_id, ''), amount FROM transactions",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut categories: BTreeMap<String, AmountBucket> = BTreeMap::new();
        let mut accounts: BTreeMap<String, AmountBucket> = BTreeMap::new();
        for (tx_type, category, account, amount) in rows {
            summary.total_transactions += 1;
            summary.total_amount += amount;
            if tx_type == TransactionType::Credit.as_str() {
                summary.total_credits += 1;
                summary.total_credit_amount += amount;
            } else {
                summary.total_debits += 1;
                summary.total_debit_amount += amount;
            }

            let bucket = categories.entry(category).or_default();
            bucket.count += 1;
            bucket.total_amount += amount;

            let bucket = accounts.entry(account).or_default();
            bucket.count += 1;
            bucket.total_amount += amount;
        }
        summary.categories = categories;
        summary.accounts = accounts;

        Ok(summary)
    }
}

/// `(col LIKE ? COLLATE NOCASE OR ...)` plus the `%part%` patterns
fn like_any(column: &str, parts: &[String]) -> (String, Vec<String>) {
    let clause = parts
        .iter()
        .map(|_| format!("{} LIKE ? COLLATE NOCASE", column))
        .collect::<Vec<_>>()
        .join(" OR ");
    let patterns = parts.iter().map(|p| format!("%{}%", p)).collect();
    (format!("({})", clause), patterns)
}
