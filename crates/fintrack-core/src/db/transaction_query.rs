//! Filter builder for transaction listings

use chrono::{Datelike, NaiveDate};

use crate::error::{Error, Result};

/// Builder for the WHERE clause of a transaction listing
///
/// Borrowed string filters live as long as `'query`.
#[derive(Debug, Default, Clone)]
pub struct TransactionQuery<'query> {
    /// Calendar month as `YYYY-MM`
    pub month: Option<&'query str>,
    pub account_id: Option<&'query str>,
    pub app_category: Option<&'query str>,
    pub is_recurring: Option<bool>,
    /// Substring of details or notes (case-insensitive)
    pub search: Option<&'query str>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// SQL fragments produced by `TransactionQuery::build`
pub(crate) struct QueryParts {
    pub where_clause: String,
    pub params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl QueryParts {
    pub fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

/// First day of `month` and first day of the following month
fn month_bounds(month: &str) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| Error::InvalidData(format!("Invalid month '{}', expected YYYY-MM", month)))?;
    let end = if start.month() == 12 {
        NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
    }
    .ok_or_else(|| Error::InvalidData(format!("Month out of range: {}", month)))?;
    Ok((start, end))
}

impl<'query> TransactionQuery<'query> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn month(mut self, month: Option<&'query str>) -> Self {
        self.month = month;
        self
    }

    pub fn account_id(mut self, id: Option<&'query str>) -> Self {
        self.account_id = id;
        self
    }

    pub fn app_category(mut self, category: Option<&'query str>) -> Self {
        self.app_category = category;
        self
    }

    pub fn is_recurring(mut self, value: Option<bool>) -> Self {
        self.is_recurring = value;
        self
    }

    pub fn search(mut self, query: Option<&'query str>) -> Self {
        self.search = query;
        self
    }

    pub fn limit(mut self, limit: Option<i64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: Option<i64>) -> Self {
        self.offset = offset;
        self
    }

    /// Build WHERE clause and parameters; fails on a malformed month
    pub(crate) fn build(&self) -> Result<QueryParts> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(month) = self.month.filter(|m| !m.trim().is_empty()) {
            let (start, end) = month_bounds(month)?;
            conditions.push("date >= ? AND date < ?");
            params.push(Box::new(start.to_string()));
            params.push(Box::new(end.to_string()));
        }

        if let Some(account) = self.account_id.filter(|a| !a.trim().is_empty()) {
            conditions.push("account_id = ?");
            params.push(Box::new(account.trim().to_string()));
        }

        if let Some(category) = self.app_category.filter(|c| !c.trim().is_empty()) {
            conditions.push("app_category = ?");
            params.push(Box::new(category.trim().to_string()));
        }

        if let Some(recurring) = self.is_recurring {
            conditions.push("is_recurring = ?");
            params.push(Box::new(recurring));
        }

        if let Some(q) = self.search.filter(|q| !q.trim().is_empty()) {
            conditions.push("(details LIKE ? COLLATE NOCASE OR notes LIKE ? COLLATE NOCASE)");
            let pattern = format!("%{}%", q.trim());
            params.push(Box::new(pattern.clone()));
            params.push(Box::new(pattern));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        Ok(QueryParts {
            where_clause,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_has_no_where() {
        let parts = TransactionQuery::new().build().unwrap();
        assert!(parts.where_clause.is_empty());
        assert!(parts.params.is_empty());
    }

    #[test]
    fn test_month_bounds_roll_over_year() {
        let (start, end) = month_bounds("2024-12").unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert!(month_bounds("2024-13").is_err());
        assert!(month_bounds("March").is_err());
    }

    #[test]
    fn test_filters_combine_with_and() {
        let parts = TransactionQuery::new()
            .month(Some("2025-03"))
            .app_category(Some("Groceries"))
            .is_recurring(Some(true))
            .search(Some("costco"))
            .build()
            .unwrap();
        assert_eq!(
            parts.where_clause,
            "WHERE date >= ? AND date < ? AND app_category = ? AND is_recurring = ? \
             AND (details LIKE ? COLLATE NOCASE OR notes LIKE ? COLLATE NOCASE)"
        );
        assert_eq!(parts.params.len(), 6);
    }

    #[test]
    fn test_blank_filters_ignored() {
        let parts = TransactionQuery::new()
            .account_id(Some("  "))
            .search(Some(""))
            .build()
            .unwrap();
        assert!(parts.where_clause.is_empty());
    }
}
