//! Recurring rules and merchant category rules

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    MatchType, MerchantCategoryRule, MerchantCategoryRuleUpdate, NewMerchantCategoryRule,
    NewRecurringRule, RecurringRule, RecurringRuleUpdate,
};

const RECURRING_COLUMNS: &str = "id, merchant, match_type, active, recurrence_pattern, created_at";
const MERCHANT_RULE_COLUMNS: &str =
    "id, merchant_pattern, category, exact_match, is_active, created_at";

impl Database {
    // ========== Recurring rules ==========

    fn row_to_recurring_rule(row: &rusqlite::Row) -> rusqlite::Result<RecurringRule> {
        let match_type: String = row.get(2)?;
        let pattern: Option<String> = row.get(4)?;
        let created_at: String = row.get(5)?;
        Ok(RecurringRule {
            id: row.get(0)?,
            merchant: row.get(1)?,
            match_type: match_type.parse().unwrap_or(MatchType::Exact),
            active: row.get(3)?,
            recurrence_pattern: pattern.and_then(|p| p.parse().ok()),
            created_at: parse_datetime(&created_at),
        })
    }

    /// Active rules ordered by merchant
    pub fn list_recurring_rules(&self) -> Result<Vec<RecurringRule>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM recurring_rules WHERE active = 1 ORDER BY merchant ASC, id ASC",
            RECURRING_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rules = stmt
            .query_map([], Self::row_to_recurring_rule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    /// Active rules in stored (id) order, as the rule engine evaluates them
    pub fn active_recurring_rules_in_order(&self) -> Result<Vec<RecurringRule>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM recurring_rules WHERE active = 1 ORDER BY id ASC",
            RECURRING_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rules = stmt
            .query_map([], Self::row_to_recurring_rule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    pub fn get_recurring_rule(&self, id: i64) -> Result<Option<RecurringRule>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM recurring_rules WHERE id = ?", RECURRING_COLUMNS);
        Ok(conn
            .query_row(&sql, params![id], Self::row_to_recurring_rule)
            .optional()?)
    }

    pub fn create_recurring_rule(&self, new: &NewRecurringRule) -> Result<RecurringRule> {
        let merchant = new.merchant.trim();
        if merchant.is_empty() {
            return Err(Error::InvalidData("merchant is required".into()));
        }
        if new.match_type == MatchType::Regex {
            crate::categorize::compile_pattern(merchant)
                .map_err(|e| Error::InvalidData(format!("Invalid regex '{}': {}", merchant, e)))?;
        }

        let id = {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO recurring_rules (merchant, match_type, recurrence_pattern) VALUES (?, ?, ?)",
                params![
                    merchant,
                    new.match_type.as_str(),
                    new.recurrence_pattern.map(|p| p.as_str()),
                ],
            )?;
            conn.last_insert_rowid()
        };

        self.get_recurring_rule(id)?
            .ok_or_else(|| Error::NotFound(format!("Recurring rule {}", id)))
    }

    pub fn update_recurring_rule(
        &self,
        id: i64,
        update: &RecurringRuleUpdate,
    ) -> Result<RecurringRule> {
        let current = self
            .get_recurring_rule(id)?
            .ok_or_else(|| Error::NotFound(format!("Recurring rule {}", id)))?;

        let mut updates = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(merchant) = update.merchant.as_deref() {
            if merchant.trim().is_empty() {
                return Err(Error::InvalidData("merchant cannot be empty".into()));
            }
            updates.push("merchant = ?");
            values.push(Box::new(merchant.trim().to_string()));
        }
        if let Some(match_type) = update.match_type {
            updates.push("match_type = ?");
            values.push(Box::new(match_type.as_str()));
        }
        if let Some(active) = update.active {
            updates.push("active = ?");
            values.push(Box::new(active));
        }
        if let Some(pattern) = update.recurrence_pattern {
            updates.push("recurrence_pattern = ?");
            values.push(Box::new(pattern.as_str()));
        }

        let merchant = update
            .merchant
            .as_deref()
            .map(str::trim)
            .unwrap_or(current.merchant.as_str());
        if update.match_type.unwrap_or(current.match_type) == MatchType::Regex {
            crate::categorize::compile_pattern(merchant)
                .map_err(|e| Error::InvalidData(format!("Invalid regex '{}': {}", merchant, e)))?;
        }

        if !updates.is_empty() {
            values.push(Box::new(id));
            let sql = format!(
                "UPDATE recurring_rules SET {} WHERE id = ?",
                updates.join(", ")
            );
            let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
            self.conn()?.execute(&sql, refs.as_slice())?;
        }

        self.get_recurring_rule(id)?
            .ok_or_else(|| Error::NotFound(format!("Recurring rule {}", id)))
    }

    pub fn delete_recurring_rule(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM recurring_rules WHERE id = ?", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Recurring rule {}", id)));
        }
        Ok(())
    }

    // ========== Merchant category rules ==========

    fn row_to_merchant_rule(row: &rusqlite::Row) -> rusqlite::Result<MerchantCategoryRule> {
        let created_at: String = row.get(5)?;
        Ok(MerchantCategoryRule {
            id: row.get(0)?,
            merchant_pattern: row.get(1)?,
            category: row.get(2)?,
            exact_match: row.get(3)?,
            is_active: row.get(4)?,
            created_at: parse_datetime(&created_at),
        })
    }

    /// All merchant rules in id order
    pub fn list_merchant_rules(&self) -> Result<Vec<MerchantCategoryRule>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM merchant_category_rules ORDER BY id ASC",
            MERCHANT_RULE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rules = stmt
            .query_map([], Self::row_to_merchant_rule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rules)
    }

    pub fn active_merchant_rules(&self) -> Result<Vec<MerchantCategoryRule>> {
        Ok(self
            .list_merchant_rules()?
            .into_iter()
            .filter(|r| r.is_active)
            .collect())
    }

    pub fn get_merchant_rule(&self, id: i64) -> Result<Option<MerchantCategoryRule>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM merchant_category_rules WHERE id = ?",
            MERCHANT_RULE_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![id], Self::row_to_merchant_rule)
            .optional()?)
    }

    pub fn create_merchant_rule(
        &self,
        new: &NewMerchantCategoryRule,
    ) -> Result<MerchantCategoryRule> {
        let pattern = new.merchant_pattern.trim();
        let category = new.category.trim();
        if pattern.is_empty() || category.is_empty() {
            return Err(Error::InvalidData(
                "merchant_pattern and category are required".into(),
            ));
        }

        let id = {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO merchant_category_rules (merchant_pattern, category, exact_match) VALUES (?, ?, ?)",
                params![pattern, category, new.exact_match],
            )?;
            conn.last_insert_rowid()
        };

        self.get_merchant_rule(id)?
            .ok_or_else(|| Error::NotFound(format!("Merchant rule {}", id)))
    }

    pub fn update_merchant_rule(
        &self,
        id: i64,
        update: &MerchantCategoryRuleUpdate,
    ) -> Result<MerchantCategoryRule> {
        if self.get_merchant_rule(id)?.is_none() {
            return Err(Error::NotFound(format!("Merchant rule {}", id)));
        }

        let mut updates = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(pattern) = update.merchant_pattern.as_deref() {
            if pattern.trim().is_empty() {
                return Err(Error::InvalidData("merchant_pattern cannot be empty".into()));
            }
            updates.push("merchant_pattern = ?");
            values.push(Box::new(pattern.trim().to_string()));
        }
        if let Some(category) = update.category.as_deref() {
            if category.trim().is_empty() {
                return Err(Error::InvalidData("category cannot be empty".into()));
            }
            updates.push("category = ?");
            values.push(Box::new(category.trim().to_string()));
        }
        if let Some(exact) = update.exact_match {
            updates.push("exact_match = ?");
            values.push(Box::new(exact));
        }
        if let Some(active) = update.is_active {
            updates.push("is_active = ?");
            values.push(Box::new(active));
        }

        if !updates.is_empty() {
            values.push(Box::new(id));
            let sql = format!(
                "UPDATE merchant_category_rules SET {} WHERE id = ?",
                updates.join(", ")
            );
            let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
            self.conn()?.execute(&sql, refs.as_slice())?;
        }

        self.get_merchant_rule(id)?
            .ok_or_else(|| Error::NotFound(format!("Merchant rule {}", id)))
    }

    pub fn delete_merchant_rule(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM merchant_category_rules WHERE id = ?",
            params![id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Merchant rule {}", id)));
        }
        Ok(())
    }
}
