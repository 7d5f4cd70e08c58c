//! Merchant category mapping operations
//!
//! Backs the first tier of the categorization pipeline. Merchant names are
//! compared with `COLLATE NOCASE` so the store agrees with the in-memory
//! exact-tier matcher.

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{conflict_on_unique, parse_datetime, Database};
use crate::categorize::{compile_pattern, CategoryResolver, CategoryStore, LearnOutcome};
use crate::error::{Error, Result};
use crate::models::{
    CategoryUsage, LearningConfidence, MappingMatch, MappingStats, MerchantMapping,
    MerchantMappingFilter, MerchantMappingUpdate, MerchantUsage, NewMerchantMapping,
};

const MAPPING_COLUMNS: &str = "id, merchant_name, merchant_pattern, app_category, priority, \
     is_active, description, created_by, usage_count, last_used, created_at, updated_at";

const TOP_N: i64 = 10;

/// Reject a pattern that would never compile at match time
fn validate_pattern(pattern: Option<&str>) -> Result<()> {
    if let Some(p) = pattern.filter(|p| !p.trim().is_empty()) {
        compile_pattern(p)
            .map_err(|e| Error::InvalidData(format!("Invalid merchant pattern '{}': {}", p, e)))?;
    }
    Ok(())
}

impl Database {
    fn row_to_mapping(row: &rusqlite::Row) -> rusqlite::Result<MerchantMapping> {
        let last_used: Option<String> = row.get(9)?;
        let created_at: String = row.get(10)?;
        let updated_at: String = row.get(11)?;
        Ok(MerchantMapping {
            id: row.get(0)?,
            merchant_name: row.get(1)?,
            merchant_pattern: row.get(2)?,
            app_category: row.get(3)?,
            priority: row.get(4)?,
            is_active: row.get(5)?,
            description: row.get(6)?,
            created_by: row.get(7)?,
            usage_count: row.get(8)?,
            last_used: last_used.map(|s| parse_datetime(&s)),
            created_at: parse_datetime(&created_at),
            updated_at: parse_datetime(&updated_at),
        })
    }

    fn query_mappings(
        &self,
        where_clause: &str,
        order_clause: &str,
        values: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<MerchantMapping>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM merchant_category_mappings {} {}",
            MAPPING_COLUMNS, where_clause, order_clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let mappings = stmt
            .query_map(values, Self::row_to_mapping)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(mappings)
    }

    /// List mappings, highest priority then usage first
    pub fn list_merchant_mappings(
        &self,
        filter: &MerchantMappingFilter,
    ) -> Result<Vec<MerchantMapping>> {
        let mut conditions = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(name) = filter.merchant_name.as_deref().filter(|n| !n.trim().is_empty()) {
            conditions.push("merchant_name LIKE ? COLLATE NOCASE");
            values.push(Box::new(format!("%{}%", name.trim())));
        }
        if let Some(category) = filter.app_category.as_deref().filter(|c| !c.trim().is_empty()) {
            conditions.push("app_category = ?");
            values.push(Box::new(category.trim().to_string()));
        }
        if let Some(active) = filter.is_active {
            conditions.push("is_active = ?");
            values.push(Box::new(active));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        self.query_mappings(
            &where_clause,
            "ORDER BY priority DESC, usage_count DESC, created_at DESC, id DESC",
            &refs,
        )
    }

    pub fn get_merchant_mapping(&self, id: i64) -> Result<Option<MerchantMapping>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM merchant_category_mappings WHERE id = ?",
            MAPPING_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![id], Self::row_to_mapping)
            .optional()?)
    }

    /// Mapping for (merchant, category); merchant compared case-insensitively
    pub fn find_merchant_mapping(
        &self,
        merchant_name: &str,
        app_category: &str,
    ) -> Result<Option<MerchantMapping>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM merchant_category_mappings
             WHERE merchant_name = ? COLLATE NOCASE AND app_category = ?",
            MAPPING_COLUMNS
        );
        Ok(conn
            .query_row(
                &sql,
                params![merchant_name.trim(), app_category.trim()],
                Self::row_to_mapping,
            )
            .optional()?)
    }

    /// Create a mapping; Conflict when (merchant, category) already exists
    pub fn create_merchant_mapping(&self, new: &NewMerchantMapping) -> Result<MerchantMapping> {
        let merchant = new.merchant_name.trim();
        let category = new.app_category.trim();
        if merchant.is_empty() || category.is_empty() {
            return Err(Error::InvalidData(
                "merchant_name and app_category are required".into(),
            ));
        }
        let pattern = new
            .merchant_pattern
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());
        validate_pattern(pattern)?;

        if self.find_merchant_mapping(merchant, category)?.is_some() {
            return Err(Error::Conflict(format!(
                "Mapping already exists for {} -> {}",
                merchant, category
            )));
        }

        let id = {
            let conn = self.conn()?;
            conn.execute(
                r#"
                INSERT INTO merchant_category_mappings
                    (merchant_name, merchant_pattern, app_category, priority, description, created_by)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
                params![
                    merchant,
                    pattern,
                    category,
                    new.priority,
                    new.description,
                    new.created_by.as_deref().unwrap_or("admin"),
                ],
            )
            .map_err(|e| {
                conflict_on_unique(e, || {
                    format!("Mapping already exists for {} -> {}", merchant, category)
                })
            })?;
            conn.last_insert_rowid()
        };

        self.get_merchant_mapping(id)?
            .ok_or_else(|| Error::NotFound(format!("Merchant mapping {}", id)))
    }

    /// Partial update; an empty pattern clears it
    pub fn update_merchant_mapping(
        &self,
        id: i64,
        update: &MerchantMappingUpdate,
    ) -> Result<MerchantMapping> {
        if self.get_merchant_mapping(id)?.is_none() {
            return Err(Error::NotFound(format!("Merchant mapping {}", id)));
        }

        let mut updates = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(name) = update.merchant_name.as_deref() {
            if name.trim().is_empty() {
                return Err(Error::InvalidData("merchant_name cannot be empty".into()));
            }
            updates.push("merchant_name = ?");
            values.push(Box::new(name.trim().to_string()));
        }
        if let Some(pattern) = update.merchant_pattern.as_deref() {
            let pattern = Some(pattern.trim()).filter(|p| !p.is_empty());
            validate_pattern(pattern)?;
            updates.push("merchant_pattern = ?");
            values.push(Box::new(pattern.map(String::from)));
        }
        if let Some(category) = update.app_category.as_deref() {
            if category.trim().is_empty() {
                return Err(Error::InvalidData("app_category cannot be empty".into()));
            }
            updates.push("app_category = ?");
            values.push(Box::new(category.trim().to_string()));
        }
        if let Some(priority) = update.priority {
            updates.push("priority = ?");
            values.push(Box::new(priority));
        }
        if let Some(active) = update.is_active {
            updates.push("is_active = ?");
            values.push(Box::new(active));
        }
        if let Some(description) = update.description.as_deref() {
            updates.push("description = ?");
            values.push(Box::new(description.to_string()));
        }

        if !updates.is_empty() {
            updates.push("updated_at = CURRENT_TIMESTAMP");
            values.push(Box::new(id));
            let sql = format!(
                "UPDATE merchant_category_mappings SET {} WHERE id = ?",
                updates.join(", ")
            );
            let refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
            let conn = self.conn()?;
            conn.execute(&sql, refs.as_slice()).map_err(|e| {
                conflict_on_unique(e, || {
                    "Another mapping already uses this merchant and category".to_string()
                })
            })?;
        }

        self.get_merchant_mapping(id)?
            .ok_or_else(|| Error::NotFound(format!("Merchant mapping {}", id)))
    }

    pub fn delete_merchant_mapping(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM merchant_category_mappings WHERE id = ?",
            params![id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Merchant mapping {}", id)));
        }
        Ok(())
    }

    /// Re-assert a bulk-assigned mapping: new priority, optional description, fresh last_used
    pub fn refresh_bulk_mapping(
        &self,
        id: i64,
        priority: i64,
        description: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE merchant_category_mappings
            SET priority = ?,
                description = COALESCE(?, description),
                last_used = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![priority, description, id],
        )?;
        Ok(())
    }

    /// Insert a bulk-assigned mapping with zero usage
    pub fn insert_bulk_mapping(
        &self,
        merchant_name: &str,
        app_category: &str,
        priority: i64,
        description: &str,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO merchant_category_mappings
                (merchant_name, app_category, priority, description, created_by, usage_count, last_used)
            VALUES (?, ?, ?, ?, 'bulk-assign', 0, CURRENT_TIMESTAMP)
            "#,
            params![merchant_name, app_category, priority, description],
        )
        .map_err(|e| {
            conflict_on_unique(e, || {
                format!("Mapping already exists for {} -> {}", merchant_name, app_category)
            })
        })?;
        Ok(conn.last_insert_rowid())
    }

    /// Two-tier match plus usage recording
    pub fn match_merchant(&self, merchant_name: &str) -> Result<MappingMatch> {
        if merchant_name.trim().is_empty() {
            return Err(Error::InvalidData("merchant_name is required".into()));
        }
        CategoryResolver::new(self).match_merchant(merchant_name)
    }

    pub fn mapping_stats(&self) -> Result<MappingStats> {
        let conn = self.conn()?;

        let (total_mappings, active_mappings, total_usage): (i64, i64, i64) = conn.query_row(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN is_active THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(usage_count), 0)
            FROM merchant_category_mappings
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let mut stmt = conn.prepare(
            r#"
            SELECT app_category, SUM(usage_count) AS total_usage, COUNT(*) AS mapping_count
            FROM merchant_category_mappings
            GROUP BY app_category
            ORDER BY total_usage DESC, app_category ASC
            LIMIT ?
            "#,
        )?;
        let top_categories = stmt
            .query_map(params![TOP_N], |row| {
                Ok(CategoryUsage {
                    app_category: row.get(0)?,
                    total_usage: row.get(1)?,
                    mapping_count: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT merchant_name, usage_count, app_category
            FROM merchant_category_mappings
            WHERE is_active = 1
            ORDER BY usage_count DESC, id ASC
            LIMIT ?
            "#,
        )?;
        let top_merchants = stmt
            .query_map(params![TOP_N], |row| {
                Ok(MerchantUsage {
                    merchant_name: row.get(0)?,
                    usage_count: row.get(1)?,
                    app_category: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(MappingStats {
            total_mappings,
            active_mappings,
            total_usage,
            top_categories,
            top_merchants,
        })
    }
}

impl CategoryStore for Database {
    fn exact_mapping_candidates(&self, merchant_name: &str) -> Result<Vec<MerchantMapping>> {
        self.query_mappings(
            "WHERE is_active = 1 AND merchant_name = ? COLLATE NOCASE",
            "ORDER BY priority DESC, usage_count DESC, id ASC",
            &[&merchant_name],
        )
    }

    fn pattern_mapping_candidates(&self) -> Result<Vec<MerchantMapping>> {
        self.query_mappings(
            "WHERE is_active = 1 AND merchant_pattern IS NOT NULL AND TRIM(merchant_pattern) != ''",
            "ORDER BY priority DESC, usage_count DESC, id ASC",
            &[],
        )
    }

    fn structured_override(
        &self,
        primary: Option<&str>,
        detailed: Option<&str>,
    ) -> Result<Option<String>> {
        self.find_structured_override(primary, detailed)
    }

    fn record_mapping_usage(&self, mapping_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE merchant_category_mappings
            SET usage_count = usage_count + 1, last_used = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![mapping_id],
        )?;
        Ok(())
    }

    fn record_learned_mapping(
        &self,
        merchant_name: &str,
        app_category: &str,
        confidence: LearningConfidence,
    ) -> Result<LearnOutcome> {
        if let Some(existing) = self.find_merchant_mapping(merchant_name, app_category)? {
            self.record_mapping_usage(existing.id)?;
            return Ok(LearnOutcome::Reinforced {
                mapping_id: existing.id,
            });
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO merchant_category_mappings
                (merchant_name, app_category, priority, description, created_by, usage_count, last_used)
            VALUES (?, ?, ?, ?, 'auto-learn', 1, CURRENT_TIMESTAMP)
            "#,
            params![
                merchant_name.trim(),
                app_category.trim(),
                confidence.seed_priority(),
                format!("Auto-learned ({} confidence)", confidence),
            ],
        )?;
        let mapping_id = conn.last_insert_rowid();
        info!(
            merchant = merchant_name,
            category = app_category,
            %confidence,
            "Learned new merchant mapping"
        );
        Ok(LearnOutcome::Created { mapping_id })
    }
}
