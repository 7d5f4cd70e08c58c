//! Admin-curated bank category -> app category overrides

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    CategoryDistribution, CategoryMapping, CategoryStats, NewCategoryMapping,
    UNASSIGNED_APP_CATEGORY, UNCATEGORIZED,
};

const CATEGORY_COLUMNS: &str = "id, plaid_category, personal_finance_primary, \
     personal_finance_detailed, app_category, description, is_active, created_at";

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

impl Database {
    fn row_to_category_mapping(row: &rusqlite::Row) -> rusqlite::Result<CategoryMapping> {
        let created_at: String = row.get(7)?;
        Ok(CategoryMapping {
            id: row.get(0)?,
            plaid_category: row.get(1)?,
            personal_finance_primary: row.get(2)?,
            personal_finance_detailed: row.get(3)?,
            app_category: row.get(4)?,
            description: row.get(5)?,
            is_active: row.get(6)?,
            created_at: parse_datetime(&created_at),
        })
    }

    /// All mappings ordered by raw category
    pub fn list_category_mappings(&self) -> Result<Vec<CategoryMapping>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM category_mappings ORDER BY plaid_category ASC, id ASC",
            CATEGORY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mappings = stmt
            .query_map([], Self::row_to_category_mapping)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(mappings)
    }

    pub fn get_category_mapping(&self, id: i64) -> Result<Option<CategoryMapping>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM category_mappings WHERE id = ?", CATEGORY_COLUMNS);
        Ok(conn
            .query_row(&sql, params![id], Self::row_to_category_mapping)
            .optional()?)
    }

    /// Create a mapping; at least one bank category code is required
    pub fn create_category_mapping(&self, new: &NewCategoryMapping) -> Result<CategoryMapping> {
        let app_category = new.app_category.trim();
        if app_category.is_empty() {
            return Err(Error::InvalidData("app_category is required".into()));
        }
        let plaid = non_blank(new.plaid_category.as_deref());
        let primary = non_blank(new.personal_finance_primary.as_deref());
        let detailed = non_blank(new.personal_finance_detailed.as_deref());
        if plaid.is_none() && primary.is_none() && detailed.is_none() {
            return Err(Error::InvalidData(
                "One of plaid_category, personal_finance_primary or personal_finance_detailed is required"
                    .into(),
            ));
        }

        let id = {
            let conn = self.conn()?;
            conn.execute(
                r#"
                INSERT INTO category_mappings
                    (plaid_category, personal_finance_primary, personal_finance_detailed, app_category, description)
                VALUES (?, ?, ?, ?, ?)
                "#,
                params![plaid, primary, detailed, app_category, new.description],
            )?;
            conn.last_insert_rowid()
        };

        self.get_category_mapping(id)?
            .ok_or_else(|| Error::NotFound(format!("Category mapping {}", id)))
    }

    /// Find-or-create by raw category and point it at `app_category`
    pub fn upsert_plaid_category_mapping(
        &self,
        plaid_category: &str,
        app_category: &str,
    ) -> Result<CategoryMapping> {
        let plaid_category = plaid_category.trim();
        let app_category = app_category.trim();
        if plaid_category.is_empty() || app_category.is_empty() {
            return Err(Error::InvalidData(
                "plaid_category and app_category are required".into(),
            ));
        }

        let conn = self.conn()?;
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM category_mappings WHERE plaid_category = ? ORDER BY id LIMIT 1",
                params![plaid_category],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE category_mappings SET app_category = ?, is_active = 1 WHERE id = ?",
                    params![app_category, id],
                )?;
                id
            }
            None => {
                conn.execute(
                    "INSERT INTO category_mappings (plaid_category, app_category) VALUES (?, ?)",
                    params![plaid_category, app_category],
                )?;
                conn.last_insert_rowid()
            }
        };
        drop(conn);

        self.get_category_mapping(id)?
            .ok_or_else(|| Error::NotFound(format!("Category mapping {}", id)))
    }

    /// Delete every mapping for a raw category, returning how many went
    pub fn delete_category_mapping_by_plaid(&self, plaid_category: &str) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM category_mappings WHERE plaid_category = ?",
            params![plaid_category.trim()],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!(
                "Category mapping for {}",
                plaid_category
            )));
        }
        Ok(deleted)
    }

    pub fn delete_category_mapping(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM category_mappings WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Category mapping {}", id)));
        }
        Ok(())
    }

    /// Detailed-code override first, then a primary-only row
    pub fn find_structured_override(
        &self,
        primary: Option<&str>,
        detailed: Option<&str>,
    ) -> Result<Option<String>> {
        let conn = self.conn()?;

        if let Some(detailed) = detailed {
            let found: Option<String> = conn
                .query_row(
                    r#"
                    SELECT app_category FROM category_mappings
                    WHERE is_active = 1 AND personal_finance_detailed = ?
                    ORDER BY id LIMIT 1
                    "#,
                    params![detailed],
                    |row| row.get(0),
                )
                .optional()?;
            if found.is_some() {
                return Ok(found);
            }
        }

        match primary {
            Some(primary) => Ok(conn
                .query_row(
                    r#"
                    SELECT app_category FROM category_mappings
                    WHERE is_active = 1
                      AND personal_finance_primary = ?
                      AND personal_finance_detailed IS NULL
                    ORDER BY id LIMIT 1
                    "#,
                    params![primary],
                    |row| row.get(0),
                )
                .optional()?),
            None => Ok(None),
        }
    }

    /// Assign app categories to unassigned transactions from the raw-category mappings
    pub fn backfill_categories(&self) -> Result<usize> {
        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE transactions
            SET app_category = (
                SELECT cm.app_category FROM category_mappings cm
                WHERE cm.is_active = 1 AND cm.plaid_category = transactions.category
                ORDER BY cm.id LIMIT 1
            )
            WHERE app_category = ?1
              AND category != ?2
              AND EXISTS (
                SELECT 1 FROM category_mappings cm
                WHERE cm.is_active = 1 AND cm.plaid_category = transactions.category
              )
            "#,
            params![UNASSIGNED_APP_CATEGORY, UNCATEGORIZED],
        )?;

        info!(updated, "Backfilled transaction categories");
        Ok(updated)
    }

    /// Coverage of app categories across stored transactions
    pub fn category_stats(&self) -> Result<CategoryStats> {
        let conn = self.conn()?;

        let total_mappings: i64 =
            conn.query_row("SELECT COUNT(*) FROM category_mappings", [], |row| row.get(0))?;
        let total_transactions: i64 =
            conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        let categorized_transactions: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE app_category != ?",
            params![UNASSIGNED_APP_CATEGORY],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            r#"
            SELECT app_category, COUNT(*) AS count, COALESCE(SUM(amount), 0)
            FROM transactions
            GROUP BY app_category
            ORDER BY count DESC, app_category ASC
            "#,
        )?;
        let category_distribution = stmt
            .query_map([], |row| {
                Ok(CategoryDistribution {
                    category: row.get(0)?,
                    count: row.get(1)?,
                    total_amount: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let categorization_rate = if total_transactions > 0 {
            let rate = categorized_transactions as f64 / total_transactions as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        } else {
            0.0
        };

        Ok(CategoryStats {
            total_mappings,
            total_transactions,
            categorized_transactions,
            categorization_rate,
            category_distribution,
        })
    }
}
