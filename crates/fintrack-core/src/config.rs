//! Transaction date-filter configuration
//!
//! Controls which bank transactions are accepted during ingestion and how far
//! back a fetch from the bank-data provider should reach. The value is owned
//! by whatever composes the application and passed in explicitly.

use std::path::Path;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// Environment variable pointing at a TOML filter config file
pub const FILTER_CONFIG_ENV: &str = "FINTRACK_FILTER_CONFIG";

/// Upper bound for `max_days_requested` (one hundred years)
pub const MAX_DAYS_REQUESTED_LIMIT: i64 = 36_500;

fn default_start_date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2025, 1, 1)
}

/// Date filter applied to incoming transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionFilterConfig {
    /// When false every transaction is accepted
    pub enable_date_filtering: bool,
    /// Transactions dated before this are dropped
    pub default_start_date: Option<NaiveDate>,
    /// Furthest back (in days) a fetch may reach
    pub max_days_requested: i64,
    pub description: String,
}

impl Default for TransactionFilterConfig {
    fn default() -> Self {
        Self {
            enable_date_filtering: true,
            default_start_date: default_start_date(),
            max_days_requested: 730,
            description: "Transactions are filtered to start from January 1, 2025.".to_string(),
        }
    }
}

/// Partial update for the filter config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionFilterUpdate {
    pub enable_date_filtering: Option<bool>,
    pub default_start_date: Option<NaiveDate>,
    pub max_days_requested: Option<i64>,
}

impl TransactionFilterConfig {
    /// Load from a TOML file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `FINTRACK_FILTER_CONFIG` when set, otherwise defaults
    pub fn from_env() -> Result<Self> {
        match std::env::var(FILTER_CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim())),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if !(0..=MAX_DAYS_REQUESTED_LIMIT).contains(&self.max_days_requested) {
            return Err(Error::Config(format!(
                "max_days_requested must be between 0 and {}, got {}",
                MAX_DAYS_REQUESTED_LIMIT, self.max_days_requested
            )));
        }
        Ok(())
    }

    /// Whether a transaction dated `date` passes the filter
    pub fn should_include(&self, date: NaiveDate) -> bool {
        match (self.enable_date_filtering, self.default_start_date) {
            (true, Some(start)) => date >= start,
            _ => true,
        }
    }

    /// Earliest date to request from the provider, relative to `today`
    ///
    /// Never earlier than `today - max_days_requested`.
    pub fn fetch_start_date(&self, today: NaiveDate) -> NaiveDate {
        let furthest = today
            .checked_sub_signed(Duration::days(self.max_days_requested))
            .unwrap_or(NaiveDate::MIN);
        match (self.enable_date_filtering, self.default_start_date) {
            (true, Some(start)) => start.max(furthest),
            _ => furthest,
        }
    }

    /// Apply a partial update, rejecting invalid values without changing anything
    pub fn apply_update(&mut self, update: &TransactionFilterUpdate) -> Result<()> {
        let mut next = self.clone();
        if let Some(enabled) = update.enable_date_filtering {
            next.enable_date_filtering = enabled;
        }
        if let Some(start) = update.default_start_date {
            next.default_start_date = Some(start);
        }
        if let Some(days) = update.max_days_requested {
            next.max_days_requested = days;
        }
        next.validate()?;

        *self = next;
        info!(
            enable_date_filtering = self.enable_date_filtering,
            default_start_date = ?self.default_start_date,
            max_days_requested = self.max_days_requested,
            "Transaction filter configuration updated"
        );
        Ok(())
    }
}
