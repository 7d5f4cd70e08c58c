//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `transactions` - Transaction CRUD, flags and summaries
//! - `transaction_query` - Filter builder for transaction listings
//! - `mappings` - Merchant category mappings and the categorization store
//! - `category_mappings` - Admin-curated bank category overrides
//! - `rules` - Recurring rules and merchant category rules
//! - `audit` - API audit trail

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod audit;
mod category_mappings;
mod mappings;
mod rules;
mod transaction_query;
mod transactions;

pub use audit::AuditEntry;
pub use transaction_query::TransactionQuery;
pub use transactions::TransactionInsertResult;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "FINTRACK_DB_KEY";

/// Derive a SQLCipher key from a passphrase using Argon2
///
/// The salt is fixed per application so a database can be moved or renamed.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted database
    const APP_SALT: &[u8; 16] = b"fintrack-salt-v1";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let output = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(output.as_bytes()))
}

/// Parse a SQLite `CURRENT_TIMESTAMP` string
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Map a UNIQUE constraint failure to `Error::Conflict`
pub(crate) fn conflict_on_unique(e: rusqlite::Error, message: impl FnOnce() -> String) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::Conflict(message())
        }
        _ => Error::Database(e),
    }
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
}

impl Database {
    /// Open an encrypted database
    ///
    /// Requires `FINTRACK_DB_KEY`; use `new_unencrypted()` for local development.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} with your passphrase, \
                or use --no-encrypt for an unencrypted database.",
                DB_KEY_ENV
            ))),
        }
    }

    /// Open an unencrypted database
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open a database with an explicit passphrase (or none)
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = match passphrase {
            Some(pass) => {
                let key_pragma = format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?);
                let manager = manager.with_init(move |conn| conn.execute_batch(&key_pragma));
                Pool::builder().max_size(10).build(manager)?
            }
            None => Pool::builder().max_size(10).build(manager)?,
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Backed by a temp file: SQLCipher builds misbehave with pooled `:memory:` connections.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "fintrack_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().into_owned();
        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Transactions (bank identity is transaction_id + account_id)
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                transaction_id TEXT,
                account_id TEXT,
                date DATE NOT NULL,
                details TEXT NOT NULL,
                amount REAL NOT NULL,
                category TEXT NOT NULL DEFAULT 'Uncategorized',   -- raw bank category
                app_category TEXT NOT NULL DEFAULT 'Other',       -- resolved budgeting category
                transaction_type TEXT NOT NULL DEFAULT 'Debit',   -- Debit, Credit
                notes TEXT,
                is_recurring BOOLEAN NOT NULL DEFAULT 0,
                recurrence_pattern TEXT DEFAULT 'none',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(transaction_id, account_id, date, amount)
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
            CREATE INDEX IF NOT EXISTS idx_transactions_bank_id ON transactions(transaction_id, account_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_app_category ON transactions(app_category);
            CREATE INDEX IF NOT EXISTS idx_transactions_recurring ON transactions(is_recurring);

            -- Learned and curated merchant -> app category mappings
            CREATE TABLE IF NOT EXISTS merchant_category_mappings (
                id INTEGER PRIMARY KEY,
                merchant_name TEXT NOT NULL,
                merchant_pattern TEXT,                    -- case-insensitive regex
                app_category TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 1,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                description TEXT,
                created_by TEXT,                          -- admin, auto-learn, bulk-assign
                usage_count INTEGER NOT NULL DEFAULT 0,
                last_used DATETIME,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_merchant_mappings_unique
                ON merchant_category_mappings(merchant_name COLLATE NOCASE, app_category);
            CREATE INDEX IF NOT EXISTS idx_merchant_mappings_active
                ON merchant_category_mappings(is_active, priority);

            -- Admin-curated bank category overrides
            CREATE TABLE IF NOT EXISTS category_mappings (
                id INTEGER PRIMARY KEY,
                plaid_category TEXT,
                personal_finance_primary TEXT,
                personal_finance_detailed TEXT,
                app_category TEXT NOT NULL,
                description TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_category_mappings_plaid ON category_mappings(plaid_category);
            CREATE INDEX IF NOT EXISTS idx_category_mappings_detailed ON category_mappings(personal_finance_detailed);
            CREATE INDEX IF NOT EXISTS idx_category_mappings_primary ON category_mappings(personal_finance_primary);

            -- Bulk retrocategorization rules
            CREATE TABLE IF NOT EXISTS merchant_category_rules (
                id INTEGER PRIMARY KEY,
                merchant_pattern TEXT NOT NULL,
                category TEXT NOT NULL,
                exact_match BOOLEAN NOT NULL DEFAULT 0,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Rules that flag transactions as recurring
            CREATE TABLE IF NOT EXISTS recurring_rules (
                id INTEGER PRIMARY KEY,
                merchant TEXT NOT NULL,
                match_type TEXT NOT NULL DEFAULT 'exact',  -- exact, contains, regex
                active BOOLEAN NOT NULL DEFAULT 1,
                recurrence_pattern TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Audit log (API access trail)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                user_email TEXT NOT NULL,
                action TEXT NOT NULL,
                entity_type TEXT,
                entity_id INTEGER,
                details TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_log_action ON audit_log(action);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
