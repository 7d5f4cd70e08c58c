//! Database init and shared utilities

use std::path::Path;

use anyhow::{Context, Result};
use fintrack_core::{Database, TransactionFilterConfig};
use tracing::debug;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    debug!(path = path_str, encrypted = !no_encrypt, "Opening database");
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Filter config from an explicit file, else FINTRACK_FILTER_CONFIG, else defaults
pub fn load_filter_config(path: Option<&Path>) -> Result<TransactionFilterConfig> {
    match path {
        Some(path) => TransactionFilterConfig::from_file(path)
            .with_context(|| format!("Failed to load filter config: {}", path.display())),
        None => TransactionFilterConfig::from_env().context("Failed to load filter config"),
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    db.log_audit("cli", "init", None, None, None)
        .context("Failed to write audit log")?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Ingest transactions: fintrack ingest --file transactions.json");
    println!("  2. Start the API: fintrack serve");

    Ok(())
}
