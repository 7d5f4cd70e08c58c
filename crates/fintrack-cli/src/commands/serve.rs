//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::{load_filter_config, open_db};

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    filter_config: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting fintrack server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    let api_keys = fintrack_server::parse_api_keys(
        &std::env::var(fintrack_server::API_KEYS_ENV).unwrap_or_default(),
    );
    let filter = load_filter_config(filter_config)?;

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else if api_keys.is_empty() {
        println!(
            "   ⚠️  No API keys configured; set {} or every request is rejected",
            fintrack_server::API_KEYS_ENV
        );
    } else {
        println!(
            "   🔑 API keys: {} configured ({})",
            api_keys.len(),
            fintrack_server::API_KEYS_ENV
        );
    }
    if filter.enable_date_filtering {
        match filter.default_start_date {
            Some(start) => println!("   📅 Date filter: from {}", start),
            None => println!("   📅 Date filter: enabled, no start date"),
        }
    } else {
        println!("   📅 Date filter: disabled");
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let config = fintrack_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins: vec![],
        api_keys,
    };

    fintrack_server::serve(db, host, port, config, filter).await
}
