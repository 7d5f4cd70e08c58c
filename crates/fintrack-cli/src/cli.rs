//! CLI argument definitions using clap
//!
//! Command implementations live in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Fintrack - categorize and track personal finance transactions
#[derive(Parser)]
#[command(name = "fintrack")]
#[command(about = "Personal finance transaction categorization backend", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "fintrack.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set FINTRACK_DB_KEY environment variable with your passphrase.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, requests must carry a key from FINTRACK_API_KEYS.
        #[arg(long)]
        no_auth: bool,

        /// TOML file with the transaction date filter (overrides FINTRACK_FILTER_CONFIG)
        #[arg(long)]
        filter_config: Option<PathBuf>,
    },

    /// Resolve the category for a merchant or bank category
    Categorize {
        /// Merchant name
        #[arg(short, long)]
        merchant: Option<String>,

        /// Display name, used when no merchant is given
        #[arg(short, long)]
        name: Option<String>,

        /// Structured primary category code (e.g. FOOD_AND_DRINK)
        #[arg(long)]
        primary: Option<String>,

        /// Structured detailed category code (e.g. FOOD_AND_DRINK_COFFEE)
        #[arg(long)]
        detailed: Option<String>,

        /// Raw bank category label
        #[arg(long)]
        raw: Option<String>,

        /// Show the result without recording usage or learning a mapping
        #[arg(long)]
        dry_run: bool,
    },

    /// Ingest bank transactions from a JSON file
    Ingest {
        /// JSON file: a list of transactions or {"transactions": [...]}
        #[arg(short, long)]
        file: PathBuf,

        /// TOML file with the transaction date filter (overrides FINTRACK_FILTER_CONFIG)
        #[arg(long)]
        filter_config: Option<PathBuf>,
    },

    /// Manage merchant mappings (list, add, delete, match, stats, bulk-assign)
    Mappings {
        #[command(subcommand)]
        action: Option<MappingsAction>,
    },

    /// Recurring rules and detected patterns
    Recurring {
        #[command(subcommand)]
        action: Option<RecurringAction>,
    },

    /// Manage merchant category rules (list, add, delete, apply)
    MerchantRules {
        #[command(subcommand)]
        action: Option<MerchantRulesAction>,
    },

    /// Manage raw category mappings (list, set, delete, backfill, stats)
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },
}

#[derive(Subcommand)]
pub enum MappingsAction {
    /// List mappings, highest priority first
    List {
        /// Filter by merchant name substring
        #[arg(long)]
        merchant: Option<String>,

        /// Filter by app category
        #[arg(long)]
        category: Option<String>,

        /// Include inactive mappings
        #[arg(long)]
        all: bool,
    },

    /// Add a mapping
    Add {
        /// Merchant name
        merchant: String,

        /// App category to assign
        category: String,

        /// Regex pattern matched against merchant names
        #[arg(long)]
        pattern: Option<String>,

        /// Priority (higher wins)
        #[arg(long, default_value = "1")]
        priority: i64,

        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a mapping by ID
    Delete {
        /// Mapping ID
        id: i64,
    },

    /// Look up the mapping for a merchant name
    Match {
        /// Merchant name to match
        merchant: String,
    },

    /// Show mapping usage statistics
    Stats,

    /// Map several merchant name fragments to one category
    BulkAssign {
        /// Comma-separated merchant name fragments
        names: String,

        /// App category to assign
        category: String,

        /// Priority for created mappings
        #[arg(long)]
        priority: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum RecurringAction {
    /// List recurring rules
    Rules,

    /// Add a recurring rule
    AddRule {
        /// Merchant text to match against transaction details
        merchant: String,

        /// Match type: exact, contains, regex
        #[arg(short = 't', long, default_value = "exact")]
        match_type: String,

        /// Recurrence pattern to stamp (e.g. monthly, bi-weekly)
        #[arg(long)]
        pattern: Option<String>,
    },

    /// Delete a recurring rule by ID
    DeleteRule {
        /// Rule ID
        id: i64,
    },

    /// Show cadence summaries of recurring transactions
    Patterns,

    /// Flag transactions matched by active rules as recurring
    Apply,
}

#[derive(Subcommand)]
pub enum MerchantRulesAction {
    /// List merchant category rules
    List,

    /// Add a merchant category rule
    Add {
        /// Regex (or exact text with --exact) matched against transaction details
        pattern: String,

        /// App category to assign
        category: String,

        /// Match the whole details string instead of a regex
        #[arg(long)]
        exact: bool,
    },

    /// Delete a rule by ID
    Delete {
        /// Rule ID
        id: i64,
    },

    /// Recategorize stored transactions with the active rules
    Apply,
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List category mappings
    List,

    /// Map a raw or structured bank category to an app category
    Set {
        /// App category to assign
        category: String,

        /// Raw bank category label
        #[arg(long)]
        raw: Option<String>,

        /// Structured primary code
        #[arg(long)]
        primary: Option<String>,

        /// Structured detailed code
        #[arg(long)]
        detailed: Option<String>,
    },

    /// Delete the mappings for a raw bank category
    Delete {
        /// Raw bank category label
        raw: String,
    },

    /// Fill unassigned transaction categories from raw category mappings
    Backfill,

    /// Show categorization coverage
    Stats,
}
