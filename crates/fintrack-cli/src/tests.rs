//! CLI command tests

use std::io::Write;

use chrono::NaiveDate;
use fintrack_core::db::TransactionInsertResult;
use fintrack_core::models::{MerchantMappingFilter, NewTransaction, TransactionType};
use fintrack_core::{Database, TransactionFilterConfig};

use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn insert_test_transaction(
    db: &Database,
    details: &str,
    date: (i32, u32, u32),
    amount: f64,
) -> i64 {
    let tx = NewTransaction {
        transaction_id: None,
        account_id: None,
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        details: details.to_string(),
        amount,
        category: None,
        app_category: None,
        transaction_type: TransactionType::Debit,
        notes: None,
        is_recurring: false,
        recurrence_pattern: None,
    };
    match db.insert_transaction(&tx).unwrap() {
        TransactionInsertResult::Inserted(id) => id,
        TransactionInsertResult::Duplicate(id) => panic!("unexpected duplicate {}", id),
    }
}

fn write_temp_file(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn all_mappings(db: &Database) -> Vec<fintrack_core::models::MerchantMapping> {
    db.list_merchant_mappings(&MerchantMappingFilter::default())
        .unwrap()
}

// ========== Shared Utility Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("exactly10!", 10), "exactly10!");
    assert_eq!(truncate("this is a long string", 10), "this is...");
    assert_eq!(truncate("café crème brûlée", 8), "café ...");
}

#[test]
fn test_open_db_and_init_unencrypted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fintrack.db");

    commands::cmd_init(&path, true).unwrap();
    assert!(path.exists());

    let db = commands::open_db(&path, true).unwrap();
    let entries = db.list_audit_log(10).unwrap();
    assert_eq!(entries[0].action, "init");
}

#[test]
fn test_load_filter_config_from_file() {
    let file = write_temp_file(
        "enable_date_filtering = false\nmax_days_requested = 90\n",
        ".toml",
    );

    let config = commands::load_filter_config(Some(file.path())).unwrap();
    assert!(!config.enable_date_filtering);
    assert_eq!(config.max_days_requested, 90);
    assert_eq!(
        config.default_start_date,
        NaiveDate::from_ymd_opt(2025, 1, 1)
    );
}

#[test]
fn test_load_filter_config_rejects_negative_days() {
    let file = write_temp_file("max_days_requested = -1\n", ".toml");
    assert!(commands::load_filter_config(Some(file.path())).is_err());
}

// ========== Categorize Command Tests ==========

#[test]
fn test_category_input_from_flags() {
    let input = commands::category_input(None, Some("Cafe".into()), None, None, None);
    assert!(input.personal_finance_category.is_none());
    assert!(input.category.is_none());
    assert_eq!(input.merchant(), Some("Cafe"));

    let input = commands::category_input(
        None,
        None,
        Some("FOOD_AND_DRINK".into()),
        None,
        Some("Coffee".into()),
    );
    let pfc = input.personal_finance_category.unwrap();
    assert_eq!(pfc.primary.as_deref(), Some("FOOD_AND_DRINK"));
    assert!(pfc.detailed.is_none());
    assert_eq!(input.category, Some(vec!["Coffee".to_string()]));
}

#[test]
fn test_cmd_categorize_dry_run_does_not_learn() {
    let db = setup_test_db();
    let input = commands::category_input(Some("Starbucks".into()), None, None, None, None);

    commands::cmd_categorize(&db, &input, true).unwrap();
    assert!(all_mappings(&db).is_empty());

    commands::cmd_categorize(&db, &input, false).unwrap();
    let mappings = all_mappings(&db);
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].app_category, "Coffee Shops");
}

#[test]
fn test_cmd_categorize_without_signal() {
    let db = setup_test_db();
    let input = commands::category_input(None, None, None, None, None);
    assert!(commands::cmd_categorize(&db, &input, false).is_ok());
    assert!(all_mappings(&db).is_empty());
}

// ========== Mapping Command Tests ==========

#[test]
fn test_cmd_mappings_add_list_delete() {
    let db = setup_test_db();
    commands::cmd_mappings_add(&db, "Netflix", "Subscriptions", None, 4, None).unwrap();

    let mappings = all_mappings(&db);
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].priority, 4);
    assert_eq!(mappings[0].created_by.as_deref(), Some("cli"));

    assert!(commands::cmd_mappings_list(&db, Some("net"), None, false).is_ok());
    assert!(commands::cmd_mappings_list(&db, None, None, true).is_ok());

    commands::cmd_mappings_delete(&db, mappings[0].id).unwrap();
    assert!(all_mappings(&db).is_empty());
    assert!(commands::cmd_mappings_delete(&db, mappings[0].id).is_err());
}

#[test]
fn test_cmd_mappings_add_duplicate() {
    let db = setup_test_db();
    commands::cmd_mappings_add(&db, "Netflix", "Subscriptions", None, 1, None).unwrap();
    let result = commands::cmd_mappings_add(&db, "netflix", "Subscriptions", None, 1, None);
    assert!(result.is_err());
}

#[test]
fn test_cmd_mappings_add_invalid_pattern() {
    let db = setup_test_db();
    let result = commands::cmd_mappings_add(&db, "Broken", "Shopping", Some("([a-z"), 1, None);
    assert!(result.is_err());
}

#[test]
fn test_cmd_mappings_match_and_stats() {
    let db = setup_test_db();
    commands::cmd_mappings_add(&db, "Amazon", "Shopping", Some("amzn"), 2, None).unwrap();

    commands::cmd_mappings_match(&db, "AMZN Mktp").unwrap();
    assert_eq!(all_mappings(&db)[0].usage_count, 1);

    assert!(commands::cmd_mappings_match(&db, "Unknown Store").is_ok());
    assert!(commands::cmd_mappings_match(&db, " ").is_err());
    assert!(commands::cmd_mappings_stats(&db).is_ok());
}

#[test]
fn test_cmd_mappings_bulk_assign() {
    let db = setup_test_db();
    let id = insert_test_transaction(&db, "UBER *TRIP", (2025, 3, 2), 14.0);

    commands::cmd_mappings_bulk_assign(&db, "uber, lyft", "Taxi & Ride Shares", None).unwrap();

    assert_eq!(all_mappings(&db).len(), 2);
    assert_eq!(
        db.get_transaction(id).unwrap().unwrap().app_category,
        "Taxi & Ride Shares"
    );
    assert!(commands::cmd_mappings_bulk_assign(&db, " , ", "Taxi & Ride Shares", None).is_err());
}

// ========== Recurring Command Tests ==========

#[test]
fn test_cmd_recurring_rule_lifecycle() {
    let db = setup_test_db();
    for (month, day) in [(1, 3), (2, 3), (3, 4)] {
        insert_test_transaction(&db, "SPOTIFY P0123", (2025, month, day), 11.99);
    }

    assert!(commands::cmd_recurring_rules(&db).is_ok());
    commands::cmd_recurring_add_rule(&db, "spotify", "contains", Some("monthly")).unwrap();
    let rules = db.list_recurring_rules().unwrap();
    assert_eq!(rules.len(), 1);

    commands::cmd_recurring_apply(&db).unwrap();
    let patterns = db.recurring_patterns().unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].transaction_count, 3);
    assert!(commands::cmd_recurring_patterns(&db).is_ok());

    commands::cmd_recurring_delete_rule(&db, rules[0].id).unwrap();
    assert!(db.list_recurring_rules().unwrap().is_empty());
}

#[test]
fn test_cmd_recurring_add_rule_invalid_input() {
    let db = setup_test_db();

    let result = commands::cmd_recurring_add_rule(&db, "netflix", "fuzzy", None);
    assert!(result.unwrap_err().to_string().contains("valid types"));

    assert!(commands::cmd_recurring_add_rule(&db, "netflix", "exact", Some("fortnightly")).is_err());
    assert!(commands::cmd_recurring_add_rule(&db, "(netflix", "regex", None).is_err());
    assert!(db.list_recurring_rules().unwrap().is_empty());
}

// ========== Merchant Rule Command Tests ==========

#[test]
fn test_cmd_merchant_rules() {
    let db = setup_test_db();
    let id = insert_test_transaction(&db, "SQ *BLUE BOTTLE", (2025, 4, 1), 6.5);

    assert!(commands::cmd_merchant_rules_list(&db).is_ok());
    commands::cmd_merchant_rules_add(&db, "^sq \\*", "Restaurants & Bars", false).unwrap();
    commands::cmd_merchant_rules_apply(&db).unwrap();
    assert_eq!(
        db.get_transaction(id).unwrap().unwrap().app_category,
        "Restaurants & Bars"
    );

    let rules = db.list_merchant_rules().unwrap();
    commands::cmd_merchant_rules_delete(&db, rules[0].id).unwrap();
    assert!(commands::cmd_merchant_rules_delete(&db, rules[0].id).is_err());
}

// ========== Category Command Tests ==========

#[test]
fn test_cmd_categories_set_raw_upserts() {
    let db = setup_test_db();
    commands::cmd_categories_set(&db, "Groceries", Some("Supermarkets"), None, None).unwrap();
    commands::cmd_categories_set(&db, "Shopping", Some("Supermarkets"), None, None).unwrap();

    let mappings = db.list_category_mappings().unwrap();
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].app_category, "Shopping");
    assert!(commands::cmd_categories_list(&db).is_ok());

    commands::cmd_categories_delete(&db, "Supermarkets").unwrap();
    assert!(db.list_category_mappings().unwrap().is_empty());
}

#[test]
fn test_cmd_categories_set_structured() {
    let db = setup_test_db();
    commands::cmd_categories_set(&db, "Coffee Shops", None, Some("FOOD_AND_DRINK"), None)
        .unwrap();

    let input = commands::category_input(
        Some("Corner Spot".into()),
        None,
        Some("FOOD_AND_DRINK".into()),
        Some("FOOD_AND_DRINK_OTHER".into()),
        None,
    );
    commands::cmd_categorize(&db, &input, false).unwrap();
    let mappings = all_mappings(&db);
    assert_eq!(mappings[0].app_category, "Coffee Shops");
    assert_eq!(mappings[0].priority, 5);

    assert!(commands::cmd_categories_set(&db, "Coffee Shops", None, None, None).is_err());
}

#[test]
fn test_cmd_categories_backfill_and_stats() {
    let db = setup_test_db();
    let id = insert_test_transaction(&db, "Hotel", (2025, 6, 1), 220.0);
    db.update_transaction_category(id, "Lodging").unwrap();

    commands::cmd_categories_set(&db, "Travel & Vacation", Some("Lodging"), None, None).unwrap();
    commands::cmd_categories_backfill(&db).unwrap();
    assert_eq!(
        db.get_transaction(id).unwrap().unwrap().app_category,
        "Travel & Vacation"
    );
    assert!(commands::cmd_categories_stats(&db).is_ok());
}

// ========== Ingest Command Tests ==========

fn ingest_fixture() -> String {
    serde_json::json!({
        "transactions": [
            {
                "transaction_id": "a1", "account_id": "visa", "date": "2025-07-01",
                "name": "STARBUCKS STORE 12", "merchant_name": "Starbucks", "amount": 5.25
            },
            {
                "transaction_id": "a2", "account_id": "visa", "date": "2024-11-20",
                "name": "Old Purchase", "amount": 10.0
            }
        ]
    })
    .to_string()
}

#[test]
fn test_ingest_file_applies_filter() {
    let db = setup_test_db();
    let file = write_temp_file(&ingest_fixture(), ".json");

    let report =
        commands::ingest_file(&db, file.path(), TransactionFilterConfig::default()).unwrap();
    assert_eq!(report.fetched, 2);
    assert_eq!(report.saved, 1);
    assert_eq!(report.filtered, 1);

    // Re-ingesting the same batch only finds duplicates
    assert!(commands::cmd_ingest(&db, file.path(), TransactionFilterConfig::default()).is_ok());
    assert_eq!(db.transaction_summary().unwrap().total_transactions, 1);
}

#[test]
fn test_ingest_file_without_date_filter() {
    let db = setup_test_db();
    let file = write_temp_file(&ingest_fixture(), ".json");
    let filter = TransactionFilterConfig {
        enable_date_filtering: false,
        ..Default::default()
    };

    let report = commands::ingest_file(&db, file.path(), filter).unwrap();
    assert_eq!(report.saved, 2);
    assert_eq!(report.filtered, 0);
}

#[test]
fn test_ingest_file_errors() {
    let db = setup_test_db();
    let missing = std::path::Path::new("/nonexistent/batch.json");
    assert!(commands::ingest_file(&db, missing, TransactionFilterConfig::default()).is_err());

    let bad = write_temp_file("{\"rows\": 1}", ".json");
    let err = commands::ingest_file(&db, bad.path(), TransactionFilterConfig::default())
        .unwrap_err();
    assert!(err.to_string().contains("Failed to parse"));
}
