//! Integration tests for fintrack-core
//!
//! These tests exercise the full ingest → categorize → recurring workflow
//! through the public API.

use fintrack_core::{
    db::Database,
    models::{
        Cadence, MatchType, MerchantMappingFilter, NewCategoryMapping, NewMerchantCategoryRule,
        NewRecurringRule, RecurrencePattern,
    },
    parse_bank_transactions, Ingestor, TransactionFilterConfig, TransactionQuery,
};

/// Three monthly subscriptions, four charges each, in the wrapped batch form
fn subscription_batch() -> String {
    let mut rows = Vec::new();
    for (month, day) in [(2, 15), (3, 15), (4, 15), (5, 15)] {
        rows.push(serde_json::json!({
            "transaction_id": format!("nf-{}", month), "account_id": "visa",
            "date": format!("2025-{:02}-{:02}", month, day),
            "name": "NETFLIX.COM", "amount": 15.49
        }));
    }
    for (month, day) in [(2, 20), (3, 20), (4, 21), (5, 20)] {
        rows.push(serde_json::json!({
            "transaction_id": format!("sp-{}", month), "account_id": "visa",
            "date": format!("2025-{:02}-{:02}", month, day),
            "name": "SPOTIFY P2C4", "amount": 10.99,
            "personal_finance_category": {
                "primary": "ENTERTAINMENT",
                "detailed": "ENTERTAINMENT_MUSIC_AND_AUDIO"
            }
        }));
    }
    for (month, day) in [(2, 1), (3, 1), (4, 1), (5, 1)] {
        rows.push(serde_json::json!({
            "transaction_id": format!("hu-{}", month), "account_id": "visa",
            "date": format!("2025-{:02}-{:02}", month, day),
            "name": "HULU", "amount": 17.99, "category": ["Service"]
        }));
    }
    serde_json::json!({ "transactions": rows }).to_string()
}

// =============================================================================
// Ingestion Integration Tests
// =============================================================================

#[test]
fn test_full_ingest_workflow() {
    let db = Database::in_memory().expect("Failed to create in-memory database");

    let transactions =
        parse_bank_transactions(subscription_batch().as_bytes()).expect("Failed to parse batch");
    assert_eq!(transactions.len(), 12);

    let ingestor = Ingestor::new(&db, TransactionFilterConfig::default());
    let report = ingestor.ingest(&transactions).unwrap();
    assert_eq!(report.saved, 12);
    assert!(report.errors.is_empty());

    let query = TransactionQuery::new();
    assert_eq!(db.count_transactions(&query).unwrap(), 12);

    // Ingesting again only finds duplicates
    let report = ingestor.ingest(&transactions).unwrap();
    assert_eq!(report.saved, 0);
    assert_eq!(report.duplicates, 12);

    let march = TransactionQuery::new().month(Some("2025-03"));
    assert_eq!(db.count_transactions(&march).unwrap(), 3);
}

#[test]
fn test_category_sources_during_ingest() {
    let db = Database::in_memory().unwrap();
    db.create_category_mapping(&NewCategoryMapping {
        plaid_category: None,
        personal_finance_primary: Some("ENTERTAINMENT".into()),
        personal_finance_detailed: Some("ENTERTAINMENT_MUSIC_AND_AUDIO".into()),
        app_category: "Entertainment & Recreation".into(),
        description: None,
    })
    .unwrap();

    let transactions = parse_bank_transactions(subscription_batch().as_bytes()).unwrap();
    Ingestor::new(&db, TransactionFilterConfig::default())
        .ingest(&transactions)
        .unwrap();

    let spotify = db
        .list_transactions(&TransactionQuery::new().search(Some("spotify")))
        .unwrap();
    assert_eq!(spotify.len(), 4);
    assert!(spotify
        .iter()
        .all(|t| t.app_category == "Entertainment & Recreation"));

    // No merchant signal and no keyword: default category, nothing learned
    let netflix = db
        .list_transactions(&TransactionQuery::new().search(Some("netflix")))
        .unwrap();
    assert!(netflix.iter().all(|t| t.app_category == "Miscellaneous"));

    let learned = db
        .list_merchant_mappings(&MerchantMappingFilter::default())
        .unwrap();
    assert!(learned.iter().all(|m| m.merchant_name != "NETFLIX.COM"));
    let spotify_mapping = learned
        .iter()
        .find(|m| m.merchant_name == "SPOTIFY P2C4")
        .expect("Structured match should be learned");
    assert_eq!(spotify_mapping.priority, 5);
}

#[test]
fn test_learned_mapping_reused_on_next_batch() {
    let db = Database::in_memory().unwrap();
    let ingestor = Ingestor::new(&db, TransactionFilterConfig::default());

    let first = parse_bank_transactions(
        r#"[{"transaction_id": "s1", "account_id": "debit", "date": "2025-06-02",
             "name": "SBUX 0042", "merchant_name": "Starbucks", "amount": 4.10}]"#
            .as_bytes(),
    )
    .unwrap();
    ingestor.ingest(&first).unwrap();

    let mappings = db
        .list_merchant_mappings(&MerchantMappingFilter::default())
        .unwrap();
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].app_category, "Coffee Shops");
    assert_eq!((mappings[0].priority, mappings[0].usage_count), (1, 1));

    // Admin edits the learned mapping; the next batch follows it
    db.update_merchant_mapping(
        mappings[0].id,
        &fintrack_core::models::MerchantMappingUpdate {
            app_category: Some("Restaurants & Bars".into()),
            ..Default::default()
        },
    )
    .unwrap();

    let second = parse_bank_transactions(
        r#"[{"transaction_id": "s2", "account_id": "debit", "date": "2025-06-09",
             "name": "SBUX 0042", "merchant_name": "starbucks", "amount": 5.60}]"#
            .as_bytes(),
    )
    .unwrap();
    ingestor.ingest(&second).unwrap();

    let latest = db
        .list_transactions(&TransactionQuery::new().limit(Some(1)))
        .unwrap();
    assert_eq!(latest[0].app_category, "Restaurants & Bars");
    let mapping = db.get_merchant_mapping(mappings[0].id).unwrap().unwrap();
    assert_eq!(mapping.usage_count, 2);
}

// =============================================================================
// Recurring and Rule Integration Tests
// =============================================================================

#[test]
fn test_recurring_workflow() {
    let db = Database::in_memory().unwrap();
    let transactions = parse_bank_transactions(subscription_batch().as_bytes()).unwrap();
    Ingestor::new(&db, TransactionFilterConfig::default())
        .ingest(&transactions)
        .unwrap();

    for merchant in ["netflix", "spotify", "hulu"] {
        db.create_recurring_rule(&NewRecurringRule {
            merchant: merchant.into(),
            match_type: MatchType::Contains,
            recurrence_pattern: Some(RecurrencePattern::Monthly),
        })
        .unwrap();
    }

    assert_eq!(db.apply_recurring_rules().unwrap().updated, 12);
    assert_eq!(db.apply_recurring_rules().unwrap().updated, 0);

    let patterns = db.recurring_patterns().unwrap();
    assert_eq!(patterns.len(), 3);
    assert!(patterns.iter().all(|p| p.pattern == Cadence::Monthly));
    assert!(patterns.iter().all(|p| p.transaction_count == 4));

    let recurring = TransactionQuery::new().is_recurring(Some(true));
    assert_eq!(db.count_transactions(&recurring).unwrap(), 12);
}

#[test]
fn test_merchant_rules_override_pipeline() {
    let db = Database::in_memory().unwrap();
    db.create_merchant_rule(&NewMerchantCategoryRule {
        merchant_pattern: "^hulu$".into(),
        category: "Entertainment & Recreation".into(),
        exact_match: false,
    })
    .unwrap();

    let transactions = parse_bank_transactions(subscription_batch().as_bytes()).unwrap();
    Ingestor::new(&db, TransactionFilterConfig::default())
        .ingest(&transactions)
        .unwrap();

    let query = TransactionQuery::new().app_category(Some("Entertainment & Recreation"));
    let hulu = db.list_transactions(&query).unwrap();
    assert_eq!(hulu.len(), 4);
    assert!(hulu.iter().all(|t| t.details == "HULU"));

    // Already applied during ingest
    assert_eq!(db.apply_merchant_rules().unwrap().updated, 0);
}

#[test]
fn test_date_filter_window() {
    let db = Database::in_memory().unwrap();
    let filter = TransactionFilterConfig {
        default_start_date: chrono::NaiveDate::from_ymd_opt(2025, 4, 1),
        ..Default::default()
    };

    let transactions = parse_bank_transactions(subscription_batch().as_bytes()).unwrap();
    let report = Ingestor::new(&db, filter).ingest(&transactions).unwrap();
    assert_eq!(report.fetched, 12);
    assert_eq!(report.saved, 6);
    assert_eq!(report.filtered, 6);
}

// =============================================================================
// Persistence Integration Tests
// =============================================================================

#[test]
fn test_file_database_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fintrack.db");
    let path = path.to_str().unwrap();

    {
        let db = Database::new_unencrypted(path).unwrap();
        let transactions = parse_bank_transactions(subscription_batch().as_bytes()).unwrap();
        Ingestor::new(&db, TransactionFilterConfig::default())
            .ingest(&transactions)
            .unwrap();
    }

    let db = Database::new_unencrypted(path).unwrap();
    assert_eq!(db.count_transactions(&TransactionQuery::new()).unwrap(), 12);
}

#[test]
fn test_encrypted_database_with_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("encrypted.db");
    let path = path.to_str().unwrap();

    {
        let db = Database::new_with_key(path, Some("correct horse")).unwrap();
        db.log_audit("test", "init", None, None, None).unwrap();
    }

    let db = Database::new_with_key(path, Some("correct horse")).unwrap();
    assert_eq!(db.list_audit_log(10).unwrap().len(), 1);
}
