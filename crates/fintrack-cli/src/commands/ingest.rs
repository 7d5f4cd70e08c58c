//! Bank transaction ingestion

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use fintrack_core::{
    parse_bank_transactions, Database, IngestReport, Ingestor, TransactionFilterConfig,
};

use super::truncate;

pub fn cmd_ingest(db: &Database, file: &Path, filter: TransactionFilterConfig) -> Result<()> {
    let report = ingest_file(db, file, filter)?;

    println!();
    println!("📊 Ingestion Results");
    println!("   ─────────────────────────────");
    println!("   Fetched: {}", report.fetched);
    println!("   Saved: {}", report.saved);
    println!("   Duplicates: {}", report.duplicates);
    if report.date_filtering {
        match report.start_date {
            Some(start) => println!("   Filtered (before {}): {}", start, report.filtered),
            None => println!("   Filtered: {}", report.filtered),
        }
    }
    if !report.errors.is_empty() {
        println!();
        println!("⚠️  {} transactions failed:", report.errors.len());
        for err in &report.errors {
            println!(
                "   {} │ {}",
                truncate(&err.transaction_id, 24),
                truncate(&err.error, 60)
            );
        }
    }

    Ok(())
}

/// Parse a JSON batch from `file` and run it through the ingestor
pub fn ingest_file(
    db: &Database,
    file: &Path,
    filter: TransactionFilterConfig,
) -> Result<IngestReport> {
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?,
    );
    let transactions = parse_bank_transactions(reader)
        .with_context(|| format!("Failed to parse transactions from {}", file.display()))?;

    println!(
        "📥 Ingesting {} transactions from {}...",
        transactions.len(),
        file.display()
    );

    Ok(Ingestor::new(db, filter).ingest(&transactions)?)
}
