//! Fintrack CLI - Personal finance categorization backend
//!
//! Usage:
//!   fintrack init                          Initialize database
//!   fintrack ingest --file batch.json      Store bank transactions
//!   fintrack categorize --merchant NAME    Resolve a category
//!   fintrack serve --port 3000             Start the REST API

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            filter_config,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                filter_config.as_deref(),
            )
            .await
        }
        Commands::Categorize {
            merchant,
            name,
            primary,
            detailed,
            raw,
            dry_run,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let input = commands::category_input(merchant, name, primary, detailed, raw);
            commands::cmd_categorize(&db, &input, dry_run)
        }
        Commands::Ingest {
            file,
            filter_config,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let filter = commands::load_filter_config(filter_config.as_deref())?;
            commands::cmd_ingest(&db, &file, filter)
        }
        Commands::Mappings { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_mappings_list(&db, None, None, false),
                Some(MappingsAction::List {
                    merchant,
                    category,
                    all,
                }) => {
                    commands::cmd_mappings_list(&db, merchant.as_deref(), category.as_deref(), all)
                }
                Some(MappingsAction::Add {
                    merchant,
                    category,
                    pattern,
                    priority,
                    description,
                }) => commands::cmd_mappings_add(
                    &db,
                    &merchant,
                    &category,
                    pattern.as_deref(),
                    priority,
                    description.as_deref(),
                ),
                Some(MappingsAction::Delete { id }) => commands::cmd_mappings_delete(&db, id),
                Some(MappingsAction::Match { merchant }) => {
                    commands::cmd_mappings_match(&db, &merchant)
                }
                Some(MappingsAction::Stats) => commands::cmd_mappings_stats(&db),
                Some(MappingsAction::BulkAssign {
                    names,
                    category,
                    priority,
                }) => commands::cmd_mappings_bulk_assign(&db, &names, &category, priority),
            }
        }
        Commands::Recurring { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(RecurringAction::Rules) => commands::cmd_recurring_rules(&db),
                Some(RecurringAction::AddRule {
                    merchant,
                    match_type,
                    pattern,
                }) => commands::cmd_recurring_add_rule(
                    &db,
                    &merchant,
                    &match_type,
                    pattern.as_deref(),
                ),
                Some(RecurringAction::DeleteRule { id }) => {
                    commands::cmd_recurring_delete_rule(&db, id)
                }
                Some(RecurringAction::Patterns) => commands::cmd_recurring_patterns(&db),
                Some(RecurringAction::Apply) => commands::cmd_recurring_apply(&db),
            }
        }
        Commands::MerchantRules { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(MerchantRulesAction::List) => commands::cmd_merchant_rules_list(&db),
                Some(MerchantRulesAction::Add {
                    pattern,
                    category,
                    exact,
                }) => commands::cmd_merchant_rules_add(&db, &pattern, &category, exact),
                Some(MerchantRulesAction::Delete { id }) => {
                    commands::cmd_merchant_rules_delete(&db, id)
                }
                Some(MerchantRulesAction::Apply) => commands::cmd_merchant_rules_apply(&db),
            }
        }
        Commands::Categories { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(CategoriesAction::List) => commands::cmd_categories_list(&db),
                Some(CategoriesAction::Set {
                    category,
                    raw,
                    primary,
                    detailed,
                }) => commands::cmd_categories_set(
                    &db,
                    &category,
                    raw.as_deref(),
                    primary.as_deref(),
                    detailed.as_deref(),
                ),
                Some(CategoriesAction::Delete { raw }) => commands::cmd_categories_delete(&db, &raw),
                Some(CategoriesAction::Backfill) => commands::cmd_categories_backfill(&db),
                Some(CategoriesAction::Stats) => commands::cmd_categories_stats(&db),
            }
        }
    }
}
