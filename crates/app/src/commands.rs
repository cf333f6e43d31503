use std::path::Path;

use anyhow::{Context, Result};
use momo_core::{Category, Role, TransactionRecord};
use momo_import::{summarize, BatchPipeline, BatchStats, Normalizer, RuleTable};
use momo_storage::{DbPool, TransactionFilter};
use serde::Serialize;
use tracing::info;

use crate::config::AppConfig;

fn load_rules(config: &AppConfig) -> Result<RuleTable> {
    let table = RuleTable::load(config.rules.as_deref()).with_context(|| match &config.rules {
        Some(p) => format!("loading rule table {}", p.display()),
        None => "building the built-in rule table".to_string(),
    })?;
    Ok(table)
}

async fn open_db(path: &Path) -> Result<DbPool> {
    let db = momo_storage::create_db(path)
        .await
        .with_context(|| format!("opening database {}", path.display()))?;
    momo_storage::seed_transaction_types(&db)
        .await
        .context("seeding transaction types")?;
    Ok(db)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_processed(path: &Path) -> Result<Vec<TransactionRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading processed output {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("parsing processed output {}", path.display()))
}

// ── process ──────────────────────────────────────────────────────────────────

pub fn run_process(config: &AppConfig) -> Result<BatchStats> {
    let table = load_rules(config)?;
    let pipeline = BatchPipeline::new(Normalizer::new(&table));
    let stats = pipeline
        .process_file(&config.input, &config.processed_output, &config.review_output)
        .with_context(|| format!("processing {}", config.input.display()))?;
    Ok(stats)
}

pub fn process(config: &AppConfig) -> Result<()> {
    let stats = run_process(config)?;
    println!("Processed:   {}", stats.processed);
    println!("Unprocessed: {}", stats.unprocessed);
    println!("Errors:      {}", stats.errors);
    println!("Processed data saved to {}", config.processed_output.display());
    println!("Review log saved to {}", config.review_output.display());
    Ok(())
}

// ── load ─────────────────────────────────────────────────────────────────────

pub async fn load(config: &AppConfig) -> Result<()> {
    let records = read_processed(&config.processed_output)?;
    let db = open_db(&config.database).await?;
    let inserted = momo_storage::load_transactions(&db, &records)
        .await
        .context("loading transactions")?;
    info!(database = %config.database.display(), inserted, "load finished");
    println!(
        "Loaded {inserted} of {} records into {}",
        records.len(),
        config.database.display()
    );
    Ok(())
}

// ── queries ──────────────────────────────────────────────────────────────────

/// `all` (any case) disables the category filter.
pub fn parse_type_filter(value: &str) -> Result<Option<Category>> {
    if value.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    let category = value
        .parse::<Category>()
        .with_context(|| format!("unknown transaction type '{value}'"))?;
    Ok(Some(category))
}

pub async fn transactions(config: &AppConfig, filter: &TransactionFilter) -> Result<()> {
    let db = open_db(&config.database).await?;
    let rows = momo_storage::query_transactions(&db, filter)
        .await
        .context("querying transactions")?;
    print_json(&rows)
}

/// From the database, or from the processed artifact when `from_artifact` is set.
pub async fn summary(config: &AppConfig, from_artifact: bool) -> Result<()> {
    let summary = if from_artifact {
        summarize(&read_processed(&config.processed_output)?)
    } else {
        let db = open_db(&config.database).await?;
        momo_storage::get_summary(&db)
            .await
            .context("computing summary")?
    };
    print_json(&summary)
}

// ── categories ───────────────────────────────────────────────────────────────

pub fn describe_rules(table: &RuleTable) -> Vec<String> {
    table
        .rules()
        .enumerate()
        .map(|(i, rule)| {
            let flow = match rule.role() {
                Role::CounterpartySends => "counterparty -> you",
                Role::HolderSends => "you -> counterparty",
            };
            format!(
                "{:>2}. {} ({flow}, {} pattern{})",
                i + 1,
                rule.category,
                rule.patterns.len(),
                if rule.patterns.len() == 1 { "" } else { "s" }
            )
        })
        .collect()
}

pub fn categories(config: &AppConfig) -> Result<()> {
    let table = load_rules(config)?;
    for line in describe_rules(&table) {
        println!("{line}");
    }
    println!("Anything else: {}", Category::Unknown);
    Ok(())
}
