use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use momo_storage::TransactionFilter;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "momo", version, about = "Classify MoMo SMS messages and load them into SQLite")]
struct Cli {
    /// Config file (defaults to ./momo.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// TOML rule table replacing the built-in one
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify an SMS backup and write the processed and review artifacts
    Process {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        review: Option<PathBuf>,
    },
    /// Load the processed artifact into the database
    Load {
        #[arg(short, long)]
        processed: Option<PathBuf>,
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
    /// List stored transactions, newest first
    Transactions {
        /// Category name, or `all`
        #[arg(short = 't', long = "type", default_value = "all")]
        kind: String,
        /// Inclusive, YYYY-MM-DD
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Inclusive, YYYY-MM-DD
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
    /// Print dashboard aggregates as JSON
    Summary {
        #[arg(short, long)]
        database: Option<PathBuf>,
        /// Summarize the processed artifact instead of the database
        #[arg(long)]
        from_processed: bool,
    },
    /// List the active rule table in priority order
    Categories,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if cli.rules.is_some() {
        config.rules = cli.rules;
    }
    init_tracing(&config.log_level);

    match cli.command {
        Command::Process { input, output, review } => {
            if let Some(p) = input {
                config.input = p;
            }
            if let Some(p) = output {
                config.processed_output = p;
            }
            if let Some(p) = review {
                config.review_output = p;
            }
            commands::process(&config)
        }
        Command::Load { processed, database } => {
            if let Some(p) = processed {
                config.processed_output = p;
            }
            if let Some(p) = database {
                config.database = p;
            }
            commands::load(&config).await
        }
        Command::Transactions { kind, from, to, search, database } => {
            if let Some(p) = database {
                config.database = p;
            }
            let filter = TransactionFilter {
                category: commands::parse_type_filter(&kind)?,
                start_date: from,
                end_date: to,
                search,
            };
            commands::transactions(&config, &filter).await
        }
        Command::Summary { database, from_processed } => {
            if let Some(p) = database {
                config.database = p;
            }
            commands::summary(&config, from_processed).await
        }
        Command::Categories => commands::categories(&config),
    }
}
