//! MailSift CLI
//!
//! Pipeline driver for personal email classification: ingest a message
//! export, bootstrap labels with an LLM, train the local classifier, then
//! classify new mail without further API calls.

use anyhow::Result;
use clap::Parser;
use mailsift_core::Taxonomy;
use mailsift_store::SqliteStore;
use std::sync::Arc;
use tracing::info;

mod cli;
mod commands;
mod config;

use cli::{Cli, Commands};
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AppConfig::load(&cli.config, &cli)?;
    let taxonomy = Arc::new(Taxonomy::personal_inbox());
    let store = SqliteStore::open(&config.db_path, Arc::clone(&taxonomy))?;
    info!("Corpus database: {}", config.db_path.display());

    match cli.command {
        Commands::Import { file } => commands::import::run(&store, &file),
        Commands::Label {
            batch_size,
            limit,
            dry_run,
            clear_existing,
            api_key,
        } => {
            let options = config::merge_label_options(
                &config.labeling,
                batch_size,
                limit,
                dry_run,
                clear_existing,
            );
            commands::label::run(&store, taxonomy, &config, options, api_key).await
        }
        Commands::Review { limit } => commands::review::run(&store, &taxonomy, limit),
        Commands::Train { test_size, seed } => {
            let mut options = config.training.clone();
            if let Some(test_size) = test_size {
                options.test_size = test_size;
            }
            if let Some(seed) = seed {
                options.seed = seed;
            }
            commands::train::run(&store, &config.model_path(), &options)
        }
        Commands::Classify {
            limit,
            dry_run,
            threshold,
        } => commands::classify::run(&store, &config.model_path(), limit, dry_run, threshold),
        Commands::Summary => commands::summary::run(&store, &taxonomy),
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("mailsift=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mailsift=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
