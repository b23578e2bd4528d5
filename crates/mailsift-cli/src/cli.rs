use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mailsift")]
#[command(
    author,
    version,
    about = "Personal email classification: LLM-bootstrapped labels, local model"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "mailsift.yaml", global = true)]
    pub config: String,

    /// Corpus database path (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Directory holding the model artifact (overrides the config file)
    #[arg(long, global = true)]
    pub model_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest messages from a JSON-lines export (idempotent)
    Import {
        /// JSON-lines file, one message object per line
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Generate label assignments for unlabeled messages via the LLM
    Label {
        /// Messages per reasoning-service call
        #[arg(long)]
        batch_size: Option<usize>,

        /// Cap on how many unlabeled messages to process
        #[arg(long)]
        limit: Option<usize>,

        /// Compute and print assignments without persisting anything
        #[arg(long)]
        dry_run: bool,

        /// Delete existing llm-sourced assignments before generating
        #[arg(long)]
        clear_existing: bool,

        /// Anthropic API key
        #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Manually label messages, with existing machine labels as suggestions
    Review {
        /// Cap on how many messages to review
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Train the local classifier on all labeled messages
    Train {
        /// Fraction of examples held out for evaluation
        #[arg(long)]
        test_size: Option<f32>,

        /// Seed for the split shuffle and forest randomness
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Predict categories for unlabeled messages with the trained model
    Classify {
        /// Cap on how many unlabeled messages to classify
        #[arg(long)]
        limit: Option<usize>,

        /// Print predictions without persisting anything
        #[arg(long)]
        dry_run: bool,

        /// Confidence below this is flagged as uncertain
        #[arg(long)]
        threshold: Option<f32>,
    },

    /// Show the label distribution grouped by urgency
    Summary,
}
