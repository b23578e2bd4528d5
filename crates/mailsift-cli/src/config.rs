//! Application configuration
//!
//! Loaded from an optional YAML file with CLI flags applied on top. Every
//! field has a default so a bare `mailsift` invocation works in the current
//! directory.

use crate::cli::Cli;
use mailsift_labeler::{AnthropicConfig, LabelerOptions};
use mailsift_model::TrainOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Corpus database path
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory the model artifact lives in
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Reasoning-service settings
    #[serde(default)]
    pub llm: LlmSettings,

    /// Label-generation run defaults
    #[serde(default)]
    pub labeling: LabelerOptions,

    /// Training defaults
    #[serde(default)]
    pub training: TrainOptions,
}

/// Optional overrides for the reasoning-service client; anything absent
/// falls back to the client's own defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmSettings {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mailsift.db")
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            model_dir: default_model_dir(),
            llm: LlmSettings::default(),
            labeling: LabelerOptions::default(),
            training: TrainOptions::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and apply CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        if let Some(db) = &cli.db {
            config.db_path = db.clone();
        }
        if let Some(model_dir) = &cli.model_dir {
            config.model_dir = model_dir.clone();
        }

        Ok(config)
    }

    /// Where the classifier artifact is saved and loaded
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join("classifier.bin")
    }

    /// Assemble the reasoning-service client config from the key plus any
    /// file-level overrides.
    pub fn anthropic(&self, api_key: String) -> AnthropicConfig {
        let mut config = AnthropicConfig::new(api_key);
        if let Some(model) = &self.llm.model {
            config.model = model.clone();
        }
        if let Some(base_url) = &self.llm.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(max_tokens) = self.llm.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(timeout) = self.llm.timeout_secs {
            config.timeout_secs = timeout;
        }
        config
    }
}

/// Merge label-command flags over the configured run defaults.
///
/// Boolean flags are presence-only: passing them forces `true`, omitting
/// them leaves whatever the config file set.
pub fn merge_label_options(
    base: &LabelerOptions,
    batch_size: Option<usize>,
    limit: Option<usize>,
    dry_run: bool,
    clear_existing: bool,
) -> LabelerOptions {
    let mut options = base.clone();
    if let Some(batch_size) = batch_size {
        options.batch_size = batch_size;
    }
    if let Some(limit) = limit {
        options.limit = Some(limit);
    }
    if dry_run {
        options.dry_run = true;
    }
    if clear_existing {
        options.clear_existing = true;
    }
    options
}
