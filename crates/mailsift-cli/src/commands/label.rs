//! `mailsift label` — LLM label generation

use crate::config::AppConfig;
use anyhow::{bail, Result};
use mailsift_core::{CorpusStore, Taxonomy};
use mailsift_labeler::{AnthropicClient, LabelGenerator, LabelerOptions};
use std::sync::Arc;
use tracing::info;

pub async fn run(
    store: &dyn CorpusStore,
    taxonomy: Arc<Taxonomy>,
    config: &AppConfig,
    options: LabelerOptions,
    api_key: Option<String>,
) -> Result<()> {
    let Some(api_key) = api_key.filter(|k| !k.is_empty()) else {
        bail!("ANTHROPIC_API_KEY is not set; pass --api-key or export the variable");
    };

    let client = Arc::new(AnthropicClient::new(config.anthropic(api_key))?);
    if options.dry_run {
        info!("Dry run: assignments will be printed but not persisted");
    }

    let generator = LabelGenerator::new(client, taxonomy, options);
    let report = generator.run(store).await?;

    println!("Label generation: {}", report.summary());
    if report.failed_batches > 0 {
        println!(
            "{} batches failed; their messages remain unlabeled and will be retried next run",
            report.failed_batches
        );
    }
    Ok(())
}
