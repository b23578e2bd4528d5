//! The label generation run loop
//!
//! Fetches the unlabeled messages once, in insertion order, and walks them
//! in fixed-size batches. Each batch gets one prompt; a batch whose service
//! call fails after retries is counted and skipped, never aborting the run.
//! Messages without a usable response entry stay unlabeled and are picked up
//! by the next run.

use crate::client::ReasoningService;
use crate::parse::{parse_response, ParsedBatch};
use crate::prompt::{build_system_prompt, build_user_message};
use crate::retry::RetryPolicy;
use mailsift_core::{CorpusStore, LabelSource, LabelWrite, Message, MessageId, Result, Taxonomy};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Options for one label-generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelerOptions {
    /// Messages per reasoning-service call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Compute and log assignments without persisting anything
    #[serde(default)]
    pub dry_run: bool,

    /// Delete existing llm-sourced assignments before generating
    #[serde(default)]
    pub clear_existing: bool,

    /// Cap on how many unlabeled messages to process this run
    #[serde(default)]
    pub limit: Option<usize>,

    /// Confidence substituted when the service omits one
    #[serde(default = "default_confidence")]
    pub default_confidence: f32,

    /// Backoff policy for transient service failures
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_batch_size() -> usize {
    10
}

fn default_confidence() -> f32 {
    0.8
}

impl Default for LabelerOptions {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            dry_run: false,
            clear_existing: false,
            limit: None,
            default_confidence: default_confidence(),
            retry: RetryPolicy::default(),
        }
    }
}

/// End-of-run accounting; every skipped or failed message is countable.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Assignments persisted with source = llm
    pub labeled: usize,
    /// Assignments computed but not persisted (dry run)
    pub previewed: usize,
    /// Entries rejected at validation (unknown category, bad confidence)
    pub rejected: usize,
    /// Writes refused because a higher-precedence label exists
    pub skipped: usize,
    /// Batch members the response never mentioned
    pub missing: usize,
    /// Accepted entries whose store write failed (e.g. message deleted
    /// mid-run); the rest of the batch still commits
    pub write_failed: usize,
    /// Messages in batches that failed after retry exhaustion
    pub failed: usize,
    /// Batches attempted
    pub batches: usize,
    /// Batches that failed outright
    pub failed_batches: usize,
}

impl RunReport {
    /// One-line human summary
    pub fn summary(&self) -> String {
        format!(
            "labeled {} (previewed {}), rejected {}, skipped {}, missing {}, write failures {}, failed {} across {} batches ({} failed)",
            self.labeled,
            self.previewed,
            self.rejected,
            self.skipped,
            self.missing,
            self.write_failed,
            self.failed,
            self.batches,
            self.failed_batches
        )
    }
}

/// LLM-backed label generator
pub struct LabelGenerator {
    service: Arc<dyn ReasoningService>,
    taxonomy: Arc<Taxonomy>,
    options: LabelerOptions,
}

impl LabelGenerator {
    pub fn new(
        service: Arc<dyn ReasoningService>,
        taxonomy: Arc<Taxonomy>,
        options: LabelerOptions,
    ) -> Self {
        Self {
            service,
            taxonomy,
            options,
        }
    }

    /// Run label generation over every currently-unlabeled message.
    ///
    /// Idempotent by construction: only unlabeled messages are selected, so
    /// a repeat run with no new messages produces zero new assignments
    /// (unless `clear_existing` was requested).
    pub async fn run(&self, store: &dyn CorpusStore) -> Result<RunReport> {
        if self.options.clear_existing && !self.options.dry_run {
            let removed = store.clear_labels(&[LabelSource::Llm])?;
            info!("Cleared {removed} llm-sourced assignments before regeneration");
        }

        let unlabeled = store.get_unlabeled_messages(self.options.limit.unwrap_or(usize::MAX))?;
        if unlabeled.is_empty() {
            info!("No unlabeled messages to classify");
            return Ok(RunReport::default());
        }

        let system_prompt = build_system_prompt(&self.taxonomy);
        let batch_size = self.options.batch_size.max(1);
        let mut report = RunReport::default();

        for batch in unlabeled.chunks(batch_size) {
            report.batches += 1;
            match self.label_batch(&system_prompt, batch).await {
                Ok(parsed) => self.commit_batch(store, batch, parsed, &mut report),
                Err(e) => {
                    report.failed += batch.len();
                    report.failed_batches += 1;
                    warn!(
                        "Batch of {} failed after retries ({e}); continuing with next batch",
                        batch.len()
                    );
                }
            }
        }

        info!("Label generation complete: {}", report.summary());
        Ok(report)
    }

    async fn label_batch(&self, system_prompt: &str, batch: &[Message]) -> Result<ParsedBatch> {
        let user_message = build_user_message(batch);
        let raw = self
            .options
            .retry
            .run(|| self.service.complete(system_prompt, &user_message))
            .await?;
        let batch_ids: HashSet<MessageId> = batch.iter().map(|m| m.id).collect();
        parse_response(&raw, &self.taxonomy, &batch_ids, self.options.default_confidence)
    }

    fn commit_batch(
        &self,
        store: &dyn CorpusStore,
        batch: &[Message],
        parsed: ParsedBatch,
        report: &mut RunReport,
    ) {
        let mut covered: HashSet<MessageId> = parsed.rejected.iter().copied().collect();
        report.rejected += parsed.rejected.len();

        for label in &parsed.accepted {
            covered.insert(label.message_id);
            if self.options.dry_run {
                info!(
                    "[dry run] message {} -> {} ({:.0}%)",
                    label.message_id,
                    label.category,
                    label.confidence * 100.0
                );
                report.previewed += 1;
                continue;
            }
            // One refused write (say, a message deleted mid-run) must not
            // take down its batch siblings or the remaining batches.
            match store.upsert_label(
                label.message_id,
                &label.category,
                label.confidence,
                LabelSource::Llm,
            ) {
                Ok(LabelWrite::Inserted | LabelWrite::Replaced) => report.labeled += 1,
                Ok(LabelWrite::Rejected) => report.skipped += 1,
                Err(e) => {
                    warn!(
                        "Failed to persist label for message {} ({e}); continuing",
                        label.message_id
                    );
                    report.write_failed += 1;
                }
            }
        }

        report.missing += batch.iter().filter(|m| !covered.contains(&m.id)).count();
    }
}
