//! MailSift Labeler
//!
//! Turns batches of unlabeled messages into taxonomy-constrained label
//! assignments by prompting an external reasoning service, validating and
//! repairing its structured output, and writing the results through the
//! corpus store with `source = llm`.
//!
//! This crate provides:
//! - The `ReasoningService` seam and the production Anthropic client
//! - Prompt construction from the taxonomy
//! - Response parsing with per-entry validation (never coerces categories)
//! - A bounded retry policy with exponential backoff and jitter
//! - The batch run loop with per-batch failure isolation and a run report

pub mod client;
pub mod generator;
pub mod parse;
pub mod prompt;
pub mod retry;

pub use client::{AnthropicClient, AnthropicConfig, ReasoningService};
pub use generator::{LabelGenerator, LabelerOptions, RunReport};
pub use parse::{BatchLabel, ParsedBatch};
pub use retry::RetryPolicy;
