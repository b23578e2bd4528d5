//! Corpus store contract
//!
//! The store owns ingested messages and at most one label per message.
//! Persistence technology is behind this trait; the pipeline components only
//! depend on the contract.

use crate::error::Result;
use crate::message::{LabelAssignment, LabelSource, Message, MessageId, NewMessage};
use std::collections::BTreeMap;

/// Outcome of a label write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelWrite {
    /// No prior assignment existed; one was created
    Inserted,
    /// A prior assignment of equal or lower precedence was replaced
    Replaced,
    /// The write was refused: a higher-precedence assignment exists
    Rejected,
}

/// Storage contract for messages and label assignments.
///
/// Invariants the implementation must uphold:
/// - message identity is unique on (account, provider id); duplicate inserts
///   are counted no-ops, never overwrites
/// - at most one label assignment per message
/// - every stored category is a member of the configured taxonomy
/// - confidence is within [0.0, 1.0]
/// - `get_unlabeled_messages` returns ascending insertion order so
///   interrupted runs resume deterministically
pub trait CorpusStore: Send + Sync {
    /// Insert a message. Returns false when (account, provider id) already
    /// exists and the insert was skipped.
    fn insert_message(&self, message: &NewMessage) -> Result<bool>;

    /// Messages with no label assignment, in ascending insertion order
    fn get_unlabeled_messages(&self, limit: usize) -> Result<Vec<Message>>;

    /// All labeled messages with their assignments
    fn get_labeled_messages(&self) -> Result<Vec<(Message, LabelAssignment)>>;

    /// Write a label assignment, applying source precedence.
    ///
    /// Replaces atomically; a lower-precedence write against an existing
    /// higher-precedence assignment is a no-op reported as `Rejected`.
    /// Rejects unknown categories, out-of-range confidence, and unknown
    /// message ids with a validation error.
    fn upsert_label(
        &self,
        message_id: MessageId,
        category: &str,
        confidence: f32,
        source: LabelSource,
    ) -> Result<LabelWrite>;

    /// Delete all assignments whose source is in `sources`; returns how many
    /// were removed.
    fn clear_labels(&self, sources: &[LabelSource]) -> Result<usize>;

    /// Count of assignments per category
    fn label_distribution(&self) -> Result<BTreeMap<String, u64>>;

    /// Total ingested messages
    fn message_count(&self) -> Result<u64>;

    /// Messages with no label assignment
    fn unlabeled_count(&self) -> Result<u64>;
}
