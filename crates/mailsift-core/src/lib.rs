//! MailSift Core
//!
//! Shared types and contracts for the email labeling-to-inference pipeline.
//!
//! This crate provides:
//! - The closed category taxonomy with urgency groups and priority ordering
//! - Message and label-assignment data model
//! - The deterministic feature builder shared by training and inference
//! - The `CorpusStore` trait consumed by the labeler, trainer, and predictor
//! - Error types and result handling

pub mod error;
pub mod feature;
pub mod message;
pub mod store;
pub mod taxonomy;

pub use error::{Error, Result};
pub use feature::build_feature;
pub use message::{LabelAssignment, LabelSource, Message, MessageId, NewMessage};
pub use store::{CorpusStore, LabelWrite};
pub use taxonomy::{CategorySpec, Taxonomy, UrgencyGroup};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::feature::build_feature;
    pub use crate::message::{LabelAssignment, LabelSource, Message, MessageId, NewMessage};
    pub use crate::store::{CorpusStore, LabelWrite};
    pub use crate::taxonomy::{CategorySpec, Taxonomy, UrgencyGroup};
}
