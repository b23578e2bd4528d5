//! Message and label-assignment data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store-assigned message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ingested message as read back from the corpus store.
///
/// Created once on ingestion and never mutated by the core; deletion is an
/// external administrative action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned identifier
    pub id: MessageId,

    /// Account the message belongs to
    pub account: String,

    /// Provider-assigned message id; unique together with `account`
    pub provider_id: String,

    /// Provider thread id
    pub thread_id: String,

    /// Provider-reported date, epoch milliseconds
    pub internal_date: i64,

    /// Sender address
    pub from_addr: String,

    /// Recipient address
    pub to_addr: String,

    /// Subject line
    pub subject: String,

    /// Short provider-supplied snippet
    pub snippet: String,

    /// Extracted plain-text body
    pub body: String,

    /// Raw provider label set
    pub provider_labels: Vec<String>,

    /// When the message was ingested
    pub ingested_at: DateTime<Utc>,
}

/// Insert payload for a new message.
///
/// Deserializable so the CLI can ingest JSON-lines exports directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub account: String,
    pub provider_id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub internal_date: i64,
    #[serde(default)]
    pub from_addr: String,
    #[serde(default)]
    pub to_addr: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub provider_labels: Vec<String>,
}

/// Provenance of a label assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSource {
    /// Assigned by a human
    Manual,
    /// Assigned by the external reasoning service
    Llm,
    /// Assigned by the local classifier
    Model,
}

impl LabelSource {
    /// Stable string form used in storage and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Llm => "llm",
            Self::Model => "model",
        }
    }

    /// Precedence rank; higher outranks lower.
    ///
    /// Policy: manual > llm > model. A write from a lower-precedence source
    /// never overwrites an existing higher-precedence assignment.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Manual => 2,
            Self::Llm => 1,
            Self::Model => 0,
        }
    }
}

impl fmt::Display for LabelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelSource {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "llm" => Ok(Self::Llm),
            "model" => Ok(Self::Model),
            other => Err(crate::Error::validation(format!(
                "unknown label source '{other}'"
            ))),
        }
    }
}

/// A category assignment for a message; at most one exists per message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelAssignment {
    /// The labeled message
    pub message_id: MessageId,

    /// Taxonomy category name
    pub category: String,

    /// Confidence in [0.0, 1.0]
    pub confidence: f32,

    /// Who assigned the label
    pub source: LabelSource,

    /// When the label was assigned
    pub assigned_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_precedence_order() {
        assert!(LabelSource::Manual.precedence() > LabelSource::Llm.precedence());
        assert!(LabelSource::Llm.precedence() > LabelSource::Model.precedence());
    }

    #[test]
    fn source_string_round_trip() {
        for source in [LabelSource::Manual, LabelSource::Llm, LabelSource::Model] {
            assert_eq!(source.as_str().parse::<LabelSource>().unwrap(), source);
        }
        assert!("robot".parse::<LabelSource>().is_err());
    }

    #[test]
    fn new_message_deserializes_with_defaults() {
        let msg: NewMessage =
            serde_json::from_str(r#"{"account":"a@example.com","provider_id":"x1"}"#).unwrap();
        assert_eq!(msg.account, "a@example.com");
        assert!(msg.subject.is_empty());
        assert!(msg.provider_labels.is_empty());
    }
}
