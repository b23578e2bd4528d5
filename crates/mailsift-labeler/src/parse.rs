//! Structured-response parsing and validation
//!
//! The reasoning service is instructed to return a bare JSON array, but real
//! responses sometimes arrive fenced or wrapped in an object. Entries are
//! validated one by one: an unknown category or out-of-range confidence
//! rejects that entry (the message stays unlabeled), never coerces it to a
//! fallback category.

use mailsift_core::{Error, MessageId, Result, Taxonomy};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

/// Wrapper keys some models emit instead of a bare array
const WRAPPER_KEYS: &[&str] = &["classifications", "results", "emails"];

/// A validated per-message label from one batch response
#[derive(Debug, Clone, PartialEq)]
pub struct BatchLabel {
    pub message_id: MessageId,
    pub category: String,
    pub confidence: f32,
}

/// Outcome of parsing one batch response
#[derive(Debug, Default)]
pub struct ParsedBatch {
    /// Entries that passed validation
    pub accepted: Vec<BatchLabel>,
    /// Batch members whose entry was present but invalid
    pub rejected: Vec<MessageId>,
    /// Entries that could not be tied to a batch member at all
    pub discarded: usize,
}

#[derive(Deserialize)]
struct RawEntry {
    id: Option<i64>,
    label: Option<String>,
    confidence: Option<f64>,
}

/// Strip Markdown code fences the model sometimes wraps JSON in
fn strip_code_fences(raw: &str) -> String {
    if !raw.trim_start().starts_with("```") {
        return raw.to_string();
    }
    raw.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse and validate one batch response.
///
/// `batch_ids` is the set of message ids actually sent in the batch; entries
/// referencing anything else are discarded. A response that is not JSON at
/// all (or not an array) is a malformed-response error, which the caller
/// treats as a whole-batch failure eligible for retry on a later run.
pub fn parse_response(
    raw: &str,
    taxonomy: &Taxonomy,
    batch_ids: &HashSet<MessageId>,
    default_confidence: f32,
) -> Result<ParsedBatch> {
    let text = strip_code_fences(raw);
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| Error::malformed(format!("response is not valid JSON: {e}")))?;

    let array = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let inner = WRAPPER_KEYS.iter().find_map(|key| map.remove(*key));
            match inner {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(Error::malformed(
                        "expected a JSON array (or a known wrapper object around one)",
                    ))
                }
            }
        }
        other => {
            return Err(Error::malformed(format!(
                "expected a JSON array, got {}",
                type_name(&other)
            )))
        }
    };

    let mut parsed = ParsedBatch::default();
    let mut seen: HashSet<MessageId> = HashSet::new();

    for item in array {
        let entry: RawEntry = match serde_json::from_value(item) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding unparseable batch entry: {e}");
                parsed.discarded += 1;
                continue;
            }
        };

        let message_id = match entry.id {
            Some(id) if batch_ids.contains(&MessageId(id)) => MessageId(id),
            Some(id) => {
                warn!("Discarding entry for id {id}: not in this batch");
                parsed.discarded += 1;
                continue;
            }
            None => {
                warn!("Discarding entry with no message id");
                parsed.discarded += 1;
                continue;
            }
        };

        if !seen.insert(message_id) {
            warn!("Discarding duplicate entry for message {message_id}");
            parsed.discarded += 1;
            continue;
        }

        let category = match entry.label {
            Some(label) if taxonomy.contains(&label) => label,
            Some(label) => {
                warn!(
                    "Rejecting message {message_id}: category '{label}' is not in the taxonomy"
                );
                parsed.rejected.push(message_id);
                continue;
            }
            None => {
                warn!("Rejecting message {message_id}: entry has no label");
                parsed.rejected.push(message_id);
                continue;
            }
        };

        // Absent confidence gets the explicit configured default; an
        // out-of-range value rejects the entry rather than being clamped.
        let confidence = match entry.confidence {
            Some(c) if (0.0..=1.0).contains(&c) => c as f32,
            Some(c) => {
                warn!("Rejecting message {message_id}: confidence {c} out of range");
                parsed.rejected.push(message_id);
                continue;
            }
            None => default_confidence,
        };

        parsed.accepted.push(BatchLabel {
            message_id,
            category,
            confidence,
        });
    }

    Ok(parsed)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
