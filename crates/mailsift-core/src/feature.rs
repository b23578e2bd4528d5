//! Deterministic feature extraction
//!
//! Training and inference must see byte-identical feature strings for the
//! same message, so this is the single definition both call.

use crate::message::Message;

/// Maximum number of body characters included in the feature string
pub const BODY_PREFIX_CHARS: usize = 500;

/// Build the classifier input for a message: sender, subject, and a bounded
/// body prefix joined by single spaces. Total — missing fields contribute
/// empty strings.
pub fn build_feature(message: &Message) -> String {
    let body_prefix: String = message.body.chars().take(BODY_PREFIX_CHARS).collect();
    format!("{} {} {}", message.from_addr, message.subject, body_prefix)
}
