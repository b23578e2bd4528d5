//! `mailsift import` — JSON-lines message ingestion

use anyhow::{Context, Result};
use mailsift_core::{CorpusStore, NewMessage};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;

/// Ingest one message object per line. Re-running over the same export is a
/// no-op: duplicates on (account, provider id) are counted, not overwritten.
pub fn run(store: &dyn CorpusStore, file: &Path) -> Result<()> {
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("cannot open {}", file.display()))?,
    );

    let mut inserted = 0usize;
    let mut duplicates = 0usize;
    let mut invalid = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let message: NewMessage = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!("Skipping line {}: {e}", line_no + 1);
                invalid += 1;
                continue;
            }
        };
        if store.insert_message(&message)? {
            inserted += 1;
        } else {
            duplicates += 1;
        }
    }

    println!("Imported {inserted} messages ({duplicates} duplicates skipped, {invalid} invalid lines)");
    Ok(())
}
