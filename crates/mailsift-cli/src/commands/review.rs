//! `mailsift review` — interactive manual labeling
//!
//! Walks every message without a manual label, showing any existing
//! machine-assigned label as a suggestion, and writes accepted answers as
//! `source = manual` assignments at confidence 1.0. Manual labels outrank
//! machine labels, so a reviewed message is never silently re-labeled by a
//! later generation or classification run.

use anyhow::Result;
use mailsift_core::{CorpusStore, LabelAssignment, LabelSource, Message, Taxonomy, UrgencyGroup};
use std::io::{BufRead, Write};

const BODY_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Default, PartialEq, Eq)]
struct ReviewStats {
    labeled: usize,
    skipped: usize,
}

pub fn run(store: &dyn CorpusStore, taxonomy: &Taxonomy, limit: Option<usize>) -> Result<()> {
    let stdin = std::io::stdin();
    let stats = review_session(
        store,
        taxonomy,
        limit,
        &mut stdin.lock(),
        &mut std::io::stdout(),
    )?;
    println!(
        "Review complete: {} labeled, {} skipped",
        stats.labeled, stats.skipped
    );
    Ok(())
}

/// Everything without a manual label, in insertion order: unlabeled
/// messages plus machine-labeled ones carried as suggestions.
fn candidates(
    store: &dyn CorpusStore,
    limit: Option<usize>,
) -> Result<Vec<(Message, Option<LabelAssignment>)>> {
    let mut queue: Vec<(Message, Option<LabelAssignment>)> = store
        .get_unlabeled_messages(usize::MAX)?
        .into_iter()
        .map(|message| (message, None))
        .collect();
    queue.extend(
        store
            .get_labeled_messages()?
            .into_iter()
            .filter(|(_, assignment)| assignment.source != LabelSource::Manual)
            .map(|(message, assignment)| (message, Some(assignment))),
    );
    queue.sort_by_key(|(message, _)| message.id);
    if let Some(limit) = limit {
        queue.truncate(limit);
    }
    Ok(queue)
}

fn print_menu<W: Write>(out: &mut W, taxonomy: &Taxonomy) -> std::io::Result<()> {
    writeln!(out, "Available categories:")?;
    for group in [
        UrgencyGroup::Action,
        UrgencyGroup::Informational,
        UrgencyGroup::Noise,
    ] {
        let names: Vec<&str> = taxonomy.group(group).map(|e| e.name.as_str()).collect();
        writeln!(out, "  {}: {}", group.heading(), names.join(", "))?;
    }
    writeln!(out, "\nType a category name, 's' to skip, 'q' to quit.")
}

fn review_session<R: BufRead, W: Write>(
    store: &dyn CorpusStore,
    taxonomy: &Taxonomy,
    limit: Option<usize>,
    input: &mut R,
    out: &mut W,
) -> Result<ReviewStats> {
    let queue = candidates(store, limit)?;
    let mut stats = ReviewStats::default();
    if queue.is_empty() {
        writeln!(out, "Nothing left to review")?;
        return Ok(stats);
    }

    print_menu(out, taxonomy)?;

    'messages: for (message, suggestion) in queue {
        writeln!(out, "\nID: {}", message.id)?;
        writeln!(out, "From: {}", message.from_addr)?;
        writeln!(out, "Subject: {}", message.subject)?;
        let preview: String = message
            .body
            .replace('\n', " ")
            .chars()
            .take(BODY_PREVIEW_CHARS)
            .collect();
        writeln!(out, "Body: {preview}")?;
        if let Some(existing) = &suggestion {
            writeln!(
                out,
                "  -> Suggested: {} ({:.0}%, source: {})",
                existing.category,
                existing.confidence * 100.0,
                existing.source
            )?;
        }

        loop {
            write!(out, "Category (s=skip / q=quit): ")?;
            out.flush()?;
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                // EOF ends the session like an explicit quit
                break 'messages;
            }
            match line.trim() {
                "q" => break 'messages,
                "s" => {
                    stats.skipped += 1;
                    break;
                }
                name if taxonomy.contains(name) => {
                    store.upsert_label(message.id, name, 1.0, LabelSource::Manual)?;
                    writeln!(out, "Labeled as: {name}")?;
                    stats.labeled += 1;
                    break;
                }
                other => {
                    writeln!(out, "Unknown category '{other}'. Try again.")?;
                }
            }
        }
    }
    Ok(stats)
}
