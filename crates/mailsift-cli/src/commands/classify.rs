//! `mailsift classify` — local-model predictions for unlabeled mail

use anyhow::Result;
use mailsift_core::{CorpusStore, LabelSource, LabelWrite};
use mailsift_model::Predictor;
use std::path::Path;

pub fn run(
    store: &dyn CorpusStore,
    model_path: &Path,
    limit: Option<usize>,
    dry_run: bool,
    threshold: Option<f32>,
) -> Result<()> {
    let mut predictor = Predictor::load(model_path)?;
    if let Some(threshold) = threshold {
        predictor = predictor.with_threshold(threshold);
    }

    let unlabeled = store.get_unlabeled_messages(limit.unwrap_or(usize::MAX))?;
    if unlabeled.is_empty() {
        println!("No unlabeled messages");
        return Ok(());
    }

    let mut labeled = 0usize;
    let mut skipped = 0usize;
    let mut uncertain = 0usize;

    for message in &unlabeled {
        let prediction = predictor.predict(message);
        if prediction.uncertain {
            uncertain += 1;
        }
        if dry_run {
            println!(
                "message {} -> {} ({:.0}%){}",
                message.id,
                prediction.category,
                prediction.confidence * 100.0,
                if prediction.uncertain { " [uncertain]" } else { "" }
            );
            continue;
        }
        match store.upsert_label(
            message.id,
            &prediction.category,
            prediction.confidence,
            LabelSource::Model,
        )? {
            LabelWrite::Inserted | LabelWrite::Replaced => labeled += 1,
            LabelWrite::Rejected => skipped += 1,
        }
    }

    if dry_run {
        println!(
            "Previewed {} predictions with model {} ({uncertain} uncertain); nothing persisted",
            unlabeled.len(),
            predictor.model_version()
        );
    } else {
        println!(
            "Classified {labeled} messages with model {} ({uncertain} uncertain, {skipped} skipped)",
            predictor.model_version()
        );
    }
    Ok(())
}
