//! `mailsift train` — fit the local classifier and save the artifact

use anyhow::Result;
use mailsift_core::{CorpusStore, Message};
use mailsift_model::{train, TrainOptions};
use std::path::Path;

pub fn run(store: &dyn CorpusStore, model_path: &Path, options: &TrainOptions) -> Result<()> {
    let labeled: Vec<(Message, String)> = store
        .get_labeled_messages()?
        .into_iter()
        .map(|(message, assignment)| (message, assignment.category))
        .collect();

    let (artifact, report) = train(&labeled, options)?;
    artifact.save(model_path)?;

    println!(
        "Trained model {} on {} of {} labeled messages across {} classes",
        report.version, report.n_train, report.n_samples, report.n_classes
    );
    match &report.evaluation {
        Some(evaluation) => {
            println!(
                "Held-out evaluation ({} examples): accuracy {:.3}, macro-F1 {:.3}",
                evaluation.n_examples, evaluation.accuracy, evaluation.macro_f1
            );
            println!(
                "{:<26} {:>9} {:>9} {:>9} {:>8}",
                "class", "precision", "recall", "f1", "support"
            );
            for metrics in &evaluation.per_class {
                println!(
                    "{:<26} {:>9.3} {:>9.3} {:>9.3} {:>8}",
                    metrics.class, metrics.precision, metrics.recall, metrics.f1, metrics.support
                );
            }
        }
        None => println!("Corpus too small for a held-out split; trained on everything"),
    }
    println!("Artifact saved to {}", model_path.display());
    Ok(())
}
