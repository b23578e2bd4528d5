//! Classifier training
//!
//! Turns all labeled messages into (feature string, class) pairs, splits
//! them with per-class stratification, fits the vectorizer and forest on
//! the training subset, evaluates on the held-out subset, and produces the
//! immutable artifact.

use crate::artifact::{ArtifactMetadata, ModelArtifact, ARTIFACT_SCHEMA_VERSION};
use crate::forest::{ForestConfig, RandomForest};
use crate::metrics::{evaluate, Evaluation};
use crate::vectorizer::{TfidfConfig, TfidfVectorizer};
use chrono::Utc;
use mailsift_core::{build_feature, Error, Message, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Training options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainOptions {
    /// Fraction of examples held out for evaluation
    #[serde(default = "default_test_size")]
    pub test_size: f32,

    /// Seed for the split shuffle and the forest's bootstrap/feature draws
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Below this corpus size, train on everything and skip evaluation
    #[serde(default = "default_min_eval_samples")]
    pub min_eval_samples: usize,

    #[serde(default)]
    pub vectorizer: TfidfConfig,

    #[serde(default)]
    pub forest: ForestConfig,
}

fn default_test_size() -> f32 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_min_eval_samples() -> usize {
    10
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            seed: default_seed(),
            min_eval_samples: default_min_eval_samples(),
            vectorizer: TfidfConfig::default(),
            forest: ForestConfig::default(),
        }
    }
}

/// What a training run produced, for the caller to surface
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub version: String,
    pub n_samples: usize,
    pub n_train: usize,
    pub n_classes: usize,
    /// Absent when the corpus was too small for a meaningful split
    pub evaluation: Option<Evaluation>,
}

/// Per-class stratified split of example indices.
///
/// Holds out `round(count * test_size)` of each class, clamped to
/// [1, count-1]; classes with a single example degrade to train-only
/// rather than being dropped.
fn stratified_split(
    class_indices: &[u16],
    n_classes: usize,
    test_size: f32,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    let mut per_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &class) in class_indices.iter().enumerate() {
        per_class[class as usize].push(i);
    }

    let mut train = Vec::new();
    let mut test = Vec::new();
    for (class, mut indices) in per_class.into_iter().enumerate() {
        if indices.is_empty() {
            continue;
        }
        if indices.len() < 2 {
            warn!(
                "Class index {class} has a single example; keeping it in the training set only"
            );
            train.extend(indices);
            continue;
        }
        indices.shuffle(rng);
        let n_test = ((indices.len() as f32 * test_size).round() as usize)
            .clamp(1, indices.len() - 1);
        test.extend(indices.drain(..n_test));
        train.extend(indices);
    }

    // Stable order within each subset so downstream fitting is deterministic
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Train on all labeled messages and produce the artifact plus its report.
///
/// Fails fast — with no artifact written — on an empty corpus or fewer than
/// two distinct classes.
pub fn train(labeled: &[(Message, String)], options: &TrainOptions) -> Result<(ModelArtifact, TrainReport)> {
    if labeled.is_empty() {
        return Err(Error::model(
            "no labeled messages; run label generation or manual labeling first",
        ));
    }

    // Ordered distinct class list; index order is the forest's vote order
    let classes: Vec<String> = labeled
        .iter()
        .map(|(_, category)| category.clone())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    if classes.len() < 2 {
        return Err(Error::model(format!(
            "training requires at least two distinct classes, found {}",
            classes.len()
        )));
    }
    let class_index: BTreeMap<&str, u16> = classes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i as u16))
        .collect();

    let features: Vec<String> = labeled.iter().map(|(m, _)| build_feature(m)).collect();
    let class_indices: Vec<u16> = labeled
        .iter()
        .map(|(_, category)| class_index[category.as_str()])
        .collect();

    info!(
        "Training on {} labeled messages across {} classes",
        labeled.len(),
        classes.len()
    );

    let mut rng = StdRng::seed_from_u64(options.seed);
    let (train_idx, test_idx) = if labeled.len() < options.min_eval_samples {
        warn!(
            "Only {} samples; training on the full corpus without evaluation",
            labeled.len()
        );
        ((0..labeled.len()).collect(), Vec::new())
    } else {
        stratified_split(&class_indices, classes.len(), options.test_size, &mut rng)
    };

    let train_docs: Vec<String> = train_idx.iter().map(|&i| features[i].clone()).collect();
    let train_labels: Vec<u16> = train_idx.iter().map(|&i| class_indices[i]).collect();

    let vectorizer = TfidfVectorizer::fit(options.vectorizer.clone(), &train_docs)?;
    let train_vectors = vectorizer.transform_batch(&train_docs);
    let forest = RandomForest::fit(
        options.forest.clone(),
        &train_vectors,
        &train_labels,
        classes.len(),
        vectorizer.n_features(),
        options.seed,
    )?;

    let evaluation = if test_idx.is_empty() {
        None
    } else {
        let truth: Vec<u16> = test_idx.iter().map(|&i| class_indices[i]).collect();
        let predicted: Vec<u16> = test_idx
            .iter()
            .map(|&i| forest.predict(&vectorizer.transform(&features[i])).0)
            .collect();
        let evaluation = evaluate(&truth, &predicted, &classes);
        info!(
            "Held-out evaluation: accuracy {:.3}, macro-F1 {:.3} over {} examples",
            evaluation.accuracy, evaluation.macro_f1, evaluation.n_examples
        );
        Some(evaluation)
    };

    let trained_at = Utc::now();
    let version = format!("v{}", trained_at.format("%Y%m%d_%H%M%S"));
    let report = TrainReport {
        version: version.clone(),
        n_samples: labeled.len(),
        n_train: train_idx.len(),
        n_classes: classes.len(),
        evaluation: evaluation.clone(),
    };
    let artifact = ModelArtifact {
        schema_version: ARTIFACT_SCHEMA_VERSION,
        vectorizer,
        forest,
        classes,
        metadata: ArtifactMetadata {
            version,
            trained_at,
            n_train: train_idx.len() as u32,
            evaluation,
        },
    };

    Ok((artifact, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_stratified_and_respects_minimums() {
        // 60/30/10 class mix, test_size 0.2
        let mut classes = Vec::new();
        classes.extend(std::iter::repeat(0u16).take(60));
        classes.extend(std::iter::repeat(1u16).take(30));
        classes.extend(std::iter::repeat(2u16).take(10));

        let mut rng = StdRng::seed_from_u64(42);
        let (train, test) = stratified_split(&classes, 3, 0.2, &mut rng);
        assert_eq!(train.len() + test.len(), 100);

        let count_in = |subset: &[usize], class: u16| {
            subset.iter().filter(|&&i| classes[i] == class).count()
        };
        assert_eq!(count_in(&test, 0), 12);
        assert_eq!(count_in(&test, 1), 6);
        // The smallest class still contributes at least 2 held-out examples
        assert_eq!(count_in(&test, 2), 2);
    }

    #[test]
    fn singleton_class_degrades_to_train_only() {
        let classes = vec![0u16, 0, 0, 0, 1];
        let mut rng = StdRng::seed_from_u64(1);
        let (train, test) = stratified_split(&classes, 2, 0.2, &mut rng);
        assert!(train.contains(&4));
        assert!(test.iter().all(|&i| classes[i] != 1));
        assert_eq!(train.len() + test.len(), 5);
    }

    #[test]
    fn split_never_empties_a_two_example_class() {
        let classes = vec![0u16, 0, 1, 1];
        let mut rng = StdRng::seed_from_u64(3);
        let (train, test) = stratified_split(&classes, 2, 0.5, &mut rng);
        for class in [0u16, 1] {
            assert!(train.iter().any(|&i| classes[i] == class));
            assert!(test.iter().any(|&i| classes[i] == class));
        }
    }
}
