//! Random-forest ensemble over sparse vectors
//!
//! Each tree trains on a bootstrap resample of the examples and considers a
//! random sqrt-sized subset of features at every split (Gini impurity),
//! decorrelating the trees. Prediction is a majority vote; the winning
//! class's vote fraction is the reported confidence — a voting fraction,
//! not a calibrated probability.
//!
//! All randomness is drawn from seeded RNGs, so fitting is reproducible;
//! prediction uses no randomness at all.

use crate::vectorizer::SparseVec;
use mailsift_core::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Forest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the ensemble
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    /// Minimum examples required to attempt a split
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
}

fn default_n_trees() -> usize {
    100
}

fn default_min_samples_split() -> usize {
    2
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            min_samples_split: default_min_samples_split(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        class: u16,
    },
    Split {
        feature: u32,
        threshold: f32,
        left: u32,
        right: u32,
    },
}

/// One fitted decision tree
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<Node>,
}

/// Sparse lookup: features absent from the row have value 0.0
fn feature_value(sample: &SparseVec, feature: u32) -> f32 {
    sample
        .binary_search_by(|(index, _)| index.cmp(&feature))
        .map(|pos| sample[pos].1)
        .unwrap_or(0.0)
}

fn gini(counts: &[u32], total: u32) -> f32 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f32;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f32 / total;
            p * p
        })
        .sum::<f32>()
}

fn majority_class(counts: &[u32]) -> u16 {
    // Ties break toward the lowest class index for determinism
    let mut best = 0usize;
    for (class, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = class;
        }
    }
    best as u16
}

struct TreeBuilder<'a> {
    samples: &'a [SparseVec],
    labels: &'a [u16],
    n_classes: usize,
    n_features: usize,
    min_samples_split: usize,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn class_counts(&self, indices: &[usize]) -> Vec<u32> {
        let mut counts = vec![0u32; self.n_classes];
        for &i in indices {
            counts[self.labels[i] as usize] += 1;
        }
        counts
    }

    /// Find the best (feature, threshold) among a random feature subset.
    fn best_split(&self, indices: &[usize], rng: &mut StdRng) -> Option<(u32, f32)> {
        let m = ((self.n_features as f32).sqrt().ceil() as usize)
            .clamp(1, self.n_features);
        let candidates = rand::seq::index::sample(rng, self.n_features, m);

        let total_counts = self.class_counts(indices);
        let total = indices.len() as u32;
        let parent_gini = gini(&total_counts, total);

        let mut best: Option<(u32, f32, f32)> = None; // feature, threshold, impurity

        for feature in candidates.iter() {
            let feature = feature as u32;
            let mut values: Vec<(f32, u16)> = indices
                .iter()
                .map(|&i| (feature_value(&self.samples[i], feature), self.labels[i]))
                .collect();
            values.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut left_counts = vec![0u32; self.n_classes];
            let mut left_total = 0u32;

            for i in 0..values.len() - 1 {
                left_counts[values[i].1 as usize] += 1;
                left_total += 1;

                // Only split between distinct values
                if values[i].0 >= values[i + 1].0 {
                    continue;
                }

                let right_total = total - left_total;
                let mut right_counts = total_counts.clone();
                for (class, &c) in left_counts.iter().enumerate() {
                    right_counts[class] -= c;
                }

                let weighted = (left_total as f32 * gini(&left_counts, left_total)
                    + right_total as f32 * gini(&right_counts, right_total))
                    / total as f32;

                if weighted + 1e-7 < best.map(|(_, _, g)| g).unwrap_or(parent_gini) {
                    let threshold = (values[i].0 + values[i + 1].0) / 2.0;
                    best = Some((feature, threshold, weighted));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }

    fn build(&mut self, indices: &[usize], rng: &mut StdRng) -> u32 {
        let counts = self.class_counts(indices);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;

        if pure || indices.len() < self.min_samples_split {
            self.nodes.push(Node::Leaf {
                class: majority_class(&counts),
            });
            return (self.nodes.len() - 1) as u32;
        }

        let Some((feature, threshold)) = self.best_split(indices, rng) else {
            self.nodes.push(Node::Leaf {
                class: majority_class(&counts),
            });
            return (self.nodes.len() - 1) as u32;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| feature_value(&self.samples[i], feature) <= threshold);

        // Reserve the split node's slot before recursing
        let node_id = self.nodes.len() as u32;
        self.nodes.push(Node::Leaf { class: 0 });

        let left = self.build(&left_indices, rng);
        let right = self.build(&right_indices, rng);
        self.nodes[node_id as usize] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        node_id
    }
}

impl DecisionTree {
    fn fit(
        samples: &[SparseVec],
        labels: &[u16],
        n_classes: usize,
        n_features: usize,
        min_samples_split: usize,
        rng: &mut StdRng,
    ) -> Self {
        // Bootstrap resample: n draws with replacement
        let n = samples.len();
        let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

        let mut builder = TreeBuilder {
            samples,
            labels,
            n_classes,
            n_features,
            min_samples_split,
            nodes: Vec::new(),
        };
        builder.build(&indices, rng);
        Self {
            nodes: builder.nodes,
        }
    }

    fn predict(&self, sample: &SparseVec) -> u16 {
        let mut node = 0usize;
        loop {
            match &self.nodes[node] {
                Node::Leaf { class } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if feature_value(sample, *feature) <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
    }
}

/// A fitted random forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    n_classes: usize,
}

impl RandomForest {
    /// Fit the ensemble. Each tree gets its own RNG derived from `seed`.
    pub fn fit(
        config: ForestConfig,
        samples: &[SparseVec],
        labels: &[u16],
        n_classes: usize,
        n_features: usize,
        seed: u64,
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::model("cannot fit forest on zero examples"));
        }
        if samples.len() != labels.len() {
            return Err(Error::model(format!(
                "samples/labels length mismatch: {} vs {}",
                samples.len(),
                labels.len()
            )));
        }
        if n_classes < 2 {
            return Err(Error::model(
                "at least two distinct classes are required to fit the forest",
            ));
        }
        if n_features == 0 {
            return Err(Error::model("cannot fit forest with an empty vocabulary"));
        }

        let trees = (0..config.n_trees)
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                DecisionTree::fit(
                    samples,
                    labels,
                    n_classes,
                    n_features,
                    config.min_samples_split,
                    &mut rng,
                )
            })
            .collect();

        Ok(Self {
            config,
            trees,
            n_classes,
        })
    }

    /// Number of classes the forest was trained on
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Majority vote and the winning vote fraction.
    ///
    /// Deterministic: ties break toward the lowest class index.
    pub fn predict(&self, sample: &SparseVec) -> (u16, f32) {
        let mut votes = vec![0u32; self.n_classes];
        for tree in &self.trees {
            votes[tree.predict(sample) as usize] += 1;
        }
        let winner = majority_class(&votes);
        let confidence = votes[winner as usize] as f32 / self.trees.len() as f32;
        (winner, confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two linearly separable classes on two features
    fn separable_data(n_per_class: usize) -> (Vec<SparseVec>, Vec<u16>) {
        let mut samples = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n_per_class {
            let jitter = (i % 5) as f32 * 0.01;
            samples.push(vec![(0, 0.9 - jitter), (1, 0.1 + jitter)]);
            labels.push(0);
            samples.push(vec![(0, 0.1 + jitter), (1, 0.9 - jitter)]);
            labels.push(1);
        }
        (samples, labels)
    }

    #[test]
    fn learns_a_separable_problem() {
        let (samples, labels) = separable_data(20);
        let forest =
            RandomForest::fit(ForestConfig::default(), &samples, &labels, 2, 2, 42).unwrap();

        let (class, confidence) = forest.predict(&vec![(0, 0.95), (1, 0.05)]);
        assert_eq!(class, 0);
        assert!(confidence > 0.9);

        let (class, confidence) = forest.predict(&vec![(0, 0.05), (1, 0.95)]);
        assert_eq!(class, 1);
        assert!(confidence > 0.9);
    }

    #[test]
    fn confidence_is_a_vote_fraction() {
        let (samples, labels) = separable_data(10);
        let forest =
            RandomForest::fit(ForestConfig::default(), &samples, &labels, 2, 2, 42).unwrap();
        let (_, confidence) = forest.predict(&vec![(0, 0.5), (1, 0.5)]);
        assert!((0.0..=1.0).contains(&confidence));
        // 100 trees: the fraction is a multiple of 1/100
        let scaled = confidence * 100.0;
        assert!((scaled - scaled.round()).abs() < 1e-4);
    }

    #[test]
    fn fitting_is_reproducible_for_a_fixed_seed() {
        let (samples, labels) = separable_data(15);
        let fit = |seed| {
            RandomForest::fit(ForestConfig::default(), &samples, &labels, 2, 2, seed).unwrap()
        };
        let a = fit(7);
        let b = fit(7);
        let probe = vec![(0, 0.4), (1, 0.6)];
        assert_eq!(a.predict(&probe), b.predict(&probe));
    }

    #[test]
    fn empty_sample_still_votes() {
        let (samples, labels) = separable_data(10);
        let forest =
            RandomForest::fit(ForestConfig::default(), &samples, &labels, 2, 2, 42).unwrap();
        let (class, confidence) = forest.predict(&Vec::new());
        assert!(class < 2);
        assert!((0.0..=1.0).contains(&confidence));
    }

    #[test]
    fn rejects_degenerate_training_sets() {
        assert!(RandomForest::fit(ForestConfig::default(), &[], &[], 2, 2, 42).is_err());

        let samples = vec![vec![(0, 1.0)], vec![(0, 0.5)]];
        let labels = vec![0u16, 0u16];
        assert!(RandomForest::fit(ForestConfig::default(), &samples, &labels, 1, 1, 42).is_err());
    }

    #[test]
    fn single_tree_forest_is_supported() {
        let (samples, labels) = separable_data(10);
        let config = ForestConfig {
            n_trees: 1,
            ..ForestConfig::default()
        };
        let forest = RandomForest::fit(config, &samples, &labels, 2, 2, 42).unwrap();
        let (_, confidence) = forest.predict(&vec![(0, 0.9), (1, 0.1)]);
        assert!(confidence == 0.0 || confidence == 1.0);
    }
}
