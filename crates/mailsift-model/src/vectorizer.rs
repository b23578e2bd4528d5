//! Sparse TF-IDF vectorization
//!
//! Fits a capped vocabulary of unigrams and adjacent bigrams over the
//! training feature strings, with stop-word removal, sublinear term
//! frequency, smoothed inverse document frequency, and L2 row
//! normalization. The fitted vocabulary and weights are frozen: inference
//! applies the same transform and maps unseen terms to nothing.

use mailsift_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Common low-information English words removed before ngram formation
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "cannot", "could", "did", "do", "does", "doing", "down", "during", "each",
    "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "herself", "him", "himself", "his", "how", "if", "in", "into", "is", "it", "its",
    "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of",
    "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over",
    "own", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "very", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you",
    "your", "yours", "yourself", "yourselves",
];

/// A sparse vector: (feature index, weight) pairs sorted by index
pub type SparseVec = Vec<(u32, f32)>;

/// Vectorizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfConfig {
    /// Vocabulary size cap
    #[serde(default = "default_max_features")]
    pub max_features: usize,

    /// Include adjacent token pairs alongside single tokens
    #[serde(default = "default_true")]
    pub bigrams: bool,

    /// Dampen raw term frequency with 1 + ln(tf)
    #[serde(default = "default_true")]
    pub sublinear_tf: bool,
}

fn default_max_features() -> usize {
    5_000
}

fn default_true() -> bool {
    true
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            max_features: default_max_features(),
            bigrams: default_true(),
            sublinear_tf: default_true(),
        }
    }
}

/// A fitted TF-IDF vectorizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: TfidfConfig,
    /// term -> feature index; BTreeMap keeps serialization deterministic
    vocabulary: BTreeMap<String, u32>,
    /// idf weight per feature index
    idf: Vec<f32>,
}

/// Lowercase and split into alphanumeric runs of length >= 2, dropping stop
/// words, then append adjacent bigrams when configured.
fn terms_of(text: &str, bigrams: bool) -> Vec<String> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .filter(|t| !STOP_WORDS.contains(t))
        .collect();

    let mut terms: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
    if bigrams {
        for pair in tokens.windows(2) {
            terms.push(format!("{} {}", pair[0], pair[1]));
        }
    }
    terms
}

impl TfidfVectorizer {
    /// Fit vocabulary and IDF weights over the training documents.
    ///
    /// The vocabulary is the top `max_features` terms by total corpus count,
    /// ties broken lexicographically; feature indices follow lexicographic
    /// term order so fitting is fully deterministic.
    pub fn fit(config: TfidfConfig, documents: &[String]) -> Result<Self> {
        if documents.is_empty() {
            return Err(Error::model("cannot fit vectorizer on zero documents"));
        }

        let mut corpus_counts: HashMap<String, u64> = HashMap::new();
        let mut document_frequency: HashMap<String, u32> = HashMap::new();

        for doc in documents {
            let terms = terms_of(doc, config.bigrams);
            let mut seen_in_doc: HashMap<&str, ()> = HashMap::new();
            for term in &terms {
                *corpus_counts.entry(term.clone()).or_insert(0) += 1;
                if seen_in_doc.insert(term, ()).is_none() {
                    *document_frequency.entry(term.clone()).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(&String, &u64)> = corpus_counts.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(config.max_features);

        let mut selected: Vec<String> = ranked.into_iter().map(|(t, _)| t.clone()).collect();
        selected.sort();

        let n_docs = documents.len() as f32;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(selected.len());
        for (index, term) in selected.into_iter().enumerate() {
            let df = document_frequency.get(&term).copied().unwrap_or(0) as f32;
            // Smoothed idf, as if one extra document contained every term
            idf.push(((1.0 + n_docs) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term, index as u32);
        }

        Ok(Self {
            config,
            vocabulary,
            idf,
        })
    }

    /// Number of features in the fitted vocabulary
    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// Transform one document with the frozen vocabulary and weights.
    ///
    /// Unseen terms contribute nothing; a document of only unseen terms
    /// yields an empty vector.
    pub fn transform(&self, document: &str) -> SparseVec {
        let mut counts: BTreeMap<u32, f32> = BTreeMap::new();
        for term in terms_of(document, self.config.bigrams) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseVec = counts
            .into_iter()
            .map(|(index, tf)| {
                let tf = if self.config.sublinear_tf {
                    1.0 + tf.ln()
                } else {
                    tf
                };
                (index, tf * self.idf[index as usize])
            })
            .collect();

        let norm: f32 = row.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in row.iter_mut() {
                *w /= norm;
            }
        }
        row
    }

    /// Transform a batch of documents
    pub fn transform_batch(&self, documents: &[String]) -> Vec<SparseVec> {
        documents.iter().map(|d| self.transform(d)).collect()
    }
}
