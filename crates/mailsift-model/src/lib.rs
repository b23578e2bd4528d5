//! MailSift Model
//!
//! The local statistical classifier: TF-IDF text vectorization, a
//! random-forest ensemble with vote-fraction confidence, training with
//! stratified evaluation, and inference against an immutable artifact.
//!
//! This crate provides:
//! - `TfidfVectorizer` — capped uni+bigram vocabulary, sublinear TF, IDF
//! - `RandomForest` — seeded bootstrap/feature-subsampled Gini trees
//! - `train` — stratified split, fit, evaluate, artifact assembly
//! - `ModelArtifact` — atomic save/load of the frozen model
//! - `Predictor` — deterministic inference with low-confidence flagging

pub mod artifact;
pub mod forest;
pub mod metrics;
pub mod predictor;
pub mod trainer;
pub mod vectorizer;

pub use artifact::{ArtifactMetadata, ModelArtifact, ARTIFACT_SCHEMA_VERSION};
pub use forest::{ForestConfig, RandomForest};
pub use metrics::{ClassMetrics, Evaluation};
pub use predictor::{Prediction, Predictor, DEFAULT_UNCERTAINTY_THRESHOLD};
pub use trainer::{train, TrainOptions, TrainReport};
pub use vectorizer::{SparseVec, TfidfConfig, TfidfVectorizer};
