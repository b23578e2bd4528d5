//! Inference against a frozen artifact
//!
//! Loads the trained artifact and produces (category, confidence) pairs for
//! new messages. Pure and read-only: persisting the resulting assignments
//! is the caller's responsibility.

use crate::artifact::ModelArtifact;
use mailsift_core::{build_feature, Message, Result};
use std::path::Path;

/// Confidence below this is flagged as uncertain to downstream consumers
pub const DEFAULT_UNCERTAINTY_THRESHOLD: f32 = 0.70;

/// One prediction
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Winning taxonomy category
    pub category: String,

    /// Winning vote fraction in [0.0, 1.0]
    pub confidence: f32,

    /// True when confidence fell below the uncertainty threshold
    pub uncertain: bool,
}

/// Classifier predictor over a frozen artifact
pub struct Predictor {
    artifact: ModelArtifact,
    threshold: f32,
}

impl Predictor {
    /// Load the artifact from disk.
    ///
    /// Fails with `ModelNotTrained` when the artifact is absent and a model
    /// error when it is incompatible — never a default category.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_artifact(ModelArtifact::load(path)?))
    }

    /// Wrap an already-loaded artifact
    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        Self {
            artifact,
            threshold: DEFAULT_UNCERTAINTY_THRESHOLD,
        }
    }

    /// Override the uncertainty threshold
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// The artifact's training-run version string
    pub fn model_version(&self) -> &str {
        &self.artifact.metadata.version
    }

    /// Predict the category for one message.
    ///
    /// Total: a message whose feature string is entirely out of vocabulary
    /// still routes through every tree and yields a valid vote fraction.
    pub fn predict(&self, message: &Message) -> Prediction {
        let vector = self.artifact.vectorizer.transform(&build_feature(message));
        let (class, confidence) = self.artifact.forest.predict(&vector);
        Prediction {
            category: self.artifact.classes[class as usize].clone(),
            confidence,
            uncertain: confidence < self.threshold,
        }
    }

    /// Predict for a batch of messages, in order
    pub fn predict_batch(&self, messages: &[Message]) -> Vec<Prediction> {
        messages.iter().map(|m| self.predict(m)).collect()
    }
}
