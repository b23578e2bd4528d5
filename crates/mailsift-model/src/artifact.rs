//! The trained-model artifact
//!
//! An immutable snapshot of the fitted vectorizer, the fitted forest with
//! its ordered class list, and training metadata. Retraining produces a new
//! artifact; `save` replaces the previous one atomically (temp file + rename
//! in the destination directory), so no reader ever observes a half-written
//! blob.

use crate::forest::RandomForest;
use crate::metrics::Evaluation;
use crate::vectorizer::TfidfVectorizer;
use chrono::{DateTime, Utc};
use mailsift_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Bumped whenever the serialized layout changes incompatibly
pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

/// Training metadata carried inside the artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Version string for this training run (v{timestamp})
    pub version: String,

    /// When training finished
    pub trained_at: DateTime<Utc>,

    /// Examples the forest was fitted on
    pub n_train: u32,

    /// Held-out evaluation, absent when the corpus was too small to split
    pub evaluation: Option<Evaluation>,
}

/// Immutable bundle of everything prediction needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub schema_version: u32,
    pub vectorizer: TfidfVectorizer,
    pub forest: RandomForest,
    /// Class names in the index order the forest votes over
    pub classes: Vec<String>,
    pub metadata: ArtifactMetadata,
}

impl ModelArtifact {
    /// Atomically write the artifact to `path`, fully replacing any
    /// existing one.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent)?;
                parent
            }
            _ => Path::new("."),
        };

        // Write to a temp file in the same directory so the final rename
        // cannot cross filesystems
        let temp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            bincode::serialize_into(&mut writer, self)
                .map_err(|e| Error::model(format!("failed to encode artifact: {e}")))?;
            writer.flush()?;
        }
        temp.persist(path)
            .map_err(|e| Error::model(format!("failed to replace artifact: {e}")))?;

        info!(
            "Saved model artifact {} to {}",
            self.metadata.version,
            path.display()
        );
        Ok(())
    }

    /// Load an artifact, failing explicitly when it is absent or was
    /// written by an incompatible schema.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ModelNotTrained(format!(
                "no artifact at {}; run training first",
                path.display()
            )));
        }

        let reader = BufReader::new(File::open(path)?);
        let artifact: Self = bincode::deserialize_from(reader).map_err(|e| {
            Error::model(format!(
                "artifact at {} is incompatible or corrupt: {e}",
                path.display()
            ))
        })?;

        if artifact.schema_version != ARTIFACT_SCHEMA_VERSION {
            return Err(Error::model(format!(
                "artifact schema version {} does not match supported version {}",
                artifact.schema_version, ARTIFACT_SCHEMA_VERSION
            )));
        }

        Ok(artifact)
    }
}
