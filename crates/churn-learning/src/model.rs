//! Trained model artifact for inference and serialization.
//!
//! This module provides [`TrainedModel`], which wraps a fitted
//! [`RandomForest`] and enables:
//!
//! - **Prediction** through the [`Classifier`] implementation
//! - **Serialization** via [`save()`](TrainedModel::save), [`load()`](TrainedModel::load),
//!   [`to_bytes()`](TrainedModel::to_bytes), and [`from_bytes()`](TrainedModel::from_bytes)
//! - **Introspection** via [`info()`](TrainedModel::info) and
//!   [`encoding_schema()`](TrainedModel::encoding_schema)
//!
//! # Lifecycle
//!
//! A `TrainedModel` is created in one of two ways:
//!
//! 1. **From training**: [`train()`](crate::train) returns one
//! 2. **From disk**: [`TrainedModel::load()`] reads a previously saved artifact
//!
//! # Format
//!
//! The artifact is a JSON document holding a format version, the model
//! metadata, the encoding schema the model was trained with, and the
//! forest. Loading rejects an artifact whose version or encoding schema
//! differs from this build, so a model can never be served with code
//! tables other than the ones it learned from.
//!
//! # Thread Safety
//!
//! `TrainedModel` is plain data and is `Send + Sync`; after loading it is
//! only read.

use crate::classifier::Classifier;
use crate::error::{LearningError, Result};
use crate::forest::RandomForest;
use crate::types::ModelInfo;
use churn_processing::{ChurnLabel, EncodedFeatureVector, EncodingSchema};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Version written into every artifact.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// A trained churn model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    format_version: u32,
    info: ModelInfo,
    encoding: EncodingSchema,
    forest: RandomForest,
}

static_assertions::assert_impl_all!(TrainedModel: Send, Sync);

impl TrainedModel {
    /// Wrap a fitted forest, recording the current encoding schema.
    pub(crate) fn new(info: ModelInfo, forest: RandomForest) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            info,
            encoding: EncodingSchema::current(),
            forest,
        }
    }

    /// Loads a trained model from a JSON artifact.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::ModelLoad`] if:
    /// - The file does not exist or cannot be read
    /// - The file is not a valid artifact
    /// - The format version or encoding schema differs from this build
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LearningError::model_load(path, "file does not exist"));
        }

        let bytes = std::fs::read(path).map_err(|e| LearningError::model_load(path, e))?;
        let model = Self::decode(&bytes).map_err(|reason| LearningError::model_load(path, reason))?;

        info!(
            "Loaded model '{}' from {} ({} trees)",
            model.info.model_name,
            path.display(),
            model.forest.trees().len()
        );
        Ok(model)
    }

    /// Saves the model as a JSON artifact.
    ///
    /// Parent directories must exist.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, &bytes)?;
        info!("Saved model to {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Exports the model as JSON bytes.
    #[must_use = "returns serialized model bytes; use them or handle the error"]
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Loads a model from bytes produced by [`to_bytes()`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::ModelLoad`] with path `<bytes>` under the
    /// same conditions as [`load()`](Self::load).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::decode(bytes).map_err(|reason| LearningError::ModelLoad {
            path: "<bytes>".to_string(),
            reason,
        })
    }

    fn decode(bytes: &[u8]) -> std::result::Result<Self, String> {
        let model: TrainedModel =
            serde_json::from_slice(bytes).map_err(|e| format!("invalid artifact: {}", e))?;

        if model.format_version != MODEL_FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {})",
                model.format_version, MODEL_FORMAT_VERSION
            ));
        }

        let differences = EncodingSchema::current().differences(&model.encoding);
        if !differences.is_empty() {
            return Err(format!(
                "encoding schema mismatch: {}",
                differences.join("; ")
            ));
        }

        model.forest.validate()?;
        debug!("Artifact checks passed");
        Ok(model)
    }

    /// Metadata recorded at training time.
    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// The encoding schema the model was trained with.
    pub fn encoding_schema(&self) -> &EncodingSchema {
        &self.encoding
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Class probabilities `[stayed, churned]`.
    pub fn predict_proba(&self, features: &EncodedFeatureVector) -> [f64; 2] {
        self.forest.predict_proba(features)
    }
}

impl Classifier for TrainedModel {
    fn predict_one(&self, features: &EncodedFeatureVector) -> ChurnLabel {
        self.forest.predict_one(features)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.forest.feature_importances()
    }
}
