//! Model Artifact Module
//!
//! Loads the serialized classifier once at startup. The artifact is an ONNX
//! graph, typically a scikit-learn estimator exported with skl2onnx, and is
//! run through ONNX Runtime.

#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;
pub mod onnx;

pub use onnx::OnnxClassifier;

use crate::domain::ports::SharedClassifier;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

// =============================================================================
// Loaded Model
// =============================================================================

/// Metadata about the model held by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub path: String,
    pub input_name: String,
    pub label_output: String,
    /// `None` when the model leaves the feature dimension symbolic
    pub n_features: Option<usize>,
    pub loaded_at: DateTime<Utc>,
}

/// A classifier loaded from disk together with its metadata
#[derive(Clone)]
pub struct LoadedModel {
    pub classifier: SharedClassifier,
    pub info: ModelInfo,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel").field("info", &self.info).finish()
    }
}

impl LoadedModel {
    /// Refuse a model whose fixed input width differs from `expected`
    ///
    /// A symbolic width is accepted; rows are then checked per request.
    pub fn ensure_features(&self, expected: usize) -> Result<()> {
        match self.info.n_features {
            Some(n) if n != expected => Err(Error::Configuration(format!(
                "model at {} expects {} features, but inputs carry {}",
                self.info.path, n, expected
            ))),
            _ => Ok(()),
        }
    }
}

/// Load an ONNX classifier from disk
pub fn load_model(path: impl AsRef<Path>) -> Result<LoadedModel> {
    let path = path.as_ref();
    let path_str = path.display().to_string();

    if !path.exists() {
        return Err(Error::ModelNotFound { path: path_str });
    }

    let is_onnx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("onnx"));
    if !is_onnx {
        return Err(Error::UnsupportedModelFormat(path_str));
    }

    let classifier = OnnxClassifier::from_file(path)?;
    let info = ModelInfo {
        path: path_str,
        input_name: classifier.input_name().to_string(),
        label_output: classifier.label_output().to_string(),
        n_features: crate::domain::Classifier::n_features(&classifier),
        loaded_at: Utc::now(),
    };

    info!(
        path = %info.path,
        input = %info.input_name,
        label = %info.label_output,
        n_features = ?info.n_features,
        "Model ready"
    );

    Ok(LoadedModel {
        classifier: Arc::new(classifier),
        info,
    })
}
