//! ONNX Runtime classifier
//!
//! Wraps an `ort` session over a classifier exported to ONNX (for example a
//! scikit-learn estimator converted with skl2onnx). The first graph input is
//! fed a `[rows, n_features]` tensor; labels are read from the int64 output
//! named `output_label`, or the first int64 tensor output otherwise.

use std::path::Path;

use ndarray::Array2;
use once_cell::sync::Lazy;
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{Tensor, ValueType};
use tracing::{debug, info};

use crate::domain::ports::{check_row_width, Classifier};
use crate::error::{Error, Result};

/// Output name skl2onnx gives the predicted label
const LABEL_OUTPUT: &str = "output_label";

/// Global ONNX Runtime environment initialization
static ORT_INITIALIZED: Lazy<std::result::Result<(), String>> = Lazy::new(|| {
    match ort::init().with_name("digit-classifier").commit() {
        Ok(_) => Ok(()),
        Err(e) => Err(format!("Failed to initialize ONNX Runtime: {}", e)),
    }
});

/// Element type fed to the model input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputPrecision {
    F32,
    F64,
}

/// Classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    session: Session,
    input_name: String,
    label_output: String,
    precision: InputPrecision,
    n_features: Option<usize>,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("input_name", &self.input_name)
            .field("label_output", &self.label_output)
            .field("precision", &self.precision)
            .field("n_features", &self.n_features)
            .finish()
    }
}

impl OnnxClassifier {
    /// Load a model from an `.onnx` file
    pub fn from_file(path: &Path) -> Result<Self> {
        ensure_runtime()?;
        info!(path = %path.display(), "Loading ONNX model");

        let session = Session::builder()
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| Error::ModelLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        Self::from_session(session)
    }

    /// Load a model from serialized ONNX bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ensure_runtime()?;
        let session = Session::builder()
            .and_then(|b| b.commit_from_memory(bytes))
            .map_err(|e| Error::ModelLoad {
                path: "<memory>".to_string(),
                reason: e.to_string(),
            })?;

        Self::from_session(session)
    }

    fn from_session(session: Session) -> Result<Self> {
        let input = session
            .inputs
            .first()
            .ok_or_else(|| Error::InvalidModel("model has no inputs".into()))?;

        let (precision, n_features) = match &input.input_type {
            ValueType::Tensor { ty, dimensions, .. } => {
                let precision = match ty {
                    TensorElementType::Float32 => InputPrecision::F32,
                    TensorElementType::Float64 => InputPrecision::F64,
                    other => {
                        return Err(Error::InvalidModel(format!(
                            "input '{}' has unsupported element type {:?}",
                            input.name, other
                        )))
                    }
                };
                if dimensions.len() != 2 {
                    return Err(Error::InvalidModel(format!(
                        "input '{}' must be 2-D, found shape {:?}",
                        input.name, dimensions
                    )));
                }
                let n_features = (dimensions[1] > 0).then(|| dimensions[1] as usize);
                (precision, n_features)
            }
            other => {
                return Err(Error::InvalidModel(format!(
                    "input '{}' is not a tensor: {:?}",
                    input.name, other
                )))
            }
        };

        let is_int64_tensor = |ty: &ValueType| {
            matches!(ty, ValueType::Tensor { ty: TensorElementType::Int64, .. })
        };
        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name == LABEL_OUTPUT && is_int64_tensor(&o.output_type))
            .or_else(|| session.outputs.iter().find(|o| is_int64_tensor(&o.output_type)))
            .map(|o| o.name.clone())
            .ok_or_else(|| Error::InvalidModel("model has no int64 label output".into()))?;

        let input_name = input.name.clone();
        debug!(
            input = %input_name,
            label = %label_output,
            ?precision,
            ?n_features,
            "Resolved ONNX classifier signature"
        );

        Ok(Self {
            session,
            input_name,
            label_output,
            precision,
            n_features,
        })
    }

    /// Name of the graph input rows are fed to
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Name of the graph output labels are read from
    pub fn label_output(&self) -> &str {
        &self.label_output
    }

    fn to_matrix(&self, rows: &[Vec<f64>]) -> Result<Array2<f64>> {
        let width = match self.n_features {
            Some(n) => n,
            None => rows.first().map(Vec::len).unwrap_or(0),
        };
        for row in rows {
            check_row_width(row, width)?;
        }

        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Array2::from_shape_vec((rows.len(), width), flat)
            .map_err(|e| Error::Prediction(format!("invalid input shape: {}", e)))
    }
}

impl Classifier for OnnxClassifier {
    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<i64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let matrix = self.to_matrix(rows)?;
        let name = self.input_name.as_str();

        let outputs = match self.precision {
            InputPrecision::F32 => {
                let tensor = Tensor::from_array(matrix.mapv(|v| v as f32))?;
                self.session.run(ort::inputs![name => tensor]?)?
            }
            InputPrecision::F64 => {
                let tensor = Tensor::from_array(matrix)?;
                self.session.run(ort::inputs![name => tensor]?)?
            }
        };

        let labels = outputs
            .get(self.label_output.as_str())
            .ok_or_else(|| Error::Prediction(format!("missing output '{}'", self.label_output)))?
            .try_extract_tensor::<i64>()?;

        let labels: Vec<i64> = labels.iter().copied().collect();
        if labels.len() != rows.len() {
            return Err(Error::Prediction(format!(
                "model returned {} labels for {} rows",
                labels.len(),
                rows.len()
            )));
        }
        Ok(labels)
    }
}

fn ensure_runtime() -> Result<()> {
    ORT_INITIALIZED
        .as_ref()
        .map(|_| ())
        .map_err(|e| Error::Internal(e.clone()))
}
