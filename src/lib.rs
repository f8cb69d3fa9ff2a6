//! Digit Classifier - Inference Service
//!
//! Serves a pre-trained 8x8 handwritten digit classifier over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        REST API (axum)                       │
//! │   POST /predict_digit            GET /health                 │
//! └───────────────┬──────────────────────────────────────────────┘
//!                 │ DigitInput (64 pixels) -> single-row input
//!                 ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │          Classifier port (Arc<dyn Classifier>)               │
//! │   read-only after startup, shared by every request           │
//! └───────────────┬──────────────────────────────────────────────┘
//!                 │ loaded once from disk
//!                 ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │   ONNX model artifact, run through ONNX Runtime (ort)        │
//! │   float input [N, 64]  ->  int64 label output                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`api`]: REST router, handlers and server
//! - [`domain`]: Input schema and the classifier port
//! - [`model`]: Artifact loading and the ONNX classifier
//! - [`error`]: Error types and handling

pub mod api;
pub mod domain;
pub mod error;
pub mod model;

// Re-export commonly used types
pub use api::{ApiServer, ApiServerConfig, RestRouter};

pub use domain::{
    Classifier, DigitInput, LocItem, SharedClassifier, ValidationIssue, PIXEL_COUNT,
};

pub use error::{Error, Result};

pub use model::{load_model, LoadedModel, ModelInfo, OnnxClassifier};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
