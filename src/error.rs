//! Error types for the Digit Classifier service
//!
//! Provides structured error types for model loading, request validation,
//! and inference.

use axum::http::StatusCode;
use thiserror::Error;

/// Unified error type for the service
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Model Artifact Errors
    // =========================================================================
    #[error("Model file not found at: {path}")]
    ModelNotFound { path: String },

    #[error("Failed to load model from {path}: {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("Unsupported model format: {0} (expected .onnx)")]
    UnsupportedModelFormat(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("ONNX Runtime error: {0}")]
    Onnx(#[from] ort::Error),

    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Prediction(String),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status to report when this error escapes a request handler
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Result type alias for the service
pub type Result<T> = std::result::Result<T, Error>;
