//! Domain Ports - Core trait definitions for the inference service
//!
//! The classifier trait is the boundary between the HTTP layer and whatever
//! model artifact was loaded at startup.

use crate::error::{Error, Result};
use std::sync::Arc;

// =============================================================================
// Classifier Port
// =============================================================================

/// A loaded, read-only classifier
///
/// Implementations are shared across request handlers and must tolerate
/// concurrent `predict` calls without interior mutation.
pub trait Classifier: Send + Sync {
    /// Number of features each input row must carry, when the model fixes it
    fn n_features(&self) -> Option<usize>;

    /// Predict one label per input row
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<i64>>;
}

/// Shared handle to the process-wide classifier
pub type SharedClassifier = Arc<dyn Classifier>;

/// Reject a row whose width does not match what the model was fitted on
pub fn check_row_width(row: &[f64], n_features: usize) -> Result<()> {
    if row.len() != n_features {
        return Err(Error::Prediction(format!(
            "X has {} features, but the model is expecting {} features as input",
            row.len(),
            n_features
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_row_width() {
        assert!(check_row_width(&[0.0; 4], 4).is_ok());

        let err = check_row_width(&[0.0; 3], 4).unwrap_err();
        assert_eq!(
            err.to_string(),
            "X has 3 features, but the model is expecting 4 features as input"
        );
    }
}
