//! REST API Handlers
//!
//! Implements the prediction endpoint and the liveness route.

use crate::domain::{DigitInput, SharedClassifier, ValidationIssue};
use crate::error::Error;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: i64,
}

/// 422 response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorResponse {
    pub detail: Vec<ValidationIssue>,
}

/// 500 response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub detail: String,
}

// =============================================================================
// REST Router
// =============================================================================

/// REST API router builder
pub struct RestRouter {
    classifier: SharedClassifier,
    request_timeout: Duration,
    max_body_size: usize,
}

impl RestRouter {
    /// Create a new REST router with default limits
    pub fn new(classifier: SharedClassifier) -> Self {
        Self {
            classifier,
            request_timeout: Duration::from_secs(30),
            max_body_size: 64 * 1024,
        }
    }

    /// Override the per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the maximum accepted request body size
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            classifier: self.classifier,
        };

        Router::new()
            .route("/predict_digit", post(predict_digit))
            .route("/health", get(health_check))
            .with_state(state)
            .layer(DefaultBodyLimit::max(self.max_body_size))
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(TraceLayer::new_for_http())
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    classifier: SharedClassifier,
}

// =============================================================================
// Handlers
// =============================================================================

/// Predict the digit shown in an 8x8 image
///
/// The body is decoded as JSON regardless of its declared content type.
async fn predict_digit(State(state): State<AppState>, body: Bytes) -> Response {
    let input = match DigitInput::from_body(&body) {
        Ok(input) => input,
        Err(detail) => {
            debug!(issues = detail.len(), "Rejected digit input");
            return validation_error(detail);
        }
    };

    // from_body has already checked the length.
    let rows = match input.into_rows() {
        Ok(rows) => rows,
        Err(e) => return internal_error(&e),
    };

    let classifier = state.classifier.clone();
    let outcome = tokio::task::spawn_blocking(move || classifier.predict(&rows)).await;

    let labels = match outcome {
        Ok(Ok(labels)) => labels,
        Ok(Err(e)) => {
            error!("Prediction failed: {}", e);
            return internal_error(&e);
        }
        Err(join_err) => {
            let e = Error::Prediction(panic_message(join_err));
            error!("Prediction task failed: {}", e);
            return internal_error(&e);
        }
    };

    match labels.first() {
        Some(&prediction) => {
            debug!("Predicted digit {}", prediction);
            (StatusCode::OK, Json(PredictionResponse { prediction })).into_response()
        }
        None => internal_error(&Error::Prediction("model returned no prediction".into())),
    }
}

/// Health check
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// =============================================================================
// Utility Functions
// =============================================================================

fn validation_error(detail: Vec<ValidationIssue>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ValidationErrorResponse { detail }),
    )
        .into_response()
}

fn internal_error(e: &Error) -> Response {
    (
        e.status_code(),
        Json(ApiErrorResponse {
            detail: e.to_string(),
        }),
    )
        .into_response()
}

/// Best-effort text of a panic or cancellation inside the prediction task
fn panic_message(err: tokio::task::JoinError) -> String {
    if err.is_cancelled() {
        return "prediction task was cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "prediction task panicked".to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Classifier, PIXEL_COUNT};
    use crate::error::Result;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Predicts the index of the brightest pixel modulo 10
    struct BrightestPixel;

    impl Classifier for BrightestPixel {
        fn n_features(&self) -> Option<usize> {
            Some(PIXEL_COUNT)
        }
        fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<i64>> {
            Ok(rows
                .iter()
                .map(|row| {
                    let idx = row
                        .iter()
                        .enumerate()
                        .fold(0, |best, (i, v)| if *v > row[best] { i } else { best });
                    (idx % 10) as i64
                })
                .collect())
        }
    }

    struct Failing;

    impl Classifier for Failing {
        fn n_features(&self) -> Option<usize> {
            Some(PIXEL_COUNT)
        }
        fn predict(&self, _rows: &[Vec<f64>]) -> Result<Vec<i64>> {
            Err(Error::Prediction("model exploded".into()))
        }
    }

    struct Panicking;

    impl Classifier for Panicking {
        fn n_features(&self) -> Option<usize> {
            Some(PIXEL_COUNT)
        }
        fn predict(&self, _rows: &[Vec<f64>]) -> Result<Vec<i64>> {
            panic!("index out of bounds");
        }
    }

    struct Slow(Duration);

    impl Classifier for Slow {
        fn n_features(&self) -> Option<usize> {
            Some(PIXEL_COUNT)
        }
        fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<i64>> {
            std::thread::sleep(self.0);
            Ok(vec![0; rows.len()])
        }
    }

    fn router(classifier: impl Classifier + 'static) -> Router {
        RestRouter::new(Arc::new(classifier)).build()
    }

    fn predict_request(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict_digit")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn peak_body(index: usize) -> String {
        let mut pixels = vec![0.0; PIXEL_COUNT];
        pixels[index] = 16.0;
        serde_json::json!({ "pixels": pixels }).to_string()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_predict_digit_ok() {
        let (status, value) = send(router(BrightestPixel), predict_request(peak_body(13))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, serde_json::json!({ "prediction": 3 }));
    }

    #[tokio::test]
    async fn test_predict_digit_without_content_type() {
        let req = Request::builder()
            .method("POST")
            .uri("/predict_digit")
            .body(Body::from(peak_body(5)))
            .unwrap();

        let (status, value) = send(router(BrightestPixel), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["prediction"], 5);
    }

    #[tokio::test]
    async fn test_predict_digit_numeric_strings() {
        let mut pixels: Vec<serde_json::Value> = vec!["0".into(); PIXEL_COUNT];
        pixels[8] = "1.5".into();
        let body = serde_json::json!({ "pixels": pixels }).to_string();

        let (status, value) = send(router(BrightestPixel), predict_request(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["prediction"], 8);
    }

    #[tokio::test]
    async fn test_predict_digit_wrong_length() {
        let body = serde_json::json!({ "pixels": vec![1.0; 63] }).to_string();

        let (status, value) = send(router(BrightestPixel), predict_request(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            value,
            serde_json::json!({
                "detail": [{
                    "loc": ["body", "pixels"],
                    "msg": "Value error, Input list must contain exactly 64 pixel values (8x8 flattened).",
                    "type": "value_error"
                }]
            })
        );
    }

    #[tokio::test]
    async fn test_predict_digit_non_numeric_pixels() {
        let body = r#"{"pixels": ["a", "b"]}"#.to_string();

        let (status, value) = send(router(BrightestPixel), predict_request(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let detail: ValidationErrorResponse = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(detail.detail.len(), 2);
        assert_eq!(value["detail"][1]["loc"], serde_json::json!(["body", "pixels", 1]));
        assert_eq!(value["detail"][1]["type"], "float_parsing");
    }

    #[tokio::test]
    async fn test_predict_digit_missing_field() {
        let (status, value) = send(router(BrightestPixel), predict_request("{}".into())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(value["detail"][0]["loc"], serde_json::json!(["body", "pixels"]));
        assert_eq!(value["detail"][0]["msg"], "Field required");
        assert_eq!(value["detail"][0]["type"], "missing");
    }

    #[tokio::test]
    async fn test_predict_digit_malformed_json() {
        let (status, value) =
            send(router(BrightestPixel), predict_request("{not json".into())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(value["detail"][0]["type"], "json_invalid");
        assert_eq!(value["detail"][0]["loc"][0], "body");
    }

    #[tokio::test]
    async fn test_predict_digit_model_error() {
        let body = serde_json::json!({ "pixels": vec![0.0; PIXEL_COUNT] }).to_string();

        let (status, value) = send(router(Failing), predict_request(body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value, serde_json::json!({ "detail": "model exploded" }));
    }

    #[tokio::test]
    async fn test_predict_digit_model_panic() {
        let body = serde_json::json!({ "pixels": vec![0.0; PIXEL_COUNT] }).to_string();

        let (status, value) = send(router(Panicking), predict_request(body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value["detail"], "index out of bounds");
    }

    #[tokio::test]
    async fn test_predict_digit_onnx_model() {
        use crate::model::fixture::{brightest_pixel_weights, linear_argmax_model};
        use crate::model::OnnxClassifier;

        let bytes = linear_argmax_model(&brightest_pixel_weights(PIXEL_COUNT, 10), false);
        let model = OnnxClassifier::from_bytes(&bytes).unwrap();

        let (status, value) = send(router(model), predict_request(peak_body(6))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, serde_json::json!({ "prediction": 6 }));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let app = RestRouter::new(Arc::new(Slow(Duration::from_millis(500))))
            .request_timeout(Duration::from_millis(50))
            .build();

        let response = app.oneshot(predict_request(peak_body(0))).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_oversized_body() {
        let app = RestRouter::new(Arc::new(BrightestPixel))
            .max_body_size(16)
            .build();
        let body = serde_json::json!({ "pixels": vec![0.0; PIXEL_COUNT] }).to_string();

        let response = app.oneshot(predict_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_health_check() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = router(BrightestPixel).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let req = Request::builder().uri("/predict").body(Body::empty()).unwrap();
        let response = router(BrightestPixel).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
