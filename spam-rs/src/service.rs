//! Inference service
//!
//! Orchestrates normalizer -> vectorizer -> classifier for one request and
//! turns every outcome, success or failure, into a typed result. Nothing on
//! this path panics or propagates an untyped error to the transport layer.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::SpamError;
use crate::model::{ArtifactState, Artifacts, Class, ClassProbabilities};

/// Tolerance for the probability pair summing to one
const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Artifacts or linguistic resources missing at startup
    StartupArtifact,
    /// Malformed request; the model is never touched
    RequestValidation,
    /// Unexpected failure inside the pipeline
    InferenceFault,
}

/// Classification failure
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("artifacts unavailable")]
    ArtifactsUnavailable,

    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Missing \"message\" key in JSON payload")]
    MissingMessage,

    #[error("\"message\" must be a string")]
    MessageNotString,

    #[error("Failed to read request body: {reason}")]
    UnreadableBody { status: StatusCode, reason: String },

    #[error("An internal error occurred during prediction: {0}")]
    Inference(#[from] SpamError),
}

impl ClassifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ArtifactsUnavailable => ErrorKind::StartupArtifact,
            Self::InvalidJson(_)
            | Self::MissingMessage
            | Self::MessageNotString
            | Self::UnreadableBody { .. } => ErrorKind::RequestValidation,
            Self::Inference(_) => ErrorKind::InferenceFault,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        if let Self::UnreadableBody { status, .. } = self {
            return *status;
        }
        match self.kind() {
            ErrorKind::RequestValidation => StatusCode::BAD_REQUEST,
            ErrorKind::StartupArtifact | ErrorKind::InferenceFault => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON error payload
    pub fn body(&self) -> ErrorBody {
        match self {
            Self::InvalidJson(e) => ErrorBody::with_details("Invalid JSON payload", e.to_string()),
            Self::UnreadableBody { reason, .. } => {
                ErrorBody::with_details("Failed to read request body", reason.clone())
            }
            Self::Inference(e) => ErrorBody::with_details(
                "An internal error occurred during prediction.",
                e.to_string(),
            ),
            other => ErrorBody::new(other.to_string()),
        }
    }
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Outcome of one classification
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// Original message
    pub message: String,
    /// Normalized text fed to the vectorizer
    pub normalized: String,
    /// Predicted class, the argmax of `probabilities`
    pub class: Class,
    pub probabilities: ClassProbabilities,
}

/// Success response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub message: String,
    pub transformed: String,
    /// 0 = ham, 1 = spam
    pub prediction: u8,
    /// "Spam" or "Not Spam"
    pub result: String,
    pub probabilities: FormattedProbabilities,
}

/// Probabilities as percentage strings with two decimals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedProbabilities {
    #[serde(rename = "Ham")]
    pub ham: String,
    #[serde(rename = "Spam")]
    pub spam: String,
}

impl From<PredictionResult> for PredictionResponse {
    fn from(result: PredictionResult) -> Self {
        let prediction = result.class.index() as u8;
        Self {
            message: result.message,
            transformed: result.normalized,
            prediction,
            result: result_label(prediction).to_string(),
            probabilities: FormattedProbabilities {
                ham: format_percent(result.probabilities.ham),
                spam: format_percent(result.probabilities.spam),
            },
        }
    }
}

fn result_label(prediction: u8) -> &'static str {
    if prediction == 1 {
        "Spam"
    } else {
        "Not Spam"
    }
}

/// Format a probability as a percentage, e.g. 0.95234 -> "95.23%"
pub fn format_percent(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Spam inference service
#[derive(Clone)]
pub struct InferenceService {
    state: ArtifactState,
}

impl InferenceService {
    /// Create a service over artifacts loaded at startup
    pub fn new(state: ArtifactState) -> Self {
        Self { state }
    }

    /// Artifact state the service was built with
    pub fn state(&self) -> &ArtifactState {
        &self.state
    }

    /// Classify a raw request body
    pub fn classify(&self, body: &[u8]) -> Result<PredictionResponse, ClassifyError> {
        // Checked before the body is even parsed
        let artifacts = self
            .state
            .artifacts()
            .ok_or(ClassifyError::ArtifactsUnavailable)?;

        let message = extract_message(body)?;
        let result = run_pipeline(artifacts, message)?;
        Ok(result.into())
    }

    /// Classify a raw request body into a status code and JSON body
    pub fn respond(&self, body: &[u8]) -> (StatusCode, Value) {
        match self.classify(body) {
            Ok(response) => to_json(StatusCode::OK, serde_json::to_value(response)),
            Err(e) => error_response(e),
        }
    }

    /// Answer a request whose body the transport could not read (too large,
    /// interrupted). Unavailable artifacts still take precedence.
    pub fn respond_unreadable(
        &self,
        status: StatusCode,
        reason: impl Into<String>,
    ) -> (StatusCode, Value) {
        let err = match self.state.artifacts() {
            None => ClassifyError::ArtifactsUnavailable,
            Some(_) => ClassifyError::UnreadableBody {
                status,
                reason: reason.into(),
            },
        };
        error_response(err)
    }

    /// Classify one message
    pub fn predict(&self, message: &str) -> Result<PredictionResult, ClassifyError> {
        let artifacts = self
            .state
            .artifacts()
            .ok_or(ClassifyError::ArtifactsUnavailable)?;
        run_pipeline(artifacts, message.to_string())
    }
}

fn error_response(e: ClassifyError) -> (StatusCode, Value) {
    match e.kind() {
        ErrorKind::InferenceFault => warn!("Prediction failed: {}", e),
        _ => debug!("Rejected request: {}", e),
    }
    to_json(e.status_code(), serde_json::to_value(e.body()))
}

fn to_json(status: StatusCode, payload: serde_json::Result<Value>) -> (StatusCode, Value) {
    match payload {
        Ok(value) => (status, value),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({
                "error": "An internal error occurred during prediction.",
                "details": e.to_string(),
            }),
        ),
    }
}

fn extract_message(body: &[u8]) -> Result<String, ClassifyError> {
    let payload: Value = serde_json::from_slice(body).map_err(ClassifyError::InvalidJson)?;

    match payload.get("message") {
        None => Err(ClassifyError::MissingMessage),
        Some(Value::String(message)) => Ok(message.clone()),
        Some(_) => Err(ClassifyError::MessageNotString),
    }
}

fn run_pipeline(artifacts: &Artifacts, message: String) -> Result<PredictionResult, ClassifyError> {
    let normalized = artifacts.normalizer().normalize(&message);
    let vector = artifacts.vectorizer().transform(&normalized);
    let probabilities = artifacts.classifier().predict_proba(&vector)?;

    let in_range =
        (0.0..=1.0).contains(&probabilities.ham) && (0.0..=1.0).contains(&probabilities.spam);
    if !in_range || (probabilities.ham + probabilities.spam - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(SpamError::InvalidArtifact(format!(
            "classifier returned an invalid distribution ({}, {})",
            probabilities.ham, probabilities.spam
        ))
        .into());
    }

    let class = probabilities.argmax();
    debug!(
        "Classified as {} (ham {:.4}, spam {:.4})",
        class.label(),
        probabilities.ham,
        probabilities.spam
    );

    Ok(PredictionResult {
        message,
        normalized,
        class,
        probabilities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::training::fixtures;
    use crate::model::{Classifier, FeatureVector};
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::LazyLock;

    static SHARED: LazyLock<InferenceService> = LazyLock::new(service);

    fn service() -> InferenceService {
        InferenceService::new(ArtifactState::ready(fixtures::artifacts()))
    }

    fn percent(value: &Value) -> f64 {
        value
            .as_str()
            .and_then(|s| s.strip_suffix('%'))
            .and_then(|s| s.parse().ok())
            .expect("percentage string")
    }

    #[test]
    fn test_spam_message() {
        let response = service()
            .classify(br#"{"message": "WINNER! Claim your free prize now!!!"}"#)
            .unwrap();

        assert_eq!(response.transformed, "winner claim free prize");
        assert_eq!(response.prediction, 1);
        assert_eq!(response.result, "Spam");
    }

    #[test]
    fn test_ham_message() {
        let response = service()
            .classify(br#"{"message": "Let's meet at 5 for coffee"}"#)
            .unwrap();

        assert_eq!(response.transformed, "let meet 5 coffe");
        assert_eq!(response.prediction, 0);
        assert_eq!(response.result, "Not Spam");
    }

    #[test]
    fn test_empty_message_still_predicts() {
        let (status, body) = service().respond(br#"{"message": ""}"#);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transformed"], "");

        let total =
            percent(&body["probabilities"]["Ham"]) + percent(&body["probabilities"]["Spam"]);
        assert!((total - 100.0).abs() <= 0.011);
    }

    #[test]
    fn test_prediction_matches_probabilities() {
        let service = service();
        for message in [
            "WINNER! Claim your free prize now!!!",
            "Let's meet at 5 for coffee",
            "free coffee",
            "nothing in the vocabulary",
        ] {
            let request = json!({ "message": message }).to_string();
            let (status, body) = service.respond(request.as_bytes());
            assert_eq!(status, StatusCode::OK);

            let ham = percent(&body["probabilities"]["Ham"]);
            let spam = percent(&body["probabilities"]["Spam"]);
            assert!((ham + spam - 100.0).abs() <= 0.011, "{}: {} + {}", message, ham, spam);
            assert_eq!(body["prediction"] == 1, spam > ham, "{}", message);
            assert_eq!(body["result"] == "Spam", body["prediction"] == 1);
            assert_eq!(body["message"], message);
        }
    }

    #[test]
    fn test_missing_message() {
        let (status, body) = service().respond(br#"{"text": "hello"}"#);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Missing \"message\" key in JSON payload" }));

        let (status, _) = service().respond(b"[1, 2, 3]");
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_message_not_string() {
        let err = service().classify(br#"{"message": 42}"#).unwrap_err();
        assert!(matches!(err, ClassifyError::MessageNotString));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_invalid_json() {
        let (status, body) = service().respond(b"{not json");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid JSON payload");
        assert!(body["details"].is_string());
    }

    #[test]
    fn test_unavailable_checked_before_parsing() {
        let service = InferenceService::new(ArtifactState::unavailable("model.bin missing"));

        let (status, body) = service.respond(b"{not json");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "artifacts unavailable" }));

        let err = service.predict("hello").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StartupArtifact);
    }

    #[test]
    fn test_inference_fault_is_isolated() {
        use crate::model::{MultinomialNb, TfidfVectorizer, VectorizerParams};
        use crate::text::Normalizer;

        let vectorizer =
            TfidfVectorizer::fit(&["winner prize", "coffe meet"], VectorizerParams::default())
                .unwrap();
        let classifier = MultinomialNb::fit(
            &[FeatureVector::new(2, vec![(0, 1.0)]), FeatureVector::new(2, vec![(1, 1.0)])],
            &[Class::Ham, Class::Spam],
            1.0,
        )
        .unwrap();
        assert_ne!(vectorizer.n_features(), classifier.n_features());

        let service = InferenceService::new(ArtifactState::ready(Artifacts::new(
            Normalizer::english(),
            vectorizer,
            classifier,
        )));

        let (status, body) = service.respond(br#"{"message": "winner"}"#);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An internal error occurred during prediction.");
        assert!(body["details"].as_str().unwrap().contains("dimensions"));

        // The service keeps answering afterwards
        let (status, _) = service.respond(br#"{"text": "x"}"#);
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    proptest! {
        #[test]
        fn prop_probabilities_are_a_distribution(message in any::<String>()) {
            let result = SHARED.predict(&message).unwrap();
            let p = result.probabilities;

            prop_assert!((0.0..=1.0).contains(&p.ham) && (0.0..=1.0).contains(&p.spam));
            prop_assert!((p.ham + p.spam - 1.0).abs() <= PROBABILITY_TOLERANCE);
            prop_assert_eq!(result.class == Class::Spam, p.spam > p.ham);
        }

        #[test]
        fn prop_response_is_consistent(message in any::<String>()) {
            let request = json!({ "message": message }).to_string();
            let (status, body) = SHARED.respond(request.as_bytes());
            prop_assert_eq!(status, StatusCode::OK);

            let ham = percent(&body["probabilities"]["Ham"]);
            let spam = percent(&body["probabilities"]["Spam"]);
            prop_assert!((ham + spam - 100.0).abs() <= 0.011, "{} + {}", ham, spam);
            // Formatting only rounds, so a strict gap decides the argmax
            if (spam - ham).abs() > 0.01 {
                prop_assert_eq!(body["prediction"] == 1, spam > ham);
            }
            prop_assert_eq!(body["result"] == "Spam", body["prediction"] == 1);
            prop_assert_eq!(&body["message"], &json!(message));
        }
    }

    #[test]
    fn test_unreadable_body() {
        let (status, body) =
            service().respond_unreadable(StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded");
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "Failed to read request body");
        assert_eq!(body["details"], "length limit exceeded");

        let degraded = InferenceService::new(ArtifactState::unavailable("model.bin missing"));
        let (status, body) =
            degraded.respond_unreadable(StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "artifacts unavailable" }));
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.95234), "95.23%");
        assert_eq!(format_percent(1.0), "100.00%");
        assert_eq!(format_percent(0.0), "0.00%");
    }

    #[test]
    fn test_concurrent_requests_share_artifacts() {
        let service = service();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let service = &service;
                    scope.spawn(move || {
                        let message = if i % 2 == 0 {
                            "free prize winner"
                        } else {
                            "coffee tomorrow"
                        };
                        service.predict(message).unwrap().class
                    })
                })
                .collect();

            for (i, handle) in handles.into_iter().enumerate() {
                let expected = if i % 2 == 0 { Class::Spam } else { Class::Ham };
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
