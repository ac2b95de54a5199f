//! spam-rs: SMS spam classification service
//!
//! Classifies short text messages as spam or ham using a frozen TF-IDF
//! vectorizer and a multinomial naive Bayes classifier, both trained offline
//! and loaded once at startup.
//!
//! # Features
//!
//! - English text normalization (tokenize, stopword filter, Porter2 stemming)
//! - TF-IDF vectorization with a fixed vocabulary
//! - `POST /predict` JSON API with typed error responses
//! - Degraded mode when artifacts are missing or corrupt
//! - Offline training from a tab-separated corpus
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! listen_addr = "0.0.0.0:5000"
//!
//! [artifacts]
//! vectorizer_path = "artifacts/vectorizer.bin"
//! model_path = "artifacts/model.bin"
//!
//! [logging]
//! level = "spam_rs=info,tower_http=info"
//! format = "json"
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod model;
pub mod service;
pub mod text;

pub use api::ApiServer;
pub use config::ClassifierConfig;
pub use error::{Result, SpamError};
pub use model::ArtifactState;
pub use service::{ClassifyError, InferenceService, PredictionResponse};
pub use text::Normalizer;
