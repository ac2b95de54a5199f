//! Artifact persistence and the load-once artifact state
//!
//! Each artifact file is a bincode envelope carrying a format version and the
//! artifact kind ahead of the payload, so a swapped or stale file is rejected
//! instead of being misread.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::classifier::{Classifier, MultinomialNb};
use super::vectorizer::TfidfVectorizer;
use crate::config::ArtifactConfig;
use crate::error::{Result, SpamError};
use crate::text::{Normalizer, StopwordFilter};

/// Current artifact file format version
pub const FORMAT_VERSION: u32 = 1;

/// Kind of persisted artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    Vectorizer,
    Classifier,
}

#[derive(Deserialize)]
struct Header {
    format_version: u32,
    kind: ArtifactKind,
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    format_version: u32,
    kind: ArtifactKind,
    payload: T,
}

fn encode<T: Serialize>(kind: ArtifactKind, payload: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(&Envelope {
        format_version: FORMAT_VERSION,
        kind,
        payload,
    })?)
}

fn decode<T: DeserializeOwned>(kind: ArtifactKind, bytes: &[u8]) -> Result<T> {
    let header: Header = bincode::deserialize(bytes)?;
    if header.format_version != FORMAT_VERSION {
        return Err(SpamError::InvalidArtifact(format!(
            "unsupported format version {} (expected {})",
            header.format_version, FORMAT_VERSION
        )));
    }
    if header.kind != kind {
        return Err(SpamError::InvalidArtifact(format!(
            "expected a {:?} artifact, found {:?}",
            kind, header.kind
        )));
    }

    let envelope: Envelope<T> = bincode::deserialize(bytes)?;
    Ok(envelope.payload)
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| SpamError::ArtifactRead {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Persist a fitted vectorizer
pub fn save_vectorizer(path: &Path, vectorizer: &TfidfVectorizer) -> Result<()> {
    write(path, &encode(ArtifactKind::Vectorizer, vectorizer)?)
}

/// Persist a fitted classifier
pub fn save_classifier(path: &Path, classifier: &MultinomialNb) -> Result<()> {
    write(path, &encode(ArtifactKind::Classifier, classifier)?)
}

/// Load and validate a vectorizer artifact
pub fn load_vectorizer(path: &Path) -> Result<TfidfVectorizer> {
    let vectorizer: TfidfVectorizer = decode(ArtifactKind::Vectorizer, &read(path)?)?;
    vectorizer.validate()?;
    Ok(vectorizer)
}

/// Load and validate a classifier artifact
pub fn load_classifier(path: &Path) -> Result<MultinomialNb> {
    let classifier: MultinomialNb = decode(ArtifactKind::Classifier, &read(path)?)?;
    classifier.validate()?;
    Ok(classifier)
}

/// Everything the inference pipeline needs, immutable once built
pub struct Artifacts {
    normalizer: Normalizer,
    vectorizer: TfidfVectorizer,
    classifier: Box<dyn Classifier>,
    loaded_at: DateTime<Utc>,
}

impl Artifacts {
    /// Assemble artifacts from already-built parts
    pub fn new<C: Classifier + 'static>(
        normalizer: Normalizer,
        vectorizer: TfidfVectorizer,
        classifier: C,
    ) -> Self {
        if vectorizer.n_features() != classifier.n_features() {
            warn!(
                "Vectorizer produces {} features but classifier expects {}; predictions will fail",
                vectorizer.n_features(),
                classifier.n_features()
            );
        }

        Self {
            normalizer,
            vectorizer,
            classifier: Box::new(classifier),
            loaded_at: Utc::now(),
        }
    }

    /// Load linguistic resources, vectorizer and classifier from disk
    pub fn load(config: &ArtifactConfig) -> Result<Self> {
        let normalizer = Normalizer::new(match &config.stopwords_path {
            Some(path) => StopwordFilter::from_file(Path::new(path))?,
            None => StopwordFilter::english(),
        });

        let vectorizer = load_vectorizer(Path::new(&config.vectorizer_path))?;
        let classifier = load_classifier(Path::new(&config.model_path))?;

        info!(
            "Artifacts loaded: {} features, {} stopwords",
            vectorizer.n_features(),
            normalizer.filter().len()
        );

        Ok(Self::new(normalizer, vectorizer, classifier))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// When the artifacts were loaded
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Process-wide artifact state, decided once at startup
#[derive(Clone)]
pub enum ArtifactState {
    /// Artifacts loaded and ready to serve
    Ready(Arc<Artifacts>),
    /// Loading failed; every prediction is refused until restart
    Unavailable { reason: String },
}

impl ArtifactState {
    /// Load artifacts, recording failure instead of returning it
    pub fn load(config: &ArtifactConfig) -> Self {
        match Artifacts::load(config) {
            Ok(artifacts) => Self::Ready(Arc::new(artifacts)),
            Err(e) => {
                error!("Artifacts unavailable, serving in degraded mode: {}", e);
                Self::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn ready(artifacts: Artifacts) -> Self {
        Self::Ready(Arc::new(artifacts))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Loaded artifacts, if any
    pub fn artifacts(&self) -> Option<&Arc<Artifacts>> {
        match self {
            Self::Ready(artifacts) => Some(artifacts),
            Self::Unavailable { .. } => None,
        }
    }

    /// Failure reason, if loading failed
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Ready(_) => None,
            Self::Unavailable { reason } => Some(reason),
        }
    }
}
