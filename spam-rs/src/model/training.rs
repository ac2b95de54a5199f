//! Offline training helper
//!
//! Fits the vectorizer and classifier from a labeled corpus using the same
//! normalizer the service uses, so persisted artifacts round-trip into
//! identical predictions.

use std::path::Path;
use tracing::{debug, info};

use super::classifier::{Class, Classifier, MultinomialNb};
use super::vectorizer::{TfidfVectorizer, VectorizerParams};
use crate::error::{Result, SpamError};
use crate::text::Normalizer;

/// One labeled training message
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMessage {
    pub class: Class,
    pub text: String,
}

/// Training parameters
#[derive(Debug, Clone, Copy)]
pub struct TrainingParams {
    pub vectorizer: VectorizerParams,
    /// Naive Bayes smoothing
    pub alpha: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            vectorizer: VectorizerParams {
                max_features: Some(3000),
                ..VectorizerParams::default()
            },
            alpha: 1.0,
        }
    }
}

/// Output of a training run
#[derive(Debug)]
pub struct TrainedModel {
    pub vectorizer: TfidfVectorizer,
    pub classifier: MultinomialNb,
    /// Accuracy on the training corpus itself
    pub accuracy: f64,
    pub samples: usize,
}

/// Parse a corpus in `label<TAB>text` form (labels `ham`/`spam` or `0`/`1`).
///
/// Blank lines and a leading `label`/`v1` header line are skipped.
pub fn parse_corpus(content: &str) -> Result<Vec<LabeledMessage>> {
    let mut messages = Vec::new();

    for (number, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let (label, text) = line.split_once('\t').ok_or_else(|| {
            SpamError::Training(format!("line {}: expected label<TAB>text", number + 1))
        })?;

        let class = match label.trim().to_lowercase().as_str() {
            "ham" | "0" => Class::Ham,
            "spam" | "1" => Class::Spam,
            "label" | "v1" if number == 0 => continue,
            other => {
                return Err(SpamError::Training(format!(
                    "line {}: unknown label '{}'",
                    number + 1,
                    other
                )))
            }
        };

        messages.push(LabeledMessage {
            class,
            text: text.to_string(),
        });
    }

    Ok(messages)
}

/// Read and parse a corpus file
pub fn load_corpus(path: &Path) -> Result<Vec<LabeledMessage>> {
    let content = std::fs::read_to_string(path)?;
    parse_corpus(&content)
}

/// Fit vectorizer and classifier on a labeled corpus
pub fn train(
    corpus: &[LabeledMessage],
    normalizer: &Normalizer,
    params: TrainingParams,
) -> Result<TrainedModel> {
    info!("Training on {} messages", corpus.len());

    let documents: Vec<String> = corpus.iter().map(|m| normalizer.normalize(&m.text)).collect();
    let labels: Vec<Class> = corpus.iter().map(|m| m.class).collect();

    let vectorizer = TfidfVectorizer::fit(&documents, params.vectorizer)?;
    debug!("Vocabulary size: {}", vectorizer.n_features());

    let vectors: Vec<_> = documents.iter().map(|d| vectorizer.transform(d)).collect();
    let classifier = MultinomialNb::fit(&vectors, &labels, params.alpha)?;

    let mut correct = 0usize;
    for (vector, label) in vectors.iter().zip(&labels) {
        if classifier.predict(vector)? == *label {
            correct += 1;
        }
    }
    let accuracy = correct as f64 / corpus.len() as f64;

    info!(
        "Trained {} features, training accuracy {:.2}%",
        vectorizer.n_features(),
        accuracy * 100.0
    );

    Ok(TrainedModel {
        vectorizer,
        classifier,
        accuracy,
        samples: corpus.len(),
    })
}
