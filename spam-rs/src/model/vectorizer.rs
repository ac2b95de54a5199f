//! TF-IDF feature vectorizer
//!
//! Vocabulary and inverse document frequencies are fixed by `fit` and never
//! change afterwards; `transform` only reads them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use crate::error::{Result, SpamError};

/// Runs of two or more word characters
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid token pattern"));

/// Sparse feature vector over a fixed vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    dim: usize,
    /// (index, weight) pairs sorted by index, zero weights omitted
    entries: Vec<(usize, f64)>,
}

impl FeatureVector {
    /// Build a vector; entries are sorted and zero weights dropped
    pub fn new(dim: usize, mut entries: Vec<(usize, f64)>) -> Self {
        entries.retain(|&(_, w)| w != 0.0);
        entries.sort_by_key(|&(i, _)| i);
        Self { dim, entries }
    }

    /// All-zero vector
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            entries: Vec::new(),
        }
    }

    /// Number of dimensions
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Non-zero entries sorted by index
    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    /// Number of non-zero entries
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Whether every component is zero
    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    /// Dense dot product; `weights` must have `dim` components
    pub fn dot(&self, weights: &[f64]) -> f64 {
        self.entries
            .iter()
            .filter_map(|&(i, w)| weights.get(i).map(|v| v * w))
            .sum()
    }
}

/// Vectorizer parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorizerParams {
    /// Keep only the most frequent terms
    pub max_features: Option<usize>,
    /// Add one to document frequencies (as if one extra document held every term)
    pub smooth_idf: bool,
    /// Replace tf with 1 + ln(tf)
    pub sublinear_tf: bool,
    /// L2-normalize each vector
    pub normalize: bool,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            max_features: None,
            smooth_idf: true,
            sublinear_tf: false,
            normalize: true,
        }
    }
}

/// Pre-fitted TF-IDF vectorizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    params: VectorizerParams,
}

impl TfidfVectorizer {
    /// Learn vocabulary and idf weights from normalized documents
    pub fn fit<S: AsRef<str>>(documents: &[S], params: VectorizerParams) -> Result<Self> {
        if documents.is_empty() {
            return Err(SpamError::Training("cannot fit vectorizer on an empty corpus".to_string()));
        }

        let mut term_counts: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();

        for doc in documents {
            let mut seen = HashSet::new();
            for token in analyze(doc.as_ref()) {
                *term_counts.entry(token).or_insert(0) += 1;
                if seen.insert(token) {
                    *doc_freq.entry(token).or_insert(0) += 1;
                }
            }
        }

        if term_counts.is_empty() {
            return Err(SpamError::Training(
                "empty vocabulary; documents contain no terms".to_string(),
            ));
        }

        let mut terms: Vec<&str> = term_counts.keys().copied().collect();
        if let Some(limit) = params.max_features {
            if terms.len() > limit {
                terms.sort_by(|a, b| term_counts[b].cmp(&term_counts[a]).then(a.cmp(b)));
                terms.truncate(limit);
            }
        }
        terms.sort_unstable();

        let n_docs = documents.len() as f64;
        let smoothing = if params.smooth_idf { 1.0 } else { 0.0 };
        let idf = terms
            .iter()
            .map(|t| {
                let df = doc_freq[t] as f64;
                ((n_docs + smoothing) / (df + smoothing)).ln() + 1.0
            })
            .collect();

        let vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i))
            .collect();

        Ok(Self {
            vocabulary,
            idf,
            params,
        })
    }

    /// Transform one normalized text into a feature vector.
    ///
    /// Out-of-vocabulary terms contribute nothing.
    pub fn transform(&self, text: &str) -> FeatureVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in analyze(text) {
            if let Some(&index) = self.vocabulary.get(token) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, tf)| {
                let tf = if self.params.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (index, tf * self.idf[index])
            })
            .collect();

        if self.params.normalize {
            let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, w) in entries.iter_mut() {
                    *w /= norm;
                }
            }
        }

        FeatureVector::new(self.idf.len(), entries)
    }

    /// Number of features (vocabulary size)
    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    /// Feature index of a term
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Check internal consistency after deserialization
    pub fn validate(&self) -> Result<()> {
        if self.vocabulary.len() != self.idf.len() {
            return Err(SpamError::InvalidArtifact(format!(
                "vectorizer vocabulary has {} terms but {} idf weights",
                self.vocabulary.len(),
                self.idf.len()
            )));
        }
        if self.vocabulary.values().any(|&i| i >= self.idf.len()) {
            return Err(SpamError::InvalidArtifact(
                "vectorizer vocabulary index out of range".to_string(),
            ));
        }
        if self.idf.iter().any(|w| !w.is_finite()) {
            return Err(SpamError::InvalidArtifact(
                "vectorizer has non-finite idf weights".to_string(),
            ));
        }
        Ok(())
    }
}

fn analyze(text: &str) -> impl Iterator<Item = &str> {
    TOKEN_PATTERN.find_iter(text).map(|m| m.as_str())
}
