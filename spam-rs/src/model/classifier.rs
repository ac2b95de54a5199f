//! Probabilistic binary classifier
//!
//! Provides the [`Classifier`] seam and a multinomial naive Bayes
//! implementation over TF-IDF feature vectors.

use serde::{Deserialize, Serialize};

use super::vectorizer::FeatureVector;
use crate::error::{Result, SpamError};

/// Message class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Class {
    /// Legitimate message (index 0)
    Ham,
    /// Spam (index 1)
    Spam,
}

impl Class {
    /// Class index as used by the model (0 = ham, 1 = spam)
    pub fn index(self) -> usize {
        match self {
            Class::Ham => 0,
            Class::Spam => 1,
        }
    }

    /// Human-readable result label
    pub fn label(self) -> &'static str {
        match self {
            Class::Ham => "Not Spam",
            Class::Spam => "Spam",
        }
    }
}

/// Probability distribution over {Ham, Spam}
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub ham: f64,
    pub spam: f64,
}

impl ClassProbabilities {
    /// Most probable class; an exact tie resolves to ham
    pub fn argmax(&self) -> Class {
        if self.spam > self.ham {
            Class::Spam
        } else {
            Class::Ham
        }
    }
}

/// Pre-fitted probabilistic binary classifier
pub trait Classifier: Send + Sync {
    /// Dimension of the feature space the model was fitted on
    fn n_features(&self) -> usize;

    /// Class probabilities for one feature vector
    fn predict_proba(&self, vector: &FeatureVector) -> Result<ClassProbabilities>;

    /// Predicted class, always the argmax of [`Classifier::predict_proba`]
    fn predict(&self, vector: &FeatureVector) -> Result<Class> {
        Ok(self.predict_proba(vector)?.argmax())
    }
}

/// Multinomial naive Bayes classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNb {
    /// Additive smoothing used when fitting
    alpha: f64,
    /// log P(class), indexed by class
    class_log_prior: [f64; 2],
    /// log P(feature | class), indexed by class then feature
    feature_log_prob: [Vec<f64>; 2],
}

impl MultinomialNb {
    /// Fit on feature vectors with their labels
    pub fn fit(vectors: &[FeatureVector], labels: &[Class], alpha: f64) -> Result<Self> {
        if vectors.len() != labels.len() {
            return Err(SpamError::Training(format!(
                "{} vectors but {} labels",
                vectors.len(),
                labels.len()
            )));
        }
        if !(alpha > 0.0 && alpha.is_finite()) {
            return Err(SpamError::Training(format!(
                "smoothing alpha must be positive, got {}",
                alpha
            )));
        }
        let Some(first) = vectors.first() else {
            return Err(SpamError::Training("no training samples".to_string()));
        };

        let n_features = first.dim();
        let mut class_count = [0usize; 2];
        let mut feature_count = [vec![0.0; n_features], vec![0.0; n_features]];

        for (vector, label) in vectors.iter().zip(labels) {
            if vector.dim() != n_features {
                return Err(SpamError::ShapeMismatch {
                    expected: n_features,
                    actual: vector.dim(),
                });
            }
            let c = label.index();
            class_count[c] += 1;
            for &(i, w) in vector.entries() {
                // Caller-built vectors may index past `dim`
                let slot = feature_count[c].get_mut(i).ok_or(SpamError::ShapeMismatch {
                    expected: n_features,
                    actual: i + 1,
                })?;
                *slot += w;
            }
        }

        if class_count.iter().any(|&n| n == 0) {
            return Err(SpamError::Training(
                "training data must contain both ham and spam samples".to_string(),
            ));
        }

        let total = vectors.len() as f64;
        let class_log_prior = [
            (class_count[0] as f64 / total).ln(),
            (class_count[1] as f64 / total).ln(),
        ];

        let feature_log_prob = feature_count.map(|counts| {
            let row_total: f64 = counts.iter().sum::<f64>() + alpha * n_features as f64;
            let log_total = row_total.ln();
            counts.iter().map(|c| (c + alpha).ln() - log_total).collect()
        });

        Ok(Self {
            alpha,
            class_log_prior,
            feature_log_prob,
        })
    }

    /// Build a model from externally computed log-probabilities
    pub fn from_log_probs(
        class_log_prior: [f64; 2],
        feature_log_prob: [Vec<f64>; 2],
    ) -> Result<Self> {
        let model = Self {
            alpha: 0.0,
            class_log_prior,
            feature_log_prob,
        };
        model.validate()?;
        Ok(model)
    }

    /// Check internal consistency after deserialization
    pub fn validate(&self) -> Result<()> {
        if self.feature_log_prob[0].len() != self.feature_log_prob[1].len() {
            return Err(SpamError::InvalidArtifact(format!(
                "classifier rows disagree: {} vs {} features",
                self.feature_log_prob[0].len(),
                self.feature_log_prob[1].len()
            )));
        }
        let finite = self
            .class_log_prior
            .iter()
            .chain(self.feature_log_prob.iter().flatten())
            .all(|v| v.is_finite());
        if !finite {
            return Err(SpamError::InvalidArtifact(
                "classifier has non-finite log-probabilities".to_string(),
            ));
        }
        Ok(())
    }
}

impl Classifier for MultinomialNb {
    fn n_features(&self) -> usize {
        self.feature_log_prob[0].len()
    }

    fn predict_proba(&self, vector: &FeatureVector) -> Result<ClassProbabilities> {
        if vector.dim() != self.n_features() {
            return Err(SpamError::ShapeMismatch {
                expected: self.n_features(),
                actual: vector.dim(),
            });
        }

        let jll = [
            self.class_log_prior[0] + vector.dot(&self.feature_log_prob[0]),
            self.class_log_prior[1] + vector.dot(&self.feature_log_prob[1]),
        ];

        // log-sum-exp
        let max = jll[0].max(jll[1]);
        let log_norm = max + ((jll[0] - max).exp() + (jll[1] - max).exp()).ln();
        let ham = (jll[0] - log_norm).exp();
        let spam = (jll[1] - log_norm).exp();

        if !(ham.is_finite() && spam.is_finite()) {
            return Err(SpamError::InvalidArtifact(
                "classifier produced non-finite probabilities".to_string(),
            ));
        }

        Ok(ClassProbabilities { ham, spam })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_set() -> (Vec<FeatureVector>, Vec<Class>) {
        let vectors = vec![
            FeatureVector::new(3, vec![(0, 1.0)]),
            FeatureVector::new(3, vec![(0, 0.6), (1, 0.8)]),
            FeatureVector::new(3, vec![(2, 1.0)]),
            FeatureVector::new(3, vec![(1, 0.6), (2, 0.8)]),
            FeatureVector::new(3, vec![(2, 1.0)]),
        ];
        let labels = vec![Class::Spam, Class::Spam, Class::Ham, Class::Ham, Class::Ham];
        (vectors, labels)
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (vectors, labels) = training_set();
        let model = MultinomialNb::fit(&vectors, &labels, 1.0).unwrap();

        for vector in &vectors {
            let p = model.predict_proba(vector).unwrap();
            assert!((p.ham + p.spam - 1.0).abs() < 1e-12);
            assert!((0.0..=1.0).contains(&p.ham));
            assert_eq!(model.predict(vector).unwrap(), p.argmax());
        }
    }

    #[test]
    fn test_separates_classes() {
        let (vectors, labels) = training_set();
        let model = MultinomialNb::fit(&vectors, &labels, 1.0).unwrap();

        let spammy = FeatureVector::new(3, vec![(0, 1.0)]);
        let hammy = FeatureVector::new(3, vec![(2, 1.0)]);
        assert_eq!(model.predict(&spammy).unwrap(), Class::Spam);
        assert_eq!(model.predict(&hammy).unwrap(), Class::Ham);
    }

    #[test]
    fn test_zero_vector_returns_priors() {
        let (vectors, labels) = training_set();
        let model = MultinomialNb::fit(&vectors, &labels, 1.0).unwrap();

        let p = model.predict_proba(&FeatureVector::zeros(3)).unwrap();
        assert!((p.ham - 0.6).abs() < 1e-12);
        assert!((p.spam - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_shape_mismatch() {
        let (vectors, labels) = training_set();
        let model = MultinomialNb::fit(&vectors, &labels, 1.0).unwrap();

        let result = model.predict_proba(&FeatureVector::zeros(7));
        assert!(matches!(
            result,
            Err(SpamError::ShapeMismatch { expected: 3, actual: 7 })
        ));
    }

    #[test]
    fn test_tie_resolves_to_ham() {
        let half = 0.5f64.ln();
        let model = MultinomialNb::from_log_probs(
            [half, half],
            [vec![half, half], vec![half, half]],
        )
        .unwrap();

        let p = model
            .predict_proba(&FeatureVector::new(2, vec![(0, 1.0)]))
            .unwrap();
        assert_eq!(p.ham, p.spam);
        assert_eq!(p.argmax(), Class::Ham);
    }

    #[test]
    fn test_fit_rejects_entry_outside_dimension() {
        let vectors = vec![
            FeatureVector::new(2, vec![(0, 1.0)]),
            FeatureVector::new(2, vec![(5, 1.0)]),
        ];
        let result = MultinomialNb::fit(&vectors, &[Class::Ham, Class::Spam], 1.0);
        assert!(matches!(
            result,
            Err(SpamError::ShapeMismatch { expected: 2, actual: 6 })
        ));
    }

    #[test]
    fn test_fit_requires_both_classes() {
        let vectors = vec![FeatureVector::new(2, vec![(0, 1.0)])];
        let result = MultinomialNb::fit(&vectors, &[Class::Spam], 1.0);
        assert!(matches!(result, Err(SpamError::Training(_))));
    }

    #[test]
    fn test_from_log_probs_rejects_ragged_rows() {
        let result = MultinomialNb::from_log_probs([0.0, 0.0], [vec![0.0], vec![0.0, 0.0]]);
        assert!(matches!(result, Err(SpamError::InvalidArtifact(_))));
    }

    #[test]
    fn test_class_labels() {
        assert_eq!(Class::Spam.index(), 1);
        assert_eq!(Class::Ham.index(), 0);
        assert_eq!(Class::Spam.label(), "Spam");
        assert_eq!(Class::Ham.label(), "Not Spam");
    }
}
