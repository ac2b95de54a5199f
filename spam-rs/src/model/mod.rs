//! Model module
//!
//! Frozen TF-IDF vectorizer, probabilistic classifier, artifact persistence
//! and the offline training helper.

pub mod artifacts;
pub mod classifier;
pub mod training;
pub mod vectorizer;

pub use artifacts::{ArtifactState, Artifacts};
pub use classifier::{Class, ClassProbabilities, Classifier, MultinomialNb};
pub use training::{TrainedModel, TrainingParams};
pub use vectorizer::{FeatureVector, TfidfVectorizer, VectorizerParams};
