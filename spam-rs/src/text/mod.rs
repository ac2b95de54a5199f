//! Text normalization module
//!
//! Tokenizer, stopword filter and stemming normalizer shared by serving and
//! training.

pub mod normalizer;
pub mod stopwords;
pub mod tokenizer;

pub use normalizer::Normalizer;
pub use stopwords::StopwordFilter;
pub use tokenizer::word_tokenize;
