//! Stopword and punctuation filter
//!
//! Static membership test used by the normalizer. Built once at startup and
//! shared read-only afterwards.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{Result, SpamError};

/// Standard English stopword list
pub const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

/// ASCII punctuation characters
pub const PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Stopword/punctuation membership filter
#[derive(Debug, Clone)]
pub struct StopwordFilter {
    stopwords: HashSet<String>,
    punctuation: HashSet<char>,
}

impl StopwordFilter {
    /// Filter with the built-in English stopword list
    pub fn english() -> Self {
        Self::from_words(ENGLISH_STOPWORDS.iter().copied())
    }

    /// Filter with a custom stopword list
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stopwords: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
            punctuation: PUNCTUATION.chars().collect(),
        }
    }

    /// Load a stopword list from a file, one word per line.
    ///
    /// Blank lines and lines starting with `#` are ignored. An unreadable or
    /// empty list is an error: filtering is never silently skipped.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SpamError::Resource(format!(
                "Failed to read stopword list {}: {}",
                path.display(),
                e
            ))
        })?;

        let filter = Self::from_words(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        );

        if filter.is_empty() {
            return Err(SpamError::Resource(format!(
                "Stopword list {} is empty",
                path.display()
            )));
        }

        Ok(filter)
    }

    /// Whether a token must be dropped before stemming
    pub fn is_filtered(&self, token: &str) -> bool {
        self.stopwords.contains(token) || self.is_punctuation(token)
    }

    /// Whether the token is a single punctuation character
    pub fn is_punctuation(&self, token: &str) -> bool {
        let mut chars = token.chars();
        matches!((chars.next(), chars.next()), (Some(c), None) if self.punctuation.contains(&c))
    }

    /// Number of stopwords
    pub fn len(&self) -> usize {
        self.stopwords.len()
    }

    /// Whether the stopword list is empty
    pub fn is_empty(&self) -> bool {
        self.stopwords.is_empty()
    }
}

impl Default for StopwordFilter {
    fn default() -> Self {
        Self::english()
    }
}
