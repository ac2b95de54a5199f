//! Lexical normalizer
//!
//! Turns raw text into the canonical form the vectorizer was trained on:
//! lowercase, tokenize, keep alphanumeric tokens, drop stopwords and
//! punctuation, stem, and join with single spaces.

use rust_stemmers::{Algorithm, Stemmer};

use super::stopwords::StopwordFilter;
use super::tokenizer::word_tokenize;

/// Deterministic text normalizer
pub struct Normalizer {
    filter: StopwordFilter,
    stemmer: Stemmer,
}

impl Normalizer {
    /// Create a normalizer around a stopword filter
    pub fn new(filter: StopwordFilter) -> Self {
        Self {
            filter,
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Normalizer with the built-in English stopword list
    pub fn english() -> Self {
        Self::new(StopwordFilter::english())
    }

    /// Stemmed, filtered tokens in original order
    pub fn tokens(&self, raw: &str) -> Vec<String> {
        word_tokenize(&raw.to_lowercase())
            .into_iter()
            .filter(|token| token.chars().all(char::is_alphanumeric))
            .filter(|token| !self.filter.is_filtered(token))
            .map(|token| self.stemmer.stem(&token).into_owned())
            .collect()
    }

    /// Normalize raw text. Never fails; text without content yields "".
    pub fn normalize(&self, raw: &str) -> String {
        self.tokens(raw).join(" ")
    }

    /// Stopword filter in use
    pub fn filter(&self) -> &StopwordFilter {
        &self.filter
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::english()
    }
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("stopwords", &self.filter.len())
            .field("stemmer", &"english")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_spam_message() {
        let normalizer = Normalizer::english();
        assert_eq!(
            normalizer.normalize("WINNER! Claim your free prize now!!!"),
            "winner claim free prize"
        );
    }

    #[test]
    fn test_ham_message() {
        let normalizer = Normalizer::english();
        assert_eq!(
            normalizer.normalize("Let's meet at 5 for coffee"),
            "let meet 5 coffe"
        );
    }

    #[test]
    fn test_empty_results() {
        let normalizer = Normalizer::english();
        assert_eq!(normalizer.normalize(""), "");
        assert_eq!(normalizer.normalize("!!! ??? ... -- ;)"), "");
        assert_eq!(normalizer.normalize("The and IS of to"), "");
        assert_eq!(normalizer.normalize("   "), "");
    }

    #[test]
    fn test_cannot_is_two_stopwords() {
        let normalizer = Normalizer::english();
        assert_eq!(normalizer.normalize("I cannot come"), "come");
        assert_eq!(normalizer.normalize("gonna win"), "gon na win");
    }

    #[test]
    fn test_drops_tokens_mixing_symbols() {
        let normalizer = Normalizer::english();
        assert_eq!(normalizer.normalize("e-mail 5,000 www.site.com"), "");
    }

    #[test]
    fn test_idempotent_on_converged_output() {
        let normalizer = Normalizer::english();
        let once = normalizer.normalize("WINNER! Claim your free prize now!!!");
        assert_eq!(normalizer.normalize(&once), once);
    }

    #[test]
    fn test_preserves_order() {
        let normalizer = Normalizer::english();
        assert_eq!(normalizer.normalize("prize claim winner"), "prize claim winner");
    }

    #[test]
    fn test_non_ascii_does_not_fail() {
        let normalizer = Normalizer::english();
        let out = normalizer.normalize("Café olé \u{1f600} \u{4f60}\u{597d}");
        assert!(!out.is_empty());
        assert!(!out.contains('\u{1f600}'));
    }

    /// Apply `normalize` until the output stops changing
    fn converge(normalizer: &Normalizer, raw: &str) -> Option<String> {
        let mut current = normalizer.normalize(raw);
        for _ in 0..8 {
            let next = normalizer.normalize(&current);
            if next == current {
                return Some(current);
            }
            current = next;
        }
        None
    }

    proptest! {
        #[test]
        fn prop_no_alphanumeric_is_empty(raw in any::<String>()) {
            let raw: String = raw.chars().filter(|c| !c.is_alphanumeric()).collect();
            prop_assert_eq!(Normalizer::english().normalize(&raw), "");
        }

        #[test]
        fn prop_output_tokens_are_alphanumeric(raw in any::<String>()) {
            let out = Normalizer::english().normalize(&raw);
            for token in out.split(' ').filter(|t| !t.is_empty()) {
                prop_assert!(token.chars().all(char::is_alphanumeric), "token {:?}", token);
            }
            prop_assert!(!out.contains("  "));
        }

        #[test]
        fn prop_idempotent_once_converged(raw in "[A-Za-z0-9 !?.,'-]{0,80}|\\PC{0,40}") {
            let normalizer = Normalizer::english();
            let converged = converge(&normalizer, &raw);
            prop_assert!(converged.is_some(), "no fixed point for {:?}", raw);
            if let Some(fixed) = converged {
                prop_assert_eq!(normalizer.normalize(&fixed), fixed);
            }
        }
    }

    #[test]
    fn test_custom_stopwords() {
        let normalizer = Normalizer::new(StopwordFilter::from_words(["prize"]));
        assert_eq!(normalizer.normalize("the prize"), "the");
    }
}
