//! Word tokenizer for written English
//!
//! Splits text into word-like and punctuation-like units, in the manner of a
//! Treebank-style tokenizer: punctuation is detached from words, English
//! contractions are split (`don't` -> `do`, `n't`; `cannot` -> `can`, `not`),
//! and separators inside numbers (`5,000`, `12:30`) are kept.

/// Characters that always form a token of their own
const ALWAYS_SPLIT: &[char] = &[
    '?', '!', ';', '@', '#', '$', '%', '&', '(', ')', '[', ']', '{', '}', '<', '>', '"', '`',
    '\u{201c}', '\u{201d}', '\u{ab}', '\u{bb}', '\u{2026}',
];

/// Clitic suffixes detached from the word they follow
const CLITICS: &[&str] = &["n't", "'ll", "'re", "'ve", "'s", "'m", "'d"];

/// Whole words split in two, with the byte offset of the split
const SPECIAL_SPLITS: &[(&str, usize)] = &[
    ("cannot", 3),
    ("d'ye", 1),
    ("gimme", 3),
    ("gonna", 3),
    ("gotta", 3),
    ("lemme", 3),
    ("more'n", 4),
    ("wanna", 3),
];

/// Tokenize text into words and punctuation marks, preserving order.
pub fn word_tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    for chunk in text.split_whitespace() {
        let chunk = chunk.replace('\u{2019}', "'");
        let mut piece = String::new();

        for c in chunk.chars() {
            if ALWAYS_SPLIT.contains(&c) {
                split_separators(&std::mem::take(&mut piece), &mut tokens);
                tokens.push(c.to_string());
            } else {
                piece.push(c);
            }
        }
        split_separators(&piece, &mut tokens);
    }

    tokens
}

/// Split on `,` and `:` unless they sit between two digits.
fn split_separators(piece: &str, tokens: &mut Vec<String>) {
    let chars: Vec<char> = piece.chars().collect();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        let is_separator = c == ',' || c == ':';
        let inside_number = i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());

        if is_separator && !inside_number {
            split_word(&std::mem::take(&mut current), tokens);
            tokens.push(c.to_string());
        } else {
            current.push(c);
        }
    }
    split_word(&current, tokens);
}

/// Peel leading and trailing punctuation, then detach clitics.
fn split_word(word: &str, tokens: &mut Vec<String>) {
    if word.is_empty() {
        return;
    }

    let start = word
        .char_indices()
        .find(|(_, c)| c.is_alphanumeric())
        .map(|(i, _)| i);

    let Some(start) = start else {
        tokens.extend(word.chars().map(String::from));
        return;
    };

    // `start` found an alphanumeric char, so `end` always exists
    let end = word
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_alphanumeric())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(word.len());

    tokens.extend(word[..start].chars().map(String::from));

    let core = &word[start..end];
    let trailing = &word[end..];

    match split_special(core).or_else(|| split_clitic(core)) {
        Some((stem, clitic)) => {
            tokens.push(stem.to_string());
            tokens.push(clitic.to_string());
        }
        None => tokens.push(core.to_string()),
    }

    tokens.extend(trailing.chars().map(String::from));
}

fn split_special(core: &str) -> Option<(&str, &str)> {
    SPECIAL_SPLITS
        .iter()
        .find(|(word, _)| core.eq_ignore_ascii_case(word))
        .map(|&(_, at)| core.split_at(at))
}

fn split_clitic(core: &str) -> Option<(&str, &str)> {
    let lower = core.to_ascii_lowercase();
    CLITICS.iter().find_map(|clitic| {
        if lower.ends_with(clitic) && core.len() > clitic.len() {
            let at = core.len() - clitic.len();
            Some((&core[..at], &core[at..]))
        } else {
            None
        }
    })
}
