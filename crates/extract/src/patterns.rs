//! Domain pattern rules for query-time entity recognition.
//!
//! These run after the statistical tagger (and alone when the tagger is
//! unavailable). All matching is case-insensitive against the full query
//! text; matched spans keep their original casing.

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::{EntityKind, Mention};

/// Up to three qualifying words followed by "visa"/"visas",
/// e.g. "Skilled Worker visa", "Student visa", "Global Talent visa".
static VISA_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b((?:[a-z][a-z'-]*\s+){1,3}visas?)\b").unwrap()
});

/// Document-kind phrases that appear in requirement text.
static DOCUMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(passports?|bank statements?|payslips?|certificate of sponsorship|biometric residence permit|english language test|tuberculosis test|criminal record certificate|marriage certificate|birth certificate|maintenance funds)\b",
    )
    .unwrap()
});

/// Filler words allowed to precede a visa-category phrase but not part of it.
const LEADING_STOPWORDS: &[&str] = &[
    "a", "an", "the", "my", "his", "her", "their", "this", "that", "for", "of", "to", "or", "and",
    "with", "on", "in",
];

/// Apply all domain pattern rules to the query text.
///
/// Visa-category phrases first, then document-kind phrases, each in text
/// order. Deduplication happens in the extractor, not here.
pub fn pattern_mentions(text: &str) -> Vec<Mention> {
    let mut mentions = Vec::new();

    for caps in VISA_PATTERN.captures_iter(text) {
        let raw = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        if let Some(phrase) = trim_leading_stopwords(raw) {
            mentions.push(Mention::new(phrase, EntityKind::VisaCategory));
        }
    }

    for m in DOCUMENT_PATTERN.find_iter(text) {
        mentions.push(Mention::new(m.as_str(), EntityKind::DocumentKind));
    }

    mentions
}

/// Cut a captured visa phrase down to the words after its last filler word.
/// Returns `None` when nothing qualifying is left (a bare "visa" is too
/// generic to match on).
fn trim_leading_stopwords(phrase: &str) -> Option<String> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let mut start = 0;
    for (i, word) in words[..words.len() - 1].iter().enumerate() {
        if LEADING_STOPWORDS.contains(&word.to_lowercase().as_str()) {
            start = i + 1;
        }
    }
    // Require at least one qualifying word before "visa".
    if words.len() - start < 2 {
        return None;
    }
    Some(words[start..].join(" "))
}
