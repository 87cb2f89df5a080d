//! Keyword relevance helpers shared by the memory, knowledge and context sources.

use std::collections::BTreeSet;

const STOPWORDS: &[&str] = &[
    "a", "about", "am", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can",
    "could", "did", "do", "does", "for", "from", "how", "i", "in", "into", "is", "it", "its",
    "me", "my", "of", "on", "or", "our", "please", "should", "tell", "that", "the", "there",
    "these", "this", "those", "to", "us", "was", "we", "were", "what", "when", "where",
    "which", "who", "whom", "why", "will", "with", "would", "you", "your",
];

/// Lowercased alphanumeric tokens, in order.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Tokens with stopwords removed, in order and with repeats.
///
/// Falls back to every token when the text is nothing but stopwords.
pub fn content_tokens(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let content: Vec<String> = tokens
        .iter()
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .cloned()
        .collect();
    if content.is_empty() { tokens } else { content }
}

/// Distinct content terms of a text.
///
/// Stopwords are removed unless nothing else remains, so "what is it"
/// still has terms to match on.
pub fn terms(text: &str) -> BTreeSet<String> {
    content_tokens(text).into_iter().collect()
}

/// Symmetric term overlap (Dice coefficient) in [0, 1].
///
/// Used to compare two questions: identical questions score 1.0.
pub fn similarity(a: &str, b: &str) -> f32 {
    let ta = terms(a);
    let tb = terms(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let shared = ta.intersection(&tb).count();
    (2 * shared) as f32 / (ta.len() + tb.len()) as f32
}

/// Fraction of the query's terms that occur in `passage`, in [0, 1].
///
/// Used to score passages against a question: the passage may be much
/// longer than the question without being penalized.
pub fn coverage(query: &str, passage: &str) -> f32 {
    let tq = terms(query);
    if tq.is_empty() {
        return 0.0;
    }
    let passage_tokens: BTreeSet<String> = tokenize(passage).into_iter().collect();
    let present = tq.iter().filter(|t| passage_tokens.contains(*t)).count();
    present as f32 / tq.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_strips_punctuation_and_case() {
        assert_eq!(tokenize("What's the Refund-Policy?"), vec!["what", "s", "the", "refund", "policy"]);
    }

    #[test]
    fn terms_drop_stopwords() {
        let t = terms("What is the refund policy?");
        assert_eq!(t.into_iter().collect::<Vec<_>>(), vec!["policy", "refund"]);
    }

    #[test]
    fn terms_keep_stopwords_when_nothing_else_remains() {
        let t = terms("what is it");
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn content_tokens_keep_repeats() {
        assert_eq!(content_tokens("refund the refund"), vec!["refund", "refund"]);
        assert_eq!(content_tokens("is it"), vec!["is", "it"]);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = "refund policy for digital goods";
        let b = "what is the refund policy";
        assert!((similarity(a, b) - similarity(b, a)).abs() < 1e-6);
        assert!((similarity(a, b) - 2.0 * 2.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn similarity_of_empty_text_is_zero() {
        assert_eq!(similarity("", "refund"), 0.0);
        assert_eq!(similarity("   ", "   "), 0.0);
    }

    #[test]
    fn coverage_ignores_passage_length() {
        let passage = "Our refund policy: purchases may be returned within 30 days for a full refund.";
        assert!((coverage("What is the refund policy?", passage) - 1.0).abs() < 1e-6);
        assert!((coverage("refund shipping", passage) - 0.5).abs() < 1e-6);
    }
}
