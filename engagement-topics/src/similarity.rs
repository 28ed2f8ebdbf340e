//! Lexical similarity scoring (spec §4.5): a blend of Jaccard and Overlap
//! coefficients over lowercased, stop-length-filtered tokens. Deliberately
//! simple — swapping in an embedding-based similarity later only means
//! replacing this module, not the clustering loop that calls it.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

fn non_word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w]+").expect("static regex"))
}

/// `lowercase(t).replace(non-word, ' ').split(whitespace).filter(len>2)`.
pub fn tokenize(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    let spaced = non_word_regex().replace_all(&lowered, " ");
    spaced
        .split_whitespace()
        .filter(|tok| tok.len() > 2)
        .map(|tok| tok.to_string())
        .collect()
}

/// `0.4*Jaccard + 0.6*Overlap` over two already-tokenized sets; 0 if
/// either set is empty.
pub fn similarity_of_tokens(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    let min_len = a.len().min(b.len()) as f64;

    let jaccard = intersection / union;
    let overlap = intersection / min_len;
    0.4 * jaccard + 0.6 * overlap
}

/// Convenience wrapper over raw text, used by callers that don't need to
/// reuse a tokenized set across multiple comparisons.
pub fn similarity(a: &str, b: &str) -> f64 {
    similarity_of_tokens(&tokenize(a), &tokenize(b))
}
