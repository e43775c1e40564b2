// src/core/similarity.rs — N-gram overlap scoring for deduplication

use std::collections::HashSet;

use super::types::GeneratedConversation;

/// Word n-gram size. Bigrams catch reworded near-duplicates that plain
/// word-set overlap misses, without being as brittle as longer grams.
const NGRAM: usize = 2;

/// Precision-style overlap between a candidate and a reference text.
///
/// Fraction of the candidate's word bigrams that also occur in the
/// reference, normalized to [0, 1]; higher means more similar. Texts
/// shorter than one bigram fall back to single-word grams.
pub fn similarity(candidate: &str, reference: &str) -> f32 {
    let cand = ngrams(candidate);
    let refr = ngrams(reference);

    if cand.is_empty() && refr.is_empty() {
        return 1.0;
    }
    if cand.is_empty() || refr.is_empty() {
        return 0.0;
    }

    let overlap = cand.intersection(&refr).count();
    overlap as f32 / cand.len() as f32
}

/// True when the candidate scores above `threshold` against **any**
/// already-accepted item. O(n) in the accepted set; cost grows with
/// run size.
pub fn is_duplicate(
    candidate: &str,
    accepted: &[GeneratedConversation],
    threshold: f32,
) -> bool {
    accepted
        .iter()
        .any(|item| similarity(candidate, &item.text) > threshold)
}

fn ngrams(text: &str) -> HashSet<String> {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect();

    if words.len() < NGRAM {
        return words.into_iter().collect();
    }

    words.windows(NGRAM).map(|w| w.join(" ")).collect()
}
