//! Fuzzy matching of free-text specify fields.

use rapidfuzz::distance::jaro_winkler;

/// Minimum Jaro-Winkler similarity for a free-text match.
pub const SIMILARITY_THRESHOLD: f64 = 0.85;

/// True when `text` names `target`, allowing for typos.
///
/// Case-insensitive; a substring hit always matches.
pub fn is_similar_to(text: &str, target: &str) -> bool {
    let text = text.trim().to_lowercase();
    let target = target.to_lowercase();
    if text.is_empty() {
        return false;
    }
    if text.contains(&target) {
        return true;
    }
    jaro_winkler::similarity(text.chars(), target.chars()) > SIMILARITY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_and_typos_match() {
        assert!(is_similar_to("Temporal artery", "temporal"));
        assert!(is_similar_to("TEMPORAL", "temporal"));
        assert!(is_similar_to("temproal", "temporal"));
    }

    #[test]
    fn unrelated_text_does_not_match() {
        assert!(!is_similar_to("forehead strip", "temporal"));
        assert!(!is_similar_to("", "temporal"));
        assert!(!is_similar_to("oral", "temporal"));
    }
}
