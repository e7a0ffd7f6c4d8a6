// src/matching/similarity.rs
use rapidfuzz::fuzz;

use crate::models::{ComparatorResult, MatchMethod};

/// Standalone fuzzy comparison counts as a match at or above this score.
pub const FUZZY_MATCH_THRESHOLD: f64 = 80.0;

/// Indel similarity scaled to [0, 100]. Empty input on either side scores 0.
pub fn character_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    fuzz::ratio(a.chars(), b.chars()) * 100.0
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Word-order-insensitive ratio.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    character_ratio(&sorted_tokens(a), &sorted_tokens(b))
}

pub fn fuzzy_match(name_a: &str, name_b: &str) -> ComparatorResult {
    let a = name_a.trim().to_lowercase();
    let b = name_b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return ComparatorResult::no_match(MatchMethod::Fuzzy, "One or both names are empty");
    }

    let score = token_sort_ratio(&a, &b);
    ComparatorResult {
        score,
        matched: score >= FUZZY_MATCH_THRESHOLD,
        method: MatchMethod::Fuzzy,
        details: format!("Token sort similarity {:.1}", score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_ratio_bounds() {
        assert_eq!(character_ratio("ramesh", "ramesh"), 100.0);
        assert_eq!(character_ratio("abc", "xyz"), 0.0);
        assert_eq!(character_ratio("", "abc"), 0.0);
        // "ramesh" / "ramehs" share a 5-char subsequence
        let ratio = character_ratio("ramesh", "ramehs");
        assert!((ratio - 200.0 * 5.0 / 12.0).abs() < 1e-9);
        let ratio = character_ratio("anita desai", "anita sharma");
        assert!((ratio - 69.5652).abs() < 1e-3);
    }

    #[test]
    fn test_character_ratio_is_symmetric() {
        let pairs = [("rohit", "ramehs"), ("anita", "anitha"), ("kumar", "kumari")];
        for (a, b) in pairs {
            assert_eq!(character_ratio(a, b), character_ratio(b, a));
        }
    }

    #[test]
    fn test_token_sort_ignores_word_order() {
        assert_eq!(token_sort_ratio("Singh Ramesh", "Ramesh Singh"), 100.0);
        assert!(character_ratio("Singh Ramesh", "Ramesh Singh") < 100.0);
    }

    #[test]
    fn test_fuzzy_threshold_boundaries() {
        let result = fuzzy_match("X", "X");
        assert_eq!(result.score, 100.0);
        assert!(result.matched);
        assert_eq!(result.method, MatchMethod::Fuzzy);

        let result = fuzzy_match("", "Y");
        assert_eq!(result.score, 0.0);
        assert!(!result.matched);
        assert_eq!(result.details, "One or both names are empty");
    }

    #[test]
    fn test_fuzzy_is_case_insensitive() {
        let result = fuzzy_match("  RAMESH singh", "ramesh SINGH ");
        assert_eq!(result.score, 100.0);
        assert!(result.matched);
    }
}
