// src/matching/phonetic.rs
//
// Collapses transliteration variance in Latin renderings of Indian names, with a
// Metaphone-style consonant code as a second pass.
use log::debug;

use crate::models::{ComparatorResult, MatchMethod};

/// Binary score for a phonetic match. Never partial, never 100.
pub const PHONETIC_MATCH_SCORE: f64 = 90.0;

/// Length of the pronunciation code.
pub const PHONETIC_CODE_LEN: usize = 4;

const VOWEL_LENGTHENING: [(&str, &str); 4] = [("aa", "a"), ("ee", "i"), ("oo", "u"), ("ii", "i")];

/// Canonical spelling of a name. Steps run in a fixed order, each on the previous output:
/// whitespace collapse, `v`->`w`, `sh`->`s`, long vowels, doubled letters.
pub fn canonicalize_indian_name(name: &str) -> String {
    let mut canonical = name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    canonical = canonical.replace('v', "w");
    canonical = canonical.replace("sh", "s");
    for (long, short) in &VOWEL_LENGTHENING {
        canonical = canonical.replace(long, short);
    }

    let mut collapsed = String::with_capacity(canonical.len());
    let mut last: Option<char> = None;
    for c in canonical.chars() {
        if c.is_alphabetic() && last == Some(c) {
            continue;
        }
        collapsed.push(c);
        last = Some(c);
    }
    collapsed
}

fn is_vowel(c: Option<char>) -> bool {
    matches!(c, Some('a' | 'e' | 'i' | 'o' | 'u'))
}

fn is_front_vowel(c: Option<char>) -> bool {
    matches!(c, Some('e' | 'i' | 'y'))
}

fn encode_word(word: &[char], out: &mut String) {
    let n = word.len();
    if n == 0 {
        return;
    }
    let at = |i: usize| word.get(i).copied();

    let mut i = 0;
    match (word[0], at(1)) {
        ('a', Some('e')) | ('g', Some('n')) | ('k', Some('n')) | ('p', Some('n')) | ('w', Some('r')) => {
            i = 1
        }
        ('x', _) => {
            out.push('S');
            i = 1;
        }
        ('w', Some('h')) => {
            out.push('W');
            i = 2;
        }
        _ => {}
    }
    let start = i;

    while i < n {
        let c = word[i];
        let prev = if i > 0 { at(i - 1) } else { None };
        let next = at(i + 1);
        let next2 = at(i + 2);

        if prev == Some(c) && c != 'c' {
            i += 1;
            continue;
        }

        match c {
            'a' | 'e' | 'i' | 'o' | 'u' => {
                if i == start {
                    out.push(c.to_ascii_uppercase());
                }
            }
            'b' => {
                if !(i + 1 == n && prev == Some('m')) {
                    out.push('B');
                }
            }
            'c' => {
                if next == Some('i') && next2 == Some('a') {
                    out.push('X');
                } else if next == Some('h') {
                    out.push('X');
                } else if is_front_vowel(next) {
                    out.push('S');
                } else {
                    out.push('K');
                }
            }
            'd' => {
                if next == Some('g') && is_front_vowel(next2) {
                    out.push('J');
                    i += 1;
                } else {
                    out.push('T');
                }
            }
            'g' => {
                if next == Some('h') && !is_vowel(next2) {
                    // silent
                } else if is_front_vowel(next) {
                    out.push('J');
                } else {
                    out.push('K');
                }
            }
            'h' => {
                if is_vowel(next) && !matches!(prev, Some('c' | 'g' | 'p' | 's' | 't')) {
                    out.push('H');
                }
            }
            'k' => {
                if prev != Some('c') {
                    out.push('K');
                }
            }
            'p' => out.push(if next == Some('h') { 'F' } else { 'P' }),
            'q' => out.push('K'),
            's' => {
                if next == Some('h') || (next == Some('i') && matches!(next2, Some('o' | 'a'))) {
                    out.push('X');
                } else {
                    out.push('S');
                }
            }
            't' => {
                if next == Some('i') && matches!(next2, Some('a' | 'o')) {
                    out.push('X');
                } else if next == Some('h') {
                    out.push('0');
                } else if !(next == Some('c') && next2 == Some('h')) {
                    out.push('T');
                }
            }
            'v' => out.push('F'),
            'w' | 'y' => {
                if is_vowel(next) {
                    out.push(c.to_ascii_uppercase());
                }
            }
            'x' => out.push_str("KS"),
            'z' => out.push('S'),
            other => out.push(other.to_ascii_uppercase()),
        }
        i += 1;
    }
}

/// Four-letter consonant-skeleton code of a single word.
pub fn metaphone_code(word: &str) -> String {
    let letters: Vec<char> = word
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect();
    let mut code = String::new();
    encode_word(&letters, &mut code);
    code.chars().take(PHONETIC_CODE_LEN).collect()
}

/// One code per word, so a surname can never fall outside the compared prefix.
pub fn name_codes(name: &str) -> Vec<String> {
    name.split_whitespace().map(metaphone_code).collect()
}

/// Binary phonetic comparison: canonical forms equal, or their codes equal.
pub fn phonetic_match_indian(name_a: &str, name_b: &str) -> ComparatorResult {
    if name_a.trim().is_empty() || name_b.trim().is_empty() {
        return ComparatorResult::no_match(
            MatchMethod::PhoneticIndian,
            "One or both names are empty",
        );
    }

    let canonical_a = canonicalize_indian_name(name_a);
    let canonical_b = canonicalize_indian_name(name_b);
    if canonical_a == canonical_b {
        return ComparatorResult {
            score: PHONETIC_MATCH_SCORE,
            matched: true,
            method: MatchMethod::PhoneticIndian,
            details: format!("Canonical forms match: '{}'", canonical_a),
        };
    }

    let codes_a = name_codes(&canonical_a);
    let codes_b = name_codes(&canonical_b);
    let code_a = codes_a.join(" ");
    let code_b = codes_b.join(" ");
    debug!(
        "Phonetic fallback: '{}' -> {}, '{}' -> {}",
        canonical_a, code_a, canonical_b, code_b
    );
    if codes_a.iter().all(|c| !c.is_empty()) && codes_a == codes_b {
        ComparatorResult {
            score: PHONETIC_MATCH_SCORE,
            matched: true,
            method: MatchMethod::PhoneticIndian,
            details: format!(
                "Pronunciation codes match: '{}' / '{}' -> {}",
                canonical_a, canonical_b, code_a
            ),
        }
    } else {
        ComparatorResult::no_match(
            MatchMethod::PhoneticIndian,
            format!(
                "No phonetic match: '{}' ({}) vs '{}' ({})",
                canonical_a, code_a, canonical_b, code_b
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_fixed_points() {
        assert_eq!(canonicalize_indian_name("Vijay"), canonicalize_indian_name("Wijay"));
        assert_eq!(canonicalize_indian_name("Ram"), canonicalize_indian_name("Raam"));
        assert_eq!(canonicalize_indian_name("Suresh"), canonicalize_indian_name("Shuresh"));
        assert_ne!(canonicalize_indian_name("Ramesh"), canonicalize_indian_name("Priya"));
    }

    #[test]
    fn test_canonicalization_steps() {
        assert_eq!(canonicalize_indian_name("  Deepak   KUMAR "), "dipak kumar");
        assert_eq!(canonicalize_indian_name("Pooja"), "puja");
        assert_eq!(canonicalize_indian_name("Anna"), "ana");
        assert_eq!(canonicalize_indian_name("Vishal"), "wisal");
    }

    #[test]
    fn test_metaphone_codes() {
        assert_eq!(metaphone_code("amit"), "AMT");
        assert_eq!(metaphone_code("sumit"), "SMT");
        assert_eq!(metaphone_code("rames"), metaphone_code("ramehs"));
        assert_eq!(metaphone_code("phil"), "FL");
        assert_eq!(metaphone_code("knight"), "NT");
        assert_eq!(metaphone_code(""), "");
    }

    #[test]
    fn test_name_codes_are_per_word() {
        assert_eq!(name_codes("amit kumar"), vec!["AMT", "KMR"]);
        assert_eq!(name_codes("rames sarma"), vec!["RMS", "SRM"]);
        assert_ne!(name_codes("rames singh"), name_codes("rames sarma"));
        assert!(name_codes("").is_empty());
    }

    #[test]
    fn test_shared_first_name_different_surname() {
        for (a, b) in [
            ("Ramesh Singh", "Ramesh Sharma"),
            ("Suresh Patel", "Suresh Pillai"),
            ("Mahesh Gupta", "Mahesh Goyal"),
        ] {
            let result = phonetic_match_indian(a, b);
            assert!(!result.matched, "{} / {}: {}", a, b, result.details);
            assert_eq!(result.score, 0.0);
        }
        let result = phonetic_match_indian("Amit Kumar", "Sumit Kumar");
        assert!(!result.matched);
    }

    #[test]
    fn test_dropped_vowel_matches_through_codes() {
        assert_ne!(canonicalize_indian_name("Priya Sharma"), canonicalize_indian_name("Prya Sharma"));
        let result = phonetic_match_indian("Priya Sharma", "Prya Sharma");
        assert!(result.matched);
        assert_eq!(result.score, 90.0);
        assert!(result.details.starts_with("Pronunciation codes match"));
    }

    #[test]
    fn test_long_vowel_and_doubled_letter_variants() {
        assert_eq!(canonicalize_indian_name("Sunita"), canonicalize_indian_name("Suneeta"));
        let result = phonetic_match_indian("Sunita", "Suneeta");
        assert!(result.matched);
        assert_eq!(result.score, 90.0);

        assert_eq!(canonicalize_indian_name("Amit Kumarr"), "amit kumar");
        let result = phonetic_match_indian("Amit Kumar", "Amit Kumarr");
        assert!(result.matched);
        assert_eq!(result.score, 90.0);
    }

    #[test]
    fn test_phonetic_match_is_binary() {
        let result = phonetic_match_indian("Vijay Kumar", "Wijay Kumar");
        assert!(result.matched);
        assert_eq!(result.score, 90.0);
        assert_eq!(result.method, MatchMethod::PhoneticIndian);

        let result = phonetic_match_indian("Ramesh Singh", "Ramehs Singh");
        assert!(result.matched);
        assert_eq!(result.score, 90.0);

        let result = phonetic_match_indian("Ramesh", "Priya");
        assert!(!result.matched);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_empty_name_is_not_a_match() {
        let result = phonetic_match_indian("", "Ramesh");
        assert!(!result.matched);
        assert_eq!(result.score, 0.0);
        let result = phonetic_match_indian("Ramesh", "   ");
        assert!(!result.matched);
    }
}
