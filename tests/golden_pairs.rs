// tests/golden_pairs.rs
//
// End-to-end checks of the matcher on hand-built cross-hospital pairs.
use linkage_lib::matching::phonetic::canonicalize_indian_name;
use linkage_lib::matching::similarity::fuzzy_match;
use linkage_lib::matching::PatientMatcher;
use linkage_lib::models::{Confidence, MatchMethod, MatchPolicy, PatientRecord, Recommendation};
use linkage_lib::rl::{create_shared_cache, AdaptiveScorer};
use std::sync::Arc;

fn adaptive() -> PatientMatcher {
    PatientMatcher::new(Arc::new(AdaptiveScorer::new()), MatchPolicy::Adaptive)
}

fn waterfall() -> PatientMatcher {
    PatientMatcher::new(Arc::new(AdaptiveScorer::new()), MatchPolicy::Waterfall)
}

fn golden_pairs() -> Vec<(PatientRecord, PatientRecord)> {
    vec![
        (
            PatientRecord::new("Ramesh Singh")
                .with_id("HA001", "hospital_a")
                .with_abha("12-3456-7890-1234")
                .with_gender("M"),
            PatientRecord::new("Ramehs Singh")
                .with_id("HB001", "hospital_b")
                .with_abha("12-3456-7890-1234")
                .with_gender("M"),
        ),
        (
            PatientRecord::new("Vijay Kumar")
                .with_id("HA002", "hospital_a")
                .with_dob("1985-04-12")
                .with_mobile("9876543210")
                .with_gender("M"),
            PatientRecord::new("Wijay Kumar")
                .with_id("HB002", "hospital_b")
                .with_dob("1985-04-12")
                .with_mobile("+91-9876543210")
                .with_gender("M"),
        ),
        (
            PatientRecord::new("Anita Desai")
                .with_id("HA003", "hospital_a")
                .with_dob("1990-01-01")
                .with_abha("11-1111-1111-1111")
                .with_gender("F"),
            PatientRecord::new("Anita Sharma")
                .with_id("HB003", "hospital_b")
                .with_dob("1975-06-30")
                .with_abha("22-2222-2222-2222")
                .with_gender("M"),
        ),
        (
            PatientRecord::new("Rohit Singh")
                .with_id("HA004", "hospital_a")
                .with_mobile("9000000001")
                .with_gender("M"),
            PatientRecord::new("Ramehs Singh")
                .with_id("HB004", "hospital_b")
                .with_mobile("9000000002")
                .with_gender("M"),
        ),
    ]
}

#[test]
fn shared_health_id_overrides_name_typo() {
    let (a, b) = &golden_pairs()[0];
    let verdict = adaptive().match_patients(a, b);
    assert!(verdict.match_score >= 99.0, "score {}", verdict.match_score);
    assert_eq!(verdict.method, MatchMethod::AbhaExact);
    assert!(verdict.is_match());
    assert_eq!(verdict.patient_a_id, "HA001");
    assert_eq!(verdict.patient_b_id, "HB001");
}

#[test]
fn phonetic_variant_with_corroboration_matches() {
    let (a, b) = &golden_pairs()[1];
    let verdict = adaptive().match_patients(a, b);
    assert!(verdict.match_score >= 85.0, "score {}", verdict.match_score);
    assert_eq!(verdict.recommendation, Recommendation::Match);
    assert!(verdict.matched_fields.contains(&"Date of Birth".to_string()));
    assert!(verdict.matched_fields.contains(&"Phone Number".to_string()));
}

#[test]
fn demographic_contradiction_beats_name_similarity() {
    let (a, b) = &golden_pairs()[2];
    let verdict = adaptive().match_patients(a, b);
    assert!(verdict.match_score < 50.0, "score {}", verdict.match_score);
    assert_eq!(verdict.recommendation, Recommendation::NoMatch);
    assert!(!verdict.is_match());
}

#[test]
fn disjoint_identity_is_not_a_match() {
    let (a, b) = &golden_pairs()[3];
    let verdict = adaptive().match_patients(a, b);
    assert!(verdict.match_score < 60.0, "score {}", verdict.match_score);
    assert_ne!(verdict.recommendation, Recommendation::Match);
}

#[test]
fn verdicts_are_commutative() {
    for matcher in [adaptive(), waterfall()] {
        for (a, b) in golden_pairs() {
            let forward = matcher.match_patients(&a, &b);
            let backward = matcher.match_patients(&b, &a);
            assert_eq!(forward.match_score.to_bits(), backward.match_score.to_bits());
            assert_eq!(forward.recommendation, backward.recommendation);
            assert_eq!(forward.confidence, backward.confidence);
        }
    }
}

#[test]
fn repeated_matching_is_bit_identical() {
    let matcher = adaptive().with_feature_cache(create_shared_cache(64));
    for (a, b) in golden_pairs() {
        let first = matcher.match_patients(&a, &b);
        let second = matcher.match_patients(&a, &b);
        assert_eq!(first, second);
    }
    let (hits, misses, entries) = matcher.feature_cache_stats().unwrap();
    assert_eq!((hits, misses, entries), (4, 4, 4));
}

#[test]
fn equal_health_id_always_matches_with_high_confidence() {
    let a = PatientRecord::new("Kavita Iyer")
        .with_dob("1960-02-02")
        .with_gender("F")
        .with_abha("98-7654-3210-9876");
    let b = PatientRecord::new("Mohan Das")
        .with_dob("2001-11-11")
        .with_gender("M")
        .with_abha("98-7654-3210-9876");
    for matcher in [adaptive(), waterfall()] {
        let verdict = matcher.match_patients(&a, &b);
        assert_eq!(verdict.recommendation, Recommendation::Match);
        assert_eq!(verdict.confidence, Confidence::High);
    }
}

#[test]
fn canonicalization_fixed_points() {
    assert_eq!(canonicalize_indian_name("Vijay"), canonicalize_indian_name("Wijay"));
    assert_eq!(canonicalize_indian_name("Ram"), canonicalize_indian_name("Raam"));
    assert_eq!(canonicalize_indian_name("Suresh"), canonicalize_indian_name("Shuresh"));
    assert_ne!(canonicalize_indian_name("Ramesh"), canonicalize_indian_name("Priya"));
}

#[test]
fn fuzzy_threshold_boundaries() {
    let same = fuzzy_match("X", "X");
    assert_eq!(same.score, 100.0);
    assert!(same.matched);
    let empty = fuzzy_match("", "Y");
    assert_eq!(empty.score, 0.0);
    assert!(!empty.matched);
}
