// src/matching/orchestrator.rs
use log::debug;
use serde_json::json;
use std::sync::Arc;

use crate::matching::identity::{aadhaar_exact_match, abha_exact_match, mobile_exact_match};
use crate::matching::phonetic::phonetic_match_indian;
use crate::matching::similarity::fuzzy_match;
use crate::models::{
    ComparatorResult, Confidence, IdKind, MatchMethod, MatchPolicy, MatchVerdict, PatientRecord,
    Recommendation,
};
use crate::rl::feature_cache::{cached_features, shared_cache_stats, SharedFeatureCache};
use crate::rl::feature_extraction::{extract_features, FeatureVector};
use crate::rl::scorer::{AdaptiveScorer, ABHA_SHORTCUT_PROBABILITY};

/// Adaptive policy: scores at or above this are MATCH / high.
pub const HIGH_CONFIDENCE_SCORE: f64 = 80.0;
/// Adaptive policy: scores at or above this (and below high) are REVIEW / medium.
pub const REVIEW_SCORE: f64 = 60.0;
/// Waterfall policy: fuzzy band that goes to manual review.
pub const WATERFALL_REVIEW_SCORE: f64 = 60.0;

/// Raw output of every comparator for one pair, kept for audit.
struct ComparatorResults {
    abha: ComparatorResult,
    aadhaar: ComparatorResult,
    mobile: ComparatorResult,
    phonetic: ComparatorResult,
    fuzzy: ComparatorResult,
}

impl ComparatorResults {
    fn run(a: &PatientRecord, b: &PatientRecord) -> Self {
        Self {
            abha: abha_exact_match(a, b),
            aadhaar: aadhaar_exact_match(a, b),
            mobile: mobile_exact_match(a, b),
            phonetic: phonetic_match_indian(&a.name, &b.name),
            fuzzy: fuzzy_match(&a.name, &b.name),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "abha_result": self.abha,
            "aadhaar_result": self.aadhaar,
            "mobile_result": self.mobile,
            "phonetic_result": self.phonetic,
            "fuzzy_result": self.fuzzy,
        })
    }
}

fn round_score(score: f64) -> f64 {
    (score * 10.0).round() / 10.0
}

/// Maps a fused score to its tier.
pub fn adaptive_tier(score: f64) -> (Confidence, Recommendation) {
    if score >= HIGH_CONFIDENCE_SCORE {
        (Confidence::High, Recommendation::Match)
    } else if score >= REVIEW_SCORE {
        (Confidence::Medium, Recommendation::Review)
    } else {
        (Confidence::None, Recommendation::NoMatch)
    }
}

/// The decision procedure for one record pair.
///
/// Every comparator runs on every call so the verdict always carries the full audit
/// trail; the policy only decides which of them drives the outcome.
pub struct PatientMatcher {
    scorer: Arc<AdaptiveScorer>,
    policy: MatchPolicy,
    feature_cache: Option<SharedFeatureCache>,
}

impl PatientMatcher {
    pub fn new(scorer: Arc<AdaptiveScorer>, policy: MatchPolicy) -> Self {
        Self {
            scorer,
            policy,
            feature_cache: None,
        }
    }

    pub fn with_feature_cache(mut self, cache: SharedFeatureCache) -> Self {
        self.feature_cache = Some(cache);
        self
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn scorer(&self) -> &Arc<AdaptiveScorer> {
        &self.scorer
    }

    /// (hits, misses, entries) when a feature cache is attached.
    pub fn feature_cache_stats(&self) -> Option<(usize, usize, usize)> {
        self.feature_cache.as_ref().map(shared_cache_stats)
    }

    pub fn match_patients(&self, a: &PatientRecord, b: &PatientRecord) -> MatchVerdict {
        if !a.has_name() || !b.has_name() {
            debug!(
                "Matching {} / {} with a missing name",
                a.display_id(),
                b.display_id()
            );
        }
        let results = ComparatorResults::run(a, b);
        match self.policy {
            MatchPolicy::Adaptive => self.adaptive_verdict(a, b, results),
            MatchPolicy::Waterfall => waterfall_verdict(a, b, results),
        }
    }

    fn features_for(&self, a: &PatientRecord, b: &PatientRecord) -> FeatureVector {
        match &self.feature_cache {
            Some(cache) => cached_features(cache, a, b),
            None => extract_features(a, b),
        }
    }

    fn adaptive_verdict(
        &self,
        a: &PatientRecord,
        b: &PatientRecord,
        results: ComparatorResults,
    ) -> MatchVerdict {
        let outcome = self.scorer.score(self.features_for(a, b));
        let mut probability = outcome.probability;
        let mut method = outcome.method;
        let mut matched_fields = outcome.matched_fields.clone();

        // A normalized identifier match outranks everything the fused score says.
        for (result, kind) in [(&results.abha, IdKind::Abha), (&results.aadhaar, IdKind::Aadhaar)] {
            if result.matched {
                probability = probability.max(ABHA_SHORTCUT_PROBABILITY);
                method = kind.method();
                let label = kind.field_label().to_string();
                if !matched_fields.contains(&label) {
                    matched_fields.push(label);
                }
                break;
            }
        }

        let match_score = round_score(probability * 100.0);
        let (confidence, recommendation) = adaptive_tier(match_score);

        let mut details = results.to_json();
        details["ml_result"] = json!({
            "probability": outcome.probability,
            "features": outcome.features,
            "dominant_feature": outcome.dominant_feature,
        });
        details["is_ml_driven"] = json!(true);

        MatchVerdict {
            match_score,
            confidence,
            method,
            recommendation,
            patient_a_id: a.display_id().to_string(),
            patient_b_id: b.display_id().to_string(),
            matched_fields,
            policy: MatchPolicy::Adaptive,
            details,
        }
    }
}

/// First positive comparator wins: health ID, civil ID, phonetic, fuzzy, fuzzy review band.
fn waterfall_verdict(a: &PatientRecord, b: &PatientRecord, results: ComparatorResults) -> MatchVerdict {
    let mut matched_fields = Vec::new();
    let (match_score, confidence, method, recommendation) = if results.abha.matched {
        matched_fields.push(IdKind::Abha.field_label().to_string());
        (results.abha.score, Confidence::High, results.abha.method, Recommendation::Match)
    } else if results.aadhaar.matched {
        matched_fields.push(IdKind::Aadhaar.field_label().to_string());
        (results.aadhaar.score, Confidence::High, results.aadhaar.method, Recommendation::Match)
    } else if results.phonetic.matched {
        matched_fields.push("Name (phonetic)".to_string());
        (
            results.phonetic.score,
            Confidence::High,
            results.phonetic.method,
            Recommendation::Match,
        )
    } else if results.fuzzy.matched {
        matched_fields.push("Name Similarity".to_string());
        (
            round_score(results.fuzzy.score),
            Confidence::Medium,
            results.fuzzy.method,
            Recommendation::Match,
        )
    } else if results.fuzzy.score >= WATERFALL_REVIEW_SCORE {
        (
            round_score(results.fuzzy.score),
            Confidence::Low,
            results.fuzzy.method,
            Recommendation::Review,
        )
    } else {
        (0.0, Confidence::None, MatchMethod::None, Recommendation::NoMatch)
    };
    if results.mobile.matched {
        matched_fields.push(IdKind::Mobile.field_label().to_string());
    }

    MatchVerdict {
        match_score,
        confidence,
        method,
        recommendation,
        patient_a_id: a.display_id().to_string(),
        patient_b_id: b.display_id().to_string(),
        matched_fields,
        policy: MatchPolicy::Waterfall,
        details: results.to_json(),
    }
}
