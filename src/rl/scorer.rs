// src/rl/scorer.rs
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{MatchMethod, PatientRecord};
use crate::rl::feature_extraction::{extract_features, Feature, FeatureVector};
use crate::rl::training::TrainingExample;
use crate::rl::weights::{JsonWeightStore, WeightTable};

// Identity shortcuts
pub const ABHA_SHORTCUT_PROBABILITY: f64 = 0.999;
pub const MOBILE_SHORTCUT_FLOOR: f64 = 0.95;
pub const MOBILE_SHORTCUT_MIN_FUZZY: f64 = 0.4;

// Pattern boost
pub const TYPO_PATTERN_FLOOR: f64 = 0.92;

// Demographic penalties, applied in this order
pub const GENDER_MISMATCH_PENALTY: f64 = 0.15;
pub const DOB_MISMATCH_PENALTY: f64 = 0.6;
pub const FIRST_NAME_MIN_SIMILARITY: f64 = 0.6;
pub const FIRST_NAME_MISMATCH_PENALTY: f64 = 0.3;
pub const LAST_NAME_MIN_SIMILARITY: f64 = 0.6;
pub const LAST_NAME_MISMATCH_PENALTY: f64 = 0.2;

/// Ceiling for pairs with neither health-ID nor birth-date corroboration.
pub const UNCORROBORATED_CAP: f64 = 0.50;

/// Feature value at which a field shows up in the matched-field checklist.
pub const MATCHED_FIELD_THRESHOLD: f64 = 0.8;

// Training
pub const TRAINING_STRONG_SIGNAL: f64 = 0.8;
pub const TRAINING_MIN_FREQUENCY: f64 = 0.8;
pub const TRAINING_BOOST: f64 = 1.5;

const CHECKLIST: [(Feature, &str); 5] = [
    (Feature::AbhaMatch, "ABHA Number"),
    (Feature::DobMatch, "Date of Birth"),
    (Feature::MobileMatch, "Phone Number"),
    (Feature::PhoneticMatch, "Name (phonetic)"),
    (Feature::FuzzyRatio, "Name Similarity"),
];

/// Result of scoring one pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreOutcome {
    pub probability: f64,
    pub features: FeatureVector,
    pub dominant_feature: Option<Feature>,
    #[serde(skip)]
    pub method: MatchMethod,
    #[serde(skip)]
    pub matched_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub examples: usize,
    pub positives: usize,
    /// (feature, old weight, new weight) for every boosted feature.
    pub boosted: Vec<(Feature, f64, f64)>,
}

/// `Σ value × weight / Σ weight` over the features present.
pub fn weighted_probability(features: &FeatureVector, weights: &WeightTable) -> f64 {
    let mut score = 0.0;
    let mut max_possible = 0.0;
    for (feature, value) in features.iter() {
        let weight = weights.weight(feature);
        score += value * weight;
        max_possible += weight;
    }
    if max_possible > 0.0 {
        score / max_possible
    } else {
        0.0
    }
}

pub fn apply_identity_shortcuts(prob: f64, features: &FeatureVector) -> f64 {
    if features.get(Feature::AbhaMatch) == 1.0 {
        ABHA_SHORTCUT_PROBABILITY
    } else if features.get(Feature::MobileMatch) == 1.0
        && features.get(Feature::FuzzyRatio) > MOBILE_SHORTCUT_MIN_FUZZY
    {
        prob.max(MOBILE_SHORTCUT_FLOOR)
    } else {
        prob
    }
}

pub fn apply_pattern_boost(prob: f64, features: &FeatureVector) -> f64 {
    if features.get(Feature::IndianTypoPattern) == 1.0 {
        prob.max(TYPO_PATTERN_FLOOR)
    } else {
        prob
    }
}

/// A health-ID match exempts the pair from every penalty.
pub fn apply_demographic_penalties(mut prob: f64, features: &FeatureVector) -> f64 {
    if features.get(Feature::AbhaMatch) != 0.0 {
        return prob;
    }
    if features.get(Feature::GenderMatch) == 0.0 {
        prob *= GENDER_MISMATCH_PENALTY;
    }
    if features.get(Feature::DobMatch) == 0.0 {
        prob *= DOB_MISMATCH_PENALTY;
    }
    if features.get(Feature::FirstNameMatch) < FIRST_NAME_MIN_SIMILARITY {
        prob *= FIRST_NAME_MISMATCH_PENALTY;
    }
    if features.get(Feature::LastNameMatch) < LAST_NAME_MIN_SIMILARITY {
        prob *= LAST_NAME_MISMATCH_PENALTY;
    }
    prob
}

pub fn apply_identity_cap(prob: f64, features: &FeatureVector) -> f64 {
    if features.get(Feature::AbhaMatch) == 0.0 && features.get(Feature::DobMatch) == 0.0 {
        prob.min(UNCORROBORATED_CAP)
    } else {
        prob
    }
}

/// First strictly largest positive contribution, in canonical feature order.
pub fn dominant_feature(features: &FeatureVector, weights: &WeightTable) -> Option<Feature> {
    let mut best: Option<(Feature, f64)> = None;
    for feature in Feature::ALL {
        let value = features.get(feature);
        if value <= 0.0 {
            continue;
        }
        let contribution = value * weights.weight(feature);
        if contribution > 0.0 && best.map_or(true, |(_, top)| contribution > top) {
            best = Some((feature, contribution));
        }
    }
    best.map(|(feature, _)| feature)
}

pub fn method_for(feature: Option<Feature>) -> MatchMethod {
    match feature {
        Some(Feature::AbhaMatch) => MatchMethod::AbhaExact,
        Some(Feature::PhoneticMatch) | Some(Feature::IndianTypoPattern) => MatchMethod::PhoneticIndian,
        Some(Feature::MobileMatch) => MatchMethod::MobileMatch,
        _ => MatchMethod::Fuzzy,
    }
}

pub fn matched_fields(features: &FeatureVector) -> Vec<String> {
    CHECKLIST
        .iter()
        .filter(|(feature, _)| features.get(*feature) >= MATCHED_FIELD_THRESHOLD)
        .map(|(_, label)| label.to_string())
        .collect()
}

/// Runs the full scoring cascade against a fixed weight table.
pub fn score_with(features: FeatureVector, weights: &WeightTable) -> ScoreOutcome {
    let raw = weighted_probability(&features, weights);
    let mut prob = apply_identity_shortcuts(raw, &features);
    prob = apply_pattern_boost(prob, &features);
    prob = apply_demographic_penalties(prob, &features);
    prob = apply_identity_cap(prob, &features);
    let probability = prob.clamp(0.0, 1.0);

    let dominant = dominant_feature(&features, weights);
    debug!(
        "Scored pair: raw {:.4} -> final {:.4} (dominant: {:?})",
        raw, probability, dominant
    );
    ScoreOutcome {
        probability,
        method: method_for(dominant),
        matched_fields: matched_fields(&features),
        dominant_feature: dominant,
        features,
    }
}

/// Owns the process-wide weight table. Scoring takes a read lock for one call;
/// training, reload and save are serialized through the same lock.
#[derive(Debug)]
pub struct AdaptiveScorer {
    weights: RwLock<WeightTable>,
    store: Option<JsonWeightStore>,
}

impl Default for AdaptiveScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveScorer {
    /// Built-in defaults, no persistence.
    pub fn new() -> Self {
        Self::with_weights(WeightTable::default())
    }

    pub fn with_weights(weights: WeightTable) -> Self {
        Self {
            weights: RwLock::new(weights),
            store: None,
        }
    }

    /// Load-or-default. A missing or unreadable snapshot never fails construction.
    pub fn load(store: JsonWeightStore) -> Self {
        let weights = match store.load() {
            Ok(Some(table)) => {
                info!("Loaded model weights from {}", store.path().display());
                table
            }
            Ok(None) => {
                info!(
                    "No model weights at {}. Using defaults.",
                    store.path().display()
                );
                WeightTable::default()
            }
            Err(e) => {
                warn!("Failed to load model weights: {:#}. Using defaults.", e);
                WeightTable::default()
            }
        };
        Self {
            weights: RwLock::new(weights),
            store: Some(store),
        }
    }

    fn read_weights(&self) -> RwLockReadGuard<'_, WeightTable> {
        self.weights.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_weights(&self) -> RwLockWriteGuard<'_, WeightTable> {
        self.weights.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn weights_snapshot(&self) -> WeightTable {
        self.read_weights().clone()
    }

    pub fn score(&self, features: FeatureVector) -> ScoreOutcome {
        let weights = self.read_weights();
        score_with(features, &weights)
    }

    pub fn score_pair(&self, a: &PatientRecord, b: &PatientRecord) -> ScoreOutcome {
        self.score(extract_features(a, b))
    }

    /// Writes the current table to the configured store.
    pub fn save(&self) -> Result<()> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No weight store configured for this scorer"))?;
        let weights = self.read_weights();
        store.save(&weights).context("Failed to save model weights")
    }

    /// Saves, logging a failure instead of returning it. Returns whether the write landed.
    pub fn save_or_warn(&self) -> bool {
        match self.save() {
            Ok(()) => true,
            Err(e) => {
                warn!("Weights were adapted but could not be saved: {:#}", e);
                false
            }
        }
    }

    /// Replaces the table with the persisted snapshot, if one exists.
    pub fn reload(&self) -> Result<bool> {
        let Some(store) = self.store.as_ref() else {
            return Ok(false);
        };
        let mut weights = self.write_weights();
        match store.load()? {
            Some(table) => {
                *weights = table;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// One-shot boost: every feature that is strong in more than 80% of positive
    /// examples has its weight multiplied by 1.5. Repeated calls compound.
    pub fn train(&self, examples: &[TrainingExample]) -> TrainingReport {
        let positives: Vec<FeatureVector> = examples
            .iter()
            .filter(|example| example.label == 1)
            .map(|example| extract_features(&example.a, &example.b))
            .collect();

        let mut report = TrainingReport {
            examples: examples.len(),
            positives: positives.len(),
            boosted: Vec::new(),
        };
        info!(
            "Analyzing {} examples ({} positive) to adjust weights",
            report.examples, report.positives
        );
        if positives.is_empty() {
            warn!("No positive examples supplied; weights unchanged");
            return report;
        }

        let mut weights = self.write_weights();
        for feature in Feature::ALL {
            let strong = positives
                .iter()
                .filter(|features| features.get(feature) > TRAINING_STRONG_SIGNAL)
                .count();
            let frequency = strong as f64 / positives.len() as f64;
            if frequency > TRAINING_MIN_FREQUENCY {
                let (old, new) = weights.boost(feature, TRAINING_BOOST);
                debug!(
                    "Boosting '{}' ({:.0}% of matches): {:.3} -> {:.3}",
                    feature.as_str(),
                    frequency * 100.0,
                    old,
                    new
                );
                report.boosted.push((feature, old, new));
            }
        }
        info!(
            "Training complete: {} feature weight(s) boosted",
            report.boosted.len()
        );
        report
    }

    pub fn get_stats_display(&self) -> String {
        let weights = self.read_weights();
        let importance = weights.importance();
        let mut output = String::from("Adaptive Scorer Weights:\n");
        output.push_str("  Feature              | Weight  | Importance\n");
        output.push_str("  ---------------------|---------|-----------\n");
        for feature in Feature::ALL {
            let name = feature.as_str();
            output.push_str(&format!(
                "  {:<20} | {:>7.3} | {:>8.1}%\n",
                name,
                weights.weight(feature),
                importance.get(name).copied().unwrap_or(0.0) * 100.0
            ));
        }
        output
    }
}
