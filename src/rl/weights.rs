// src/rl/weights.rs
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::rl::feature_extraction::Feature;

/// Weight used for any feature the table has no entry for.
pub const DEFAULT_FEATURE_WEIGHT: f64 = 1.0;

/// Heuristic starting weights. Name-part features fall back to the default weight.
const DEFAULT_WEIGHTS: [(Feature, f64); 8] = [
    (Feature::FuzzyRatio, 0.3),
    (Feature::TokenSortRatio, 0.2),
    (Feature::PhoneticMatch, 1.5),
    (Feature::IndianTypoPattern, 0.5),
    (Feature::AbhaMatch, 5.0),
    (Feature::MobileMatch, 3.0),
    (Feature::GenderMatch, 0.5),
    (Feature::DobMatch, 1.0),
];

/// Feature name -> positive weight. Persisted as a flat JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable(BTreeMap<String, f64>);

impl Default for WeightTable {
    fn default() -> Self {
        let mut weights: BTreeMap<String, f64> = DEFAULT_WEIGHTS
            .iter()
            .map(|(feature, weight)| (feature.as_str().to_string(), *weight))
            .collect();
        for feature in Feature::ALL {
            weights
                .entry(feature.as_str().to_string())
                .or_insert(DEFAULT_FEATURE_WEIGHT);
        }
        Self(weights)
    }
}

impl WeightTable {
    pub fn weight(&self, feature: Feature) -> f64 {
        self.0
            .get(feature.as_str())
            .copied()
            .unwrap_or(DEFAULT_FEATURE_WEIGHT)
    }

    pub fn set_weight(&mut self, feature: Feature, weight: f64) {
        self.0.insert(feature.as_str().to_string(), weight);
    }

    pub fn boost(&mut self, feature: Feature, factor: f64) -> (f64, f64) {
        let old = self.weight(feature);
        let new = old * factor;
        self.set_weight(feature, new);
        (old, new)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Weights normalized to sum to 1.
    pub fn importance(&self) -> BTreeMap<String, f64> {
        let total: f64 = self.0.values().sum();
        if total <= 0.0 {
            return BTreeMap::new();
        }
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v / total))
            .collect()
    }

    /// Drops non-finite or non-positive entries so the table keeps its invariant.
    fn sanitized(self) -> Self {
        let weights = self
            .0
            .into_iter()
            .filter(|(name, weight)| {
                let keep = weight.is_finite() && *weight > 0.0;
                if !keep {
                    warn!("Ignoring invalid weight {} for feature '{}'", weight, name);
                } else if Feature::from_name(name).is_none() {
                    warn!("Persisted weight for unknown feature '{}' kept but unused", name);
                }
                keep
            })
            .collect();
        Self(weights)
    }
}

/// JSON file holding a `WeightTable` snapshot.
#[derive(Debug, Clone)]
pub struct JsonWeightStore {
    path: PathBuf,
}

impl JsonWeightStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no snapshot exists yet.
    pub fn load(&self) -> Result<Option<WeightTable>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read weights from {}", self.path.display()))?;
        let table: WeightTable = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse weights in {}", self.path.display()))?;
        Ok(Some(table.sanitized()))
    }

    pub fn save(&self, table: &WeightTable) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(table).context("Failed to serialize weights")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write weights to {}", self.path.display()))?;
        info!("Saved model weights to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_covers_every_feature() {
        let table = WeightTable::default();
        let total: f64 = Feature::ALL.iter().map(|f| table.weight(*f)).sum();
        assert!((total - 14.0).abs() < 1e-9);
        assert_eq!(table.weight(Feature::AbhaMatch), 5.0);
        assert_eq!(table.weight(Feature::FirstNameMatch), 1.0);
    }

    #[test]
    fn test_missing_entry_defaults_to_one() {
        let table: WeightTable = serde_json::from_str(r#"{"ABHA Match": 7.5}"#).unwrap();
        assert_eq!(table.weight(Feature::AbhaMatch), 7.5);
        assert_eq!(table.weight(Feature::GenderMatch), 1.0);
    }

    #[test]
    fn test_importance_sums_to_one() {
        let importance = WeightTable::default().importance();
        let total: f64 = importance.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!((importance["ABHA Match"] - 5.0 / 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonWeightStore::new(dir.path().join("nested").join("model_weights.json"));
        assert!(store.load().unwrap().is_none());

        let mut table = WeightTable::default();
        table.boost(Feature::PhoneticMatch, 1.5);
        store.save(&table).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.weight(Feature::PhoneticMatch), 2.25);
    }

    #[test]
    fn test_invalid_weights_are_dropped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");
        fs::write(&path, r#"{"ABHA Match": -1.0, "DOB Match": 2.0}"#).unwrap();
        let loaded = JsonWeightStore::new(&path).load().unwrap().unwrap();
        assert_eq!(loaded.weight(Feature::AbhaMatch), DEFAULT_FEATURE_WEIGHT);
        assert_eq!(loaded.weight(Feature::DobMatch), 2.0);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");
        fs::write(&path, "not json").unwrap();
        assert!(JsonWeightStore::new(&path).load().is_err());
    }
}
