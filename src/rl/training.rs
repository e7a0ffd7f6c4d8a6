// src/rl/training.rs
use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::models::PatientRecord;

/// Floor on the number of sampled negatives per training set.
pub const MIN_NEGATIVE_EXAMPLES: usize = 200;
/// Negatives sampled per positive.
pub const NEGATIVE_RATIO: f64 = 1.5;
/// Random draws allowed per wanted negative before sampling gives up.
const NEGATIVE_DRAWS_PER_EXAMPLE: usize = 50;
const MIN_NEGATIVE_DRAWS: usize = 10_000;

/// A labeled record pair. `label` is 1 for "same person", 0 otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub a: PatientRecord,
    pub b: PatientRecord,
    pub label: u8,
}

/// Reads a JSON array of `{a, b, label}` objects. Entries with an unreadable shape or a
/// label outside {0, 1} are skipped with a warning.
pub fn load_examples(path: &Path) -> Result<Vec<TrainingExample>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read training examples from {}", path.display()))?;
    let entries: Vec<JsonValue> = serde_json::from_str(&raw)
        .with_context(|| format!("Expected a JSON array of examples in {}", path.display()))?;

    let mut examples = Vec::with_capacity(entries.len());
    let mut skipped = 0;
    for (idx, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<TrainingExample>(entry) {
            Ok(example) if example.label <= 1 => examples.push(example),
            Ok(example) => {
                warn!("Example {} has label {}; expected 0 or 1. Skipping.", idx, example.label);
                skipped += 1;
            }
            Err(e) => {
                warn!("Example {} could not be decoded: {}. Skipping.", idx, e);
                skipped += 1;
            }
        }
    }
    info!(
        "Loaded {} training examples from {} ({} skipped)",
        examples.len(),
        path.display(),
        skipped
    );
    Ok(examples)
}

pub fn save_examples(path: &Path, examples: &[TrainingExample]) -> Result<()> {
    let json = serde_json::to_string_pretty(examples).context("Failed to serialize examples")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write training examples to {}", path.display()))
}

/// Person key shared by one person's records across hospitals: the trailing digits of
/// the record id (`HA001` and `HB001` both give `001`).
pub fn person_key(record: &PatientRecord) -> Option<&str> {
    let id = record.patient_id()?;
    let digits_start = id
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    Some(&id[digits_start..])
}

fn cross_hospital(a: &PatientRecord, b: &PatientRecord) -> bool {
    matches!((a.hospital_id(), b.hospital_id()), (Some(x), Some(y)) if x != y)
}

/// Builds a labeled set from a cohort whose record ids encode the person.
///
/// Positives are every cross-hospital pair sharing a person key. Negatives are sampled
/// without replacement from cross-hospital pairs with different keys, up to
/// `max(200, 1.5 × positives)` or as many as exist.
pub fn build_training_examples<R: Rng + ?Sized>(
    records: &[PatientRecord],
    rng: &mut R,
) -> Vec<TrainingExample> {
    let mut groups: BTreeMap<&str, Vec<&PatientRecord>> = BTreeMap::new();
    let mut keyed: Vec<(&str, &PatientRecord)> = Vec::with_capacity(records.len());
    for record in records {
        match (person_key(record), record.hospital_id()) {
            (Some(key), Some(_)) => {
                groups.entry(key).or_default().push(record);
                keyed.push((key, record));
            }
            _ => debug!(
                "Record '{}' has no person key or hospital; excluded from training set",
                record.display_id()
            ),
        }
    }

    let mut examples = Vec::new();
    for members in groups.values() {
        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                if cross_hospital(a, b) {
                    examples.push(TrainingExample {
                        a: (*a).clone(),
                        b: (*b).clone(),
                        label: 1,
                    });
                }
            }
        }
    }
    let positives = examples.len();

    // Cross-hospital pairs with different keys: all cross-hospital pairs minus the positives.
    let mut per_hospital: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, record) in &keyed {
        if let Some(hospital) = record.hospital_id() {
            *per_hospital.entry(hospital).or_default() += 1;
        }
    }
    let n = keyed.len();
    let same_hospital: usize = per_hospital.values().map(|c| c * c).sum();
    let available = (n * n - same_hospital) / 2 - positives;

    let wanted = ((positives as f64 * NEGATIVE_RATIO).ceil() as usize).max(MIN_NEGATIVE_EXAMPLES);
    if wanted > available {
        warn!(
            "Only {} negative pairs available ({} wanted)",
            available, wanted
        );
    }
    let target = wanted.min(available);

    let mut drawn: HashSet<(usize, usize)> = HashSet::with_capacity(target);
    let max_draws = target.saturating_mul(NEGATIVE_DRAWS_PER_EXAMPLE).max(MIN_NEGATIVE_DRAWS);
    let mut draws = 0;
    while drawn.len() < target && draws < max_draws {
        draws += 1;
        let (i, j) = (rng.gen_range(0..n), rng.gen_range(0..n));
        let ((key_a, a), (key_b, b)) = (keyed[i], keyed[j]);
        if key_a == key_b || !cross_hospital(a, b) {
            continue;
        }
        if drawn.insert((i.min(j), i.max(j))) {
            examples.push(TrainingExample {
                a: a.clone(),
                b: b.clone(),
                label: 0,
            });
        }
    }
    if drawn.len() < target {
        warn!(
            "Sampled {} of {} negative pairs after {} draws",
            drawn.len(),
            target,
            draws
        );
    }

    info!(
        "Dataset summary: {} matches, {} non-matches",
        positives,
        examples.len() - positives
    );
    examples
}
