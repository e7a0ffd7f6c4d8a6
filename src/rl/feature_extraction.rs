// src/rl/feature_extraction.rs
use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::matching::phonetic::phonetic_match_indian;
use crate::matching::similarity::{character_ratio, token_sort_ratio};
use crate::models::PatientRecord;

/// Fuzzy ratio below which a phonetic match counts as a typo pattern.
pub const TYPO_PATTERN_MAX_FUZZY: f64 = 0.95;
/// Health IDs of this length or shorter are ignored by the feature extractor.
pub const ABHA_MIN_LENGTH: usize = 5;
pub const MOBILE_SUFFIX_LEN: usize = 10;
pub const UNKNOWN_GENDER: &str = "U";

/// Closed set of pair features. Declaration order is the canonical iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Feature {
    #[serde(rename = "Fuzzy Ratio")]
    FuzzyRatio,
    #[serde(rename = "Token Sort Ratio")]
    TokenSortRatio,
    #[serde(rename = "Phonetic Match")]
    PhoneticMatch,
    #[serde(rename = "Indian Typo Pattern")]
    IndianTypoPattern,
    #[serde(rename = "First Name Match")]
    FirstNameMatch,
    #[serde(rename = "Last Name Match")]
    LastNameMatch,
    #[serde(rename = "ABHA Match")]
    AbhaMatch,
    #[serde(rename = "Mobile Match")]
    MobileMatch,
    #[serde(rename = "Gender Match")]
    GenderMatch,
    #[serde(rename = "DOB Match")]
    DobMatch,
}

impl Feature {
    pub const ALL: [Feature; 10] = [
        Feature::FuzzyRatio,
        Feature::TokenSortRatio,
        Feature::PhoneticMatch,
        Feature::IndianTypoPattern,
        Feature::FirstNameMatch,
        Feature::LastNameMatch,
        Feature::AbhaMatch,
        Feature::MobileMatch,
        Feature::GenderMatch,
        Feature::DobMatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::FuzzyRatio => "Fuzzy Ratio",
            Feature::TokenSortRatio => "Token Sort Ratio",
            Feature::PhoneticMatch => "Phonetic Match",
            Feature::IndianTypoPattern => "Indian Typo Pattern",
            Feature::FirstNameMatch => "First Name Match",
            Feature::LastNameMatch => "Last Name Match",
            Feature::AbhaMatch => "ABHA Match",
            Feature::MobileMatch => "Mobile Match",
            Feature::GenderMatch => "Gender Match",
            Feature::DobMatch => "DOB Match",
        }
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        Feature::ALL.iter().copied().find(|f| f.as_str() == name)
    }
}

/// Normalized [0, 1] signals for one record pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(BTreeMap<Feature, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
        self.0.insert(feature, value);
    }

    /// Missing features read as 0.0.
    pub fn get(&self, feature: Feature) -> f64 {
        self.0.get(&feature).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        self.0.iter().map(|(f, v)| (*f, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Birth year from an ISO date, falling back to the leading `-` segment.
/// Unparsable input yields `None`.
pub fn birth_year(dob: &str) -> Option<i32> {
    let dob = dob.trim();
    if let Ok(date) = NaiveDate::parse_from_str(dob, "%Y-%m-%d") {
        return Some(date.year());
    }
    dob.split('-').next()?.trim().parse::<i32>().ok()
}

fn dob_score(a: Option<&str>, b: Option<&str>) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };
    match (birth_year(a), birth_year(b)) {
        (Some(year_a), Some(year_b)) if year_a == year_b => 1.0,
        (Some(year_a), Some(year_b)) if (year_a - year_b).abs() == 1 => 0.5,
        (Some(_), Some(_)) => 0.0,
        _ => {
            debug!("Unparsable date of birth in pair ('{}', '{}')", a, b);
            0.0
        }
    }
}

fn last_chars(s: &str, n: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    chars[chars.len().saturating_sub(n)..].iter().collect()
}

fn gender_code(gender: Option<&str>) -> String {
    gender.unwrap_or(UNKNOWN_GENDER).to_uppercase()
}

/// Builds the full feature vector for a pair. Total: absent or malformed fields score 0.
pub fn extract_features(a: &PatientRecord, b: &PatientRecord) -> FeatureVector {
    let mut features = FeatureVector::new();

    let name_a = a.name.trim().to_lowercase();
    let name_b = b.name.trim().to_lowercase();

    let fuzzy = character_ratio(&name_a, &name_b) / 100.0;
    features.set(Feature::FuzzyRatio, fuzzy);
    features.set(Feature::TokenSortRatio, token_sort_ratio(&name_a, &name_b) / 100.0);

    let phonetic = if phonetic_match_indian(&name_a, &name_b).matched { 1.0 } else { 0.0 };
    features.set(Feature::PhoneticMatch, phonetic);
    let typo_pattern = if fuzzy < TYPO_PATTERN_MAX_FUZZY && phonetic == 1.0 { 1.0 } else { 0.0 };
    features.set(Feature::IndianTypoPattern, typo_pattern);

    let tokens_a: Vec<&str> = name_a.split_whitespace().collect();
    let tokens_b: Vec<&str> = name_b.split_whitespace().collect();
    let first_a = tokens_a.first().copied().unwrap_or("");
    let first_b = tokens_b.first().copied().unwrap_or("");
    features.set(Feature::FirstNameMatch, character_ratio(first_a, first_b) / 100.0);

    let last_name = if tokens_a.len() > 1 && tokens_b.len() > 1 {
        character_ratio(tokens_a[tokens_a.len() - 1], tokens_b[tokens_b.len() - 1]) / 100.0
    } else {
        0.0
    };
    features.set(Feature::LastNameMatch, last_name);

    let abha = match (a.abha_number(), b.abha_number()) {
        (Some(x), Some(y)) if x.len() > ABHA_MIN_LENGTH && y.len() > ABHA_MIN_LENGTH && x == y => 1.0,
        _ => 0.0,
    };
    features.set(Feature::AbhaMatch, abha);

    let mobile = match (a.mobile(), b.mobile()) {
        (Some(x), Some(y)) if last_chars(x, MOBILE_SUFFIX_LEN) == last_chars(y, MOBILE_SUFFIX_LEN) => 1.0,
        _ => 0.0,
    };
    features.set(Feature::MobileMatch, mobile);

    let gender = if gender_code(a.gender()) == gender_code(b.gender()) { 1.0 } else { 0.0 };
    features.set(Feature::GenderMatch, gender);

    features.set(Feature::DobMatch, dob_score(a.dob(), b.dob()));

    features
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vijay_pair() -> (PatientRecord, PatientRecord) {
        let a = PatientRecord::new("Vijay Kumar")
            .with_dob("1985-04-12")
            .with_mobile("9876543210")
            .with_gender("M");
        let b = PatientRecord::new("Wijay Kumar")
            .with_dob("1985-04-12")
            .with_mobile("+919876543210")
            .with_gender("m");
        (a, b)
    }

    #[test]
    fn test_full_feature_set_is_extracted() {
        let (a, b) = vijay_pair();
        let features = extract_features(&a, &b);
        assert_eq!(features.len(), Feature::ALL.len());
        assert_eq!(features.get(Feature::PhoneticMatch), 1.0);
        assert_eq!(features.get(Feature::IndianTypoPattern), 1.0);
        assert_eq!(features.get(Feature::MobileMatch), 1.0);
        assert_eq!(features.get(Feature::GenderMatch), 1.0);
        assert_eq!(features.get(Feature::DobMatch), 1.0);
        assert_eq!(features.get(Feature::LastNameMatch), 1.0);
        assert_eq!(features.get(Feature::AbhaMatch), 0.0);
        for (_, value) in features.iter() {
            assert!((0.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn test_extraction_is_symmetric() {
        let (a, b) = vijay_pair();
        let c = PatientRecord::new("Rohit").with_dob("1986-01-01");
        assert_eq!(extract_features(&a, &b), extract_features(&b, &a));
        assert_eq!(extract_features(&a, &c), extract_features(&c, &a));
    }

    #[test]
    fn test_single_token_name_has_no_last_name_score() {
        let a = PatientRecord::new("Priya");
        let b = PatientRecord::new("Priya Sharma");
        let features = extract_features(&a, &b);
        assert_eq!(features.get(Feature::LastNameMatch), 0.0);
        assert_eq!(features.get(Feature::FirstNameMatch), 1.0);
    }

    #[test]
    fn test_dob_scoring() {
        assert_eq!(dob_score(Some("1990-01-01"), Some("1990-12-31")), 1.0);
        assert_eq!(dob_score(Some("1990-01-01"), Some("1991-06-01")), 0.5);
        assert_eq!(dob_score(Some("1990-01-01"), Some("1993-06-01")), 0.0);
        assert_eq!(dob_score(Some("not a date"), Some("1990-01-01")), 0.0);
        assert_eq!(dob_score(None, Some("1990-01-01")), 0.0);
        assert_eq!(birth_year("1990-13-45"), Some(1990));
    }

    #[test]
    fn test_short_abha_is_ignored() {
        let a = PatientRecord::new("Ravi").with_abha("12345");
        let b = PatientRecord::new("Ravi").with_abha("12345");
        assert_eq!(extract_features(&a, &b).get(Feature::AbhaMatch), 0.0);

        let a = a.with_abha("12-3456-7890-1234");
        let b = b.with_abha("12-3456-7890-1234");
        assert_eq!(extract_features(&a, &b).get(Feature::AbhaMatch), 1.0);
    }

    #[test]
    fn test_absent_gender_defaults_to_unknown() {
        let a = PatientRecord::new("Ravi");
        let b = PatientRecord::new("Ravi");
        assert_eq!(extract_features(&a, &b).get(Feature::GenderMatch), 1.0);
        let b = b.with_gender("F");
        assert_eq!(extract_features(&a, &b).get(Feature::GenderMatch), 0.0);
    }

    #[test]
    fn test_feature_names_round_trip() {
        for feature in Feature::ALL {
            assert_eq!(Feature::from_name(feature.as_str()), Some(feature));
        }
        assert_eq!(Feature::from_name("Zip Match"), None);
    }
}
