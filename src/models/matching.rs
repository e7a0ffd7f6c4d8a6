// src/models/matching.rs
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Government or contact identifiers compared by exact match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdKind {
    Abha,
    Aadhaar,
    Mobile,
}

impl IdKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdKind::Abha => "ABHA",
            IdKind::Aadhaar => "AADHAAR",
            IdKind::Mobile => "MOBILE",
        }
    }

    pub fn method(&self) -> MatchMethod {
        match self {
            IdKind::Abha => MatchMethod::AbhaExact,
            IdKind::Aadhaar => MatchMethod::AadhaarExact,
            IdKind::Mobile => MatchMethod::MobileExact,
        }
    }

    /// Label shown in the matched-field checklist.
    pub fn field_label(&self) -> &'static str {
        match self {
            IdKind::Abha => "ABHA Number",
            IdKind::Aadhaar => "Aadhaar Number",
            IdKind::Mobile => "Phone Number",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchMethod {
    AbhaExact,
    AadhaarExact,
    MobileExact,
    PhoneticIndian,
    Fuzzy,
    MobileMatch,
    None,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::AbhaExact => "ABHA_EXACT",
            MatchMethod::AadhaarExact => "AADHAAR_EXACT",
            MatchMethod::MobileExact => "MOBILE_EXACT",
            MatchMethod::PhoneticIndian => "PHONETIC_INDIAN",
            MatchMethod::Fuzzy => "FUZZY",
            MatchMethod::MobileMatch => "MOBILE_MATCH",
            MatchMethod::None => "NONE",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw output of one comparator, kept in the verdict for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparatorResult {
    pub score: f64,
    pub matched: bool,
    pub method: MatchMethod,
    pub details: String,
}

impl ComparatorResult {
    pub fn no_match(method: MatchMethod, details: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            matched: false,
            method,
            details: details.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
    None,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
            Confidence::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Match,
    Review,
    NoMatch,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Match => "MATCH",
            Recommendation::Review => "REVIEW",
            Recommendation::NoMatch => "NO_MATCH",
        }
    }
}

/// Which decision procedure produced a verdict. The two never mix within one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    #[default]
    Adaptive,
    Waterfall,
}

impl MatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchPolicy::Adaptive => "adaptive",
            MatchPolicy::Waterfall => "waterfall",
        }
    }
}

impl FromStr for MatchPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "adaptive" | "ml" => Ok(MatchPolicy::Adaptive),
            "waterfall" | "simple" => Ok(MatchPolicy::Waterfall),
            other => Err(anyhow::anyhow!("Unknown match policy '{}'", other)),
        }
    }
}

/// Final decision for one record pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchVerdict {
    pub match_score: f64,
    pub confidence: Confidence,
    pub method: MatchMethod,
    pub recommendation: Recommendation,
    pub patient_a_id: String,
    pub patient_b_id: String,
    pub matched_fields: Vec<String>,
    pub policy: MatchPolicy,
    pub details: JsonValue,
}

impl MatchVerdict {
    pub fn is_match(&self) -> bool {
        self.recommendation == Recommendation::Match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enum_wire_format() {
        assert_eq!(serde_json::to_value(Confidence::Medium).unwrap(), json!("medium"));
        assert_eq!(
            serde_json::to_value(Recommendation::NoMatch).unwrap(),
            json!("NO_MATCH")
        );
        assert_eq!(
            serde_json::to_value(MatchMethod::PhoneticIndian).unwrap(),
            json!("PHONETIC_INDIAN")
        );
        assert_eq!(MatchMethod::AbhaExact.to_string(), "ABHA_EXACT");
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("Waterfall".parse::<MatchPolicy>().unwrap(), MatchPolicy::Waterfall);
        assert_eq!(" adaptive ".parse::<MatchPolicy>().unwrap(), MatchPolicy::Adaptive);
        assert!("random".parse::<MatchPolicy>().is_err());
    }

    #[test]
    fn test_id_kind_methods() {
        assert_eq!(IdKind::Abha.method(), MatchMethod::AbhaExact);
        assert_eq!(IdKind::Mobile.method().as_str(), "MOBILE_EXACT");
        assert_eq!(IdKind::Aadhaar.as_str(), "AADHAAR");
    }
}
