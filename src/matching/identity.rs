// src/matching/identity.rs
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ComparatorResult, IdKind, PatientRecord};

/// Score awarded for an identifier match. Only identity comparators ever return it.
pub const IDENTITY_EXACT_SCORE: f64 = 100.0;

/// Digits kept from the end of a phone number; drops any country-code prefix.
pub const PHONE_SIGNIFICANT_DIGITS: usize = 10;

static ID_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-]+").unwrap());

/// Strips whitespace and dashes and lowercases, so `12-3456-7890-1234` and
/// `12 3456 7890 1234` compare equal.
pub fn normalize_identifier(value: &str) -> String {
    ID_SEPARATORS.replace_all(value.trim(), "").to_lowercase()
}

/// Keeps only the trailing ten digits of a phone number.
pub fn normalize_phone(phone: &str) -> String {
    let digits_only: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits_only.len() > PHONE_SIGNIFICANT_DIGITS {
        return digits_only[digits_only.len() - PHONE_SIGNIFICANT_DIGITS..].to_string();
    }
    digits_only
}

fn normalize_for(kind: IdKind, value: &str) -> String {
    match kind {
        IdKind::Mobile => normalize_phone(value),
        IdKind::Abha | IdKind::Aadhaar => normalize_identifier(value),
    }
}

fn missing_side(a: bool, b: bool) -> &'static str {
    match (a, b) {
        (true, true) => "both patients",
        (true, false) => "patient A",
        _ => "patient B",
    }
}

/// Exact match on a normalized identifier. Absent, blank or separator-only values are
/// reported as missing and never match.
pub fn exact_id_match(value_a: Option<&str>, value_b: Option<&str>, kind: IdKind) -> ComparatorResult {
    let method = kind.method();
    let norm_a = value_a.map(|v| normalize_for(kind, v)).filter(|v| !v.is_empty());
    let norm_b = value_b.map(|v| normalize_for(kind, v)).filter(|v| !v.is_empty());

    let (norm_a, norm_b) = match (norm_a, norm_b) {
        (Some(a), Some(b)) => (a, b),
        (a, b) => {
            let details = format!(
                "{} missing for {}",
                kind.field_label(),
                missing_side(a.is_none(), b.is_none())
            );
            return ComparatorResult::no_match(method, details);
        }
    };

    if norm_a == norm_b {
        debug!("{} exact match on normalized value", kind.as_str());
        ComparatorResult {
            score: IDENTITY_EXACT_SCORE,
            matched: true,
            method,
            details: format!("Exact {} match", kind.field_label()),
        }
    } else {
        ComparatorResult::no_match(method, format!("{} values differ", kind.field_label()))
    }
}

pub fn abha_exact_match(a: &PatientRecord, b: &PatientRecord) -> ComparatorResult {
    exact_id_match(a.abha_number(), b.abha_number(), IdKind::Abha)
}

pub fn aadhaar_exact_match(a: &PatientRecord, b: &PatientRecord) -> ComparatorResult {
    exact_id_match(a.aadhaar_number(), b.aadhaar_number(), IdKind::Aadhaar)
}

pub fn mobile_exact_match(a: &PatientRecord, b: &PatientRecord) -> ComparatorResult {
    exact_id_match(a.mobile(), b.mobile(), IdKind::Mobile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchMethod;

    #[test]
    fn test_abha_format_variants_match() {
        let result = exact_id_match(
            Some("12-3456-7890-1234"),
            Some("12 3456 7890 1234"),
            IdKind::Abha,
        );
        assert!(result.matched);
        assert_eq!(result.score, 100.0);
        assert_eq!(result.method, MatchMethod::AbhaExact);
    }

    #[test]
    fn test_identifier_case_is_ignored() {
        let result = exact_id_match(Some("ab-12cd"), Some("AB12CD"), IdKind::Aadhaar);
        assert!(result.matched);
        assert_eq!(result.method, MatchMethod::AadhaarExact);
    }

    #[test]
    fn test_missing_side_is_named() {
        let result = exact_id_match(None, Some("12-3456"), IdKind::Abha);
        assert!(!result.matched);
        assert_eq!(result.score, 0.0);
        assert!(result.details.contains("missing"));
        assert!(result.details.contains("patient A"));

        let result = exact_id_match(Some("12-3456"), Some(" - "), IdKind::Abha);
        assert!(result.details.contains("patient B"));

        let result = exact_id_match(None, None, IdKind::Mobile);
        assert!(result.details.contains("both patients"));
    }

    #[test]
    fn test_phone_country_code_is_dropped() {
        assert_eq!(normalize_phone("+91 98765-43210"), "9876543210");
        assert_eq!(normalize_phone("09876543210"), "9876543210");
        let result = exact_id_match(Some("+91-9876543210"), Some("98765 43210"), IdKind::Mobile);
        assert!(result.matched);
        assert_eq!(result.method, MatchMethod::MobileExact);
    }

    #[test]
    fn test_different_identifiers_do_not_match() {
        let result = exact_id_match(Some("1111"), Some("2222"), IdKind::Aadhaar);
        assert!(!result.matched);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_record_wrappers() {
        let a = PatientRecord::new("Ramesh").with_abha("12-3456-7890-1234");
        let b = PatientRecord::new("Ramehs").with_abha("12345678901234");
        assert!(abha_exact_match(&a, &b).matched);
        assert!(!aadhaar_exact_match(&a, &b).matched);
        assert!(!mobile_exact_match(&a, &b).matched);
    }
}
