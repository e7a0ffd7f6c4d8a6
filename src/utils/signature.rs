// src/utils/signature.rs
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::models::PatientRecord;

/// Content signature over the fields the feature extractor reads.
///
/// Two records with the same signature produce identical features against any third
/// record, so the signature is a safe cache key even when ids are reused or missing.
pub fn record_signature(record: &PatientRecord) -> String {
    let mut components: BTreeMap<&str, &str> = BTreeMap::new();
    components.insert("name", record.name.as_str());
    components.insert("dob", record.dob().unwrap_or(""));
    components.insert("mobile", record.mobile().unwrap_or(""));
    components.insert("gender", record.gender().unwrap_or(""));
    components.insert("abha_number", record.abha_number().unwrap_or(""));

    let mut hasher = Sha256::new();
    for (key, value) in components {
        hasher.update(format!("{}:{}\n", key, value).as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Order-independent key for a pair of signatures.
pub fn pair_key(sig_a: &str, sig_b: &str) -> String {
    if sig_a <= sig_b {
        format!("{}:{}", sig_a, sig_b)
    } else {
        format!("{}:{}", sig_b, sig_a)
    }
}
