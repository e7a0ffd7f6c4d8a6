// src/matching/mod.rs
pub mod db;
pub mod identity;
pub mod orchestrator;
pub mod phonetic;
pub mod pool;
pub mod similarity;

pub use identity::{exact_id_match, normalize_identifier, normalize_phone};
pub use orchestrator::PatientMatcher;
pub use phonetic::{canonicalize_indian_name, phonetic_match_indian};
pub use pool::{cross_match, rank_candidates};
pub use similarity::{character_ratio, fuzzy_match, token_sort_ratio};
