// src/models/mod.rs
pub mod matching;
pub mod patient;

pub use matching::{
    ComparatorResult, Confidence, IdKind, MatchMethod, MatchPolicy, MatchVerdict, Recommendation,
};
pub use patient::PatientRecord;
