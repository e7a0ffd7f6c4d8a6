// src/rl/mod.rs
pub mod feature_cache;
pub mod feature_extraction;
pub mod scorer;
pub mod training;
pub mod weights;

// Re-export the scoring API
pub use feature_cache::{create_shared_cache, FeatureCache, SharedFeatureCache};
pub use feature_extraction::{extract_features, Feature, FeatureVector};
pub use scorer::{AdaptiveScorer, ScoreOutcome, TrainingReport};
pub use training::{build_training_examples, load_examples, TrainingExample};
pub use weights::{JsonWeightStore, WeightTable};
