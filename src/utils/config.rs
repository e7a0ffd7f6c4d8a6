// src/utils/config.rs
use log::{info, warn};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::models::MatchPolicy;
use crate::rl::feature_cache::DEFAULT_CACHE_SIZE;

pub const DEFAULT_WEIGHTS_PATH: &str = "model_weights.json";
pub const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    pub policy: MatchPolicy,
    pub weights_path: PathBuf,
    pub feature_cache_size: usize,
    pub top_k: usize,
    pub min_score: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            policy: MatchPolicy::Adaptive,
            weights_path: PathBuf::from(DEFAULT_WEIGHTS_PATH),
            feature_cache_size: DEFAULT_CACHE_SIZE,
            top_k: DEFAULT_TOP_K,
            min_score: 0.0,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid value '{}' for {}; using default", raw, name);
                default
            }
        },
        Err(_) => default,
    }
}

impl MatchingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let min_score = parse_var("MATCH_MIN_SCORE", defaults.min_score);
        Self {
            policy: parse_var("MATCH_POLICY", defaults.policy),
            weights_path: env::var("WEIGHTS_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.weights_path),
            feature_cache_size: parse_var("FEATURE_CACHE_SIZE", defaults.feature_cache_size),
            top_k: parse_var("MATCH_TOP_K", defaults.top_k),
            min_score: if (0.0..=100.0).contains(&min_score) {
                min_score
            } else {
                warn!("MATCH_MIN_SCORE {} outside 0-100; using 0", min_score);
                0.0
            },
        }
    }

    pub fn log_config(&self) {
        info!("⚙️  Matching policy: {}", self.policy.as_str());
        info!("   Weights file: {}", self.weights_path.display());
        if self.feature_cache_size > 0 {
            info!("   Feature cache size: {}", self.feature_cache_size);
        } else {
            info!("   Feature cache DISABLED");
        }
        info!("   Top-K: {}, minimum score: {:.1}", self.top_k, self.min_score);
    }
}
