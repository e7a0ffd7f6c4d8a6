// src/utils/logging.rs - Logging helpers for matching sweeps and training runs
use log::{info, warn};
use std::time::{Duration, Instant};

use crate::models::MatchPolicy;

/// Long-running operations that get bracketed progress logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Rank,
    Cross,
    Train,
}

#[derive(Clone)]
pub struct MatchingLogger {
    operation_name: &'static str,
    operation_emoji: &'static str,
    start_time: Instant,
}

impl MatchingLogger {
    pub fn new(operation: OperationKind) -> Self {
        let (operation_name, operation_emoji) = match operation {
            OperationKind::Rank => ("RANK", "🎯"),
            OperationKind::Cross => ("CROSS", "🔀"),
            OperationKind::Train => ("TRAIN", "🧠"),
        };
        Self {
            operation_name,
            operation_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, policy: MatchPolicy, total_pairs: usize, has_cache: bool) {
        info!(
            "[{}] {} 🚀 Starting {} over {} pairs ({} policy){}",
            self.operation_name,
            self.operation_emoji,
            self.operation_name.to_lowercase(),
            total_pairs,
            policy.as_str(),
            if has_cache { " with feature cache" } else { "" }
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        let msg = if let Some(details) = details {
            format!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.operation_name, self.operation_emoji, phase, details, elapsed.as_secs_f32()
            )
        } else {
            format!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.operation_name, self.operation_emoji, phase, elapsed.as_secs_f32()
            )
        };
        info!("{}", msg);
    }

    pub fn log_data_loaded(&self, count: usize, source: &str) {
        info!(
            "[{}] {} 📊 Loaded {} patient records from {}",
            self.operation_name, self.operation_emoji, count, source
        );
    }

    pub fn log_batch_processing_start(&self, total_pairs: usize, batch_size: usize) {
        let batch_count = total_pairs.div_ceil(batch_size.max(1));
        info!(
            "[{}] {} ⚙️  Processing {} pairs in {} batches (batch size: {})",
            self.operation_name, self.operation_emoji, total_pairs, batch_count, batch_size
        );
    }

    pub fn log_cache_results(&self, cache_hits: usize, cache_misses: usize) {
        let total = cache_hits + cache_misses;
        if total > 0 {
            let hit_rate = (cache_hits as f64 / total as f64) * 100.0;
            info!(
                "[{}] {} 💾 Cache results: {} hits, {} misses ({:.1}% hit rate)",
                self.operation_name, self.operation_emoji, cache_hits, cache_misses, hit_rate
            );
        }
    }

    pub fn log_completion(&self, matches: usize, reviews: usize, total_pairs: usize) {
        let duration = self.start_time.elapsed();
        info!(
            "[{}] {} 🎉 COMPLETED: {} pairs scored in {:.2?}",
            self.operation_name, self.operation_emoji, total_pairs, duration
        );
        info!(
            "[{}] {} 📊 Results: {} MATCH, {} REVIEW, {} NO_MATCH",
            self.operation_name,
            self.operation_emoji,
            matches,
            reviews,
            total_pairs.saturating_sub(matches + reviews)
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.operation_name, self.operation_emoji, message);
    }

    pub fn get_elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}
