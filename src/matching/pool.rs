// src/matching/pool.rs
//
// Target-vs-pool and pool-vs-pool sweeps. Pairs are independent, so the work is cut into
// roughly one batch per core and each batch is scored on the blocking pool.
use anyhow::{Context, Result};
use futures::future::join_all;
use indicatif::ProgressBar;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::matching::orchestrator::PatientMatcher;
use crate::models::{MatchVerdict, PatientRecord, Recommendation};
use crate::utils::logging::{MatchingLogger, OperationKind};

const MAX_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    /// Position of the candidate in the input pool.
    pub index: usize,
    pub verdict: MatchVerdict,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossMatch {
    pub index_a: usize,
    pub index_b: usize,
    pub verdict: MatchVerdict,
}

/// Batch size giving about one batch per available core.
pub fn calculate_batch_size(total: usize) -> usize {
    (total / num_cpus::get()).clamp(1, MAX_BATCH_SIZE)
}

fn by_score_desc(a: &MatchVerdict, b: &MatchVerdict) -> Ordering {
    b.match_score.total_cmp(&a.match_score)
}

fn count_outcomes<'a>(verdicts: impl Iterator<Item = &'a MatchVerdict>) -> (usize, usize) {
    verdicts.fold((0, 0), |(m, r), v| match v.recommendation {
        Recommendation::Match => (m + 1, r),
        Recommendation::Review => (m, r + 1),
        Recommendation::NoMatch => (m, r),
    })
}

fn log_cache_stats(logger: &MatchingLogger, matcher: &PatientMatcher) {
    if let Some((hits, misses, _)) = matcher.feature_cache_stats() {
        logger.log_cache_results(hits, misses);
    }
}

/// Scores `target` against every candidate and returns them best first.
/// Ties are ordered by candidate record id, then by position.
pub async fn rank_candidates(
    matcher: Arc<PatientMatcher>,
    target: PatientRecord,
    candidates: Arc<Vec<PatientRecord>>,
    top_k: Option<usize>,
    progress: Option<ProgressBar>,
) -> Result<Vec<RankedCandidate>> {
    let logger = MatchingLogger::new(OperationKind::Rank);
    let total = candidates.len();
    logger.log_start(matcher.policy(), total, matcher.feature_cache_stats().is_some());

    let batch_size = calculate_batch_size(total);
    logger.log_batch_processing_start(total, batch_size);
    let target = Arc::new(target);

    let mut tasks = Vec::new();
    for start in (0..total).step_by(batch_size) {
        let end = (start + batch_size).min(total);
        let matcher = matcher.clone();
        let target = target.clone();
        let candidates = candidates.clone();
        let progress = progress.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            let batch: Vec<RankedCandidate> = (start..end)
                .map(|index| RankedCandidate {
                    index,
                    verdict: matcher.match_patients(&target, &candidates[index]),
                })
                .collect();
            if let Some(pb) = &progress {
                pb.inc(batch.len() as u64);
            }
            batch
        }));
    }

    let mut ranked = Vec::with_capacity(total);
    for result in join_all(tasks).await {
        ranked.extend(result.context("Ranking batch task panicked or was cancelled")?);
    }

    ranked.sort_by(|a, b| {
        by_score_desc(&a.verdict, &b.verdict)
            .then_with(|| a.verdict.patient_b_id.cmp(&b.verdict.patient_b_id))
            .then_with(|| a.index.cmp(&b.index))
    });
    let (matches, reviews) = count_outcomes(ranked.iter().map(|r| &r.verdict));
    if let Some(k) = top_k {
        ranked.truncate(k);
    }
    log_cache_stats(&logger, &matcher);
    logger.log_completion(matches, reviews, total);
    Ok(ranked)
}

/// Scores every pair across two pools, keeping those at or above `min_score`.
/// Output is best first; ties are ordered by the two record ids, then by position.
pub async fn cross_match(
    matcher: Arc<PatientMatcher>,
    pool_a: Arc<Vec<PatientRecord>>,
    pool_b: Arc<Vec<PatientRecord>>,
    min_score: f64,
    progress: Option<ProgressBar>,
) -> Result<Vec<CrossMatch>> {
    let logger = MatchingLogger::new(OperationKind::Cross);
    let total_pairs = pool_a.len() * pool_b.len();
    logger.log_start(matcher.policy(), total_pairs, matcher.feature_cache_stats().is_some());

    // Batches are rows of pool A.
    let rows_per_batch = calculate_batch_size(pool_a.len());
    logger.log_batch_processing_start(total_pairs, rows_per_batch * pool_b.len().max(1));

    let mut tasks = Vec::new();
    for start in (0..pool_a.len()).step_by(rows_per_batch) {
        let end = (start + rows_per_batch).min(pool_a.len());
        let matcher = matcher.clone();
        let pool_a = pool_a.clone();
        let pool_b = pool_b.clone();
        let progress = progress.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            let mut batch = Vec::new();
            let (mut matches, mut reviews) = (0usize, 0usize);
            for index_a in start..end {
                for (index_b, record_b) in pool_b.iter().enumerate() {
                    let verdict = matcher.match_patients(&pool_a[index_a], record_b);
                    match verdict.recommendation {
                        Recommendation::Match => matches += 1,
                        Recommendation::Review => reviews += 1,
                        Recommendation::NoMatch => {}
                    }
                    if verdict.match_score >= min_score {
                        batch.push(CrossMatch {
                            index_a,
                            index_b,
                            verdict,
                        });
                    }
                }
                if let Some(pb) = &progress {
                    pb.inc(pool_b.len() as u64);
                }
            }
            (batch, matches, reviews)
        }));
    }

    let mut found = Vec::new();
    let (mut matches, mut reviews) = (0, 0);
    for result in join_all(tasks).await {
        let (batch, m, r) = result.context("Cross-match batch task panicked or was cancelled")?;
        found.extend(batch);
        matches += m;
        reviews += r;
    }

    found.sort_by(|a, b| {
        by_score_desc(&a.verdict, &b.verdict)
            .then_with(|| a.verdict.patient_a_id.cmp(&b.verdict.patient_a_id))
            .then_with(|| a.verdict.patient_b_id.cmp(&b.verdict.patient_b_id))
            .then_with(|| (a.index_a, a.index_b).cmp(&(b.index_a, b.index_b)))
    });
    log_cache_stats(&logger, &matcher);
    logger.log_completion(matches, reviews, total_pairs);
    Ok(found)
}
