use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use linkage_lib::matching::db::{load_record, load_records, PatientSource, PgPatientSource};
use linkage_lib::matching::{cross_match, rank_candidates, PatientMatcher};
use linkage_lib::models::{MatchPolicy, PatientRecord};
use linkage_lib::rl::{create_shared_cache, load_examples, AdaptiveScorer, JsonWeightStore};
use linkage_lib::utils::config::MatchingConfig;
use linkage_lib::utils::db_connect::connect;
use linkage_lib::utils::env::load_env;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Decision policy (adaptive or waterfall); overrides MATCH_POLICY
    #[arg(long, global = true)]
    policy: Option<MatchPolicy>,

    /// Weights file; overrides WEIGHTS_PATH
    #[arg(long, global = true)]
    weights: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Match two patient records
    Match {
        /// JSON file with record A, or a patient id with --db
        record_a: String,
        /// JSON file with record B, or a patient id with --db
        record_b: String,
        /// Fetch both records from PostgreSQL by patient id
        #[arg(long)]
        db: bool,
    },
    /// Rank a candidate pool against one target record
    Rank {
        /// JSON file with the target record
        target: PathBuf,
        /// JSON array of candidate records
        pool: PathBuf,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Match every record of one pool against another
    Cross {
        /// JSON array of records, or a hospital id with --db
        pool_a: String,
        /// JSON array of records, or a hospital id with --db
        pool_b: String,
        /// Fetch both pools from PostgreSQL by hospital id
        #[arg(long)]
        db: bool,
        #[arg(long)]
        min_score: Option<f64>,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Adapt weights from a labeled example file
    Train {
        examples: PathBuf,
        /// Persist the adapted weights
        #[arg(long)]
        save: bool,
    },
    /// Print the current weight table
    Weights,
}

fn sweep_progress_bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner:.blue} [{elapsed_precise}] {bar:30.green/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    pb.set_message(message.to_string());
    pb
}

async fn load_pool(arg: &str, from_db: bool, source: Option<&PgPatientSource>) -> Result<Vec<PatientRecord>> {
    match (from_db, source) {
        (true, Some(source)) => source.fetch_by_hospital(arg).await,
        _ => load_records(Path::new(arg)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    load_env();
    let cli = Cli::parse();

    let mut config = MatchingConfig::from_env();
    if let Some(policy) = cli.policy {
        config.policy = policy;
    }
    if let Some(weights) = cli.weights {
        config.weights_path = weights;
    }
    config.log_config();

    let scorer = Arc::new(AdaptiveScorer::load(JsonWeightStore::new(&config.weights_path)));
    let mut matcher = PatientMatcher::new(scorer.clone(), config.policy);
    if config.feature_cache_size > 0 {
        matcher = matcher.with_feature_cache(create_shared_cache(config.feature_cache_size));
    }
    let matcher = Arc::new(matcher);

    match cli.command {
        Command::Match { record_a, record_b, db } => {
            let (a, b) = if db {
                let source = PgPatientSource::new(connect().await.context("Failed to connect to database")?);
                let a = source
                    .fetch_patient(&record_a)
                    .await?
                    .with_context(|| format!("Patient {} not found", record_a))?;
                let b = source
                    .fetch_patient(&record_b)
                    .await?
                    .with_context(|| format!("Patient {} not found", record_b))?;
                (a, b)
            } else {
                (load_record(Path::new(&record_a))?, load_record(Path::new(&record_b))?)
            };
            if !a.has_name() || !b.has_name() {
                anyhow::bail!("Both records need a name to be matched");
            }
            let verdict = matcher.match_patients(&a, &b);
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
        Command::Rank { target, pool, top_k } => {
            let target = load_record(&target)?;
            if !target.has_name() {
                anyhow::bail!("Target record has no name");
            }
            let candidates = Arc::new(load_records(&pool)?);
            info!("Ranking {} candidates against {}", candidates.len(), target.display_id());
            let pb = sweep_progress_bar(candidates.len() as u64, "Scoring candidates...");
            let ranked = rank_candidates(
                matcher.clone(),
                target,
                candidates,
                Some(top_k.unwrap_or(config.top_k)),
                Some(pb.clone()),
            )
            .await?;
            pb.finish_with_message("Ranking complete");
            println!("{}", serde_json::to_string_pretty(&ranked)?);
        }
        Command::Cross { pool_a, pool_b, db, min_score, top_k } => {
            let source = if db {
                Some(PgPatientSource::new(connect().await.context("Failed to connect to database")?))
            } else {
                None
            };
            let records_a = Arc::new(load_pool(&pool_a, db, source.as_ref()).await?);
            let records_b = Arc::new(load_pool(&pool_b, db, source.as_ref()).await?);
            let total = (records_a.len() * records_b.len()) as u64;
            let pb = sweep_progress_bar(total, "Cross-matching pools...");
            let mut found = cross_match(
                matcher.clone(),
                records_a,
                records_b,
                min_score.unwrap_or(config.min_score),
                Some(pb.clone()),
            )
            .await?;
            pb.finish_with_message("Cross-match complete");
            found.truncate(top_k.unwrap_or(config.top_k));
            println!("{}", serde_json::to_string_pretty(&found)?);
        }
        Command::Train { examples, save } => {
            let examples = load_examples(&examples)?;
            let report = scorer.train(&examples);
            for (feature, old, new) in &report.boosted {
                info!("Boosted '{}': {:.3} -> {:.3}", feature.as_str(), old, new);
            }
            if save {
                scorer.save_or_warn();
            }
            println!("{}", scorer.get_stats_display());
        }
        Command::Weights => {
            println!("{}", scorer.get_stats_display());
        }
    }

    if let Some((hits, misses, entries)) = matcher.feature_cache_stats() {
        info!(
            "Feature cache: {} hits, {} misses, {} entries",
            hits, misses, entries
        );
    }
    Ok(())
}
