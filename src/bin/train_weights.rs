// src/bin/train_weights.rs
use anyhow::{Context, Result};
use clap::Parser;
use linkage_lib::matching::db::load_records;
use linkage_lib::rl::training::save_examples;
use linkage_lib::rl::{build_training_examples, load_examples, AdaptiveScorer, JsonWeightStore};
use linkage_lib::utils::config::MatchingConfig;
use linkage_lib::utils::env::load_env;
use linkage_lib::utils::logging::{MatchingLogger, OperationKind};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

/// Adapts the scorer's feature weights from a labeled cohort.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON array of patient records whose ids encode the person (HA001, HB001, ...)
    #[arg(required_unless_present = "examples")]
    cohort: Option<PathBuf>,

    /// Pre-built labeled examples instead of a cohort
    #[arg(long, conflicts_with = "cohort")]
    examples: Option<PathBuf>,

    /// Seed for negative sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Write the generated examples to this file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Weights file; overrides WEIGHTS_PATH
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Report the adapted weights without saving them
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    load_env();
    let args = Args::parse();

    let mut config = MatchingConfig::from_env();
    if let Some(weights) = args.weights {
        config.weights_path = weights;
    }

    let logger = MatchingLogger::new(OperationKind::Train);
    logger.log_phase("Loading training data", None);

    let examples = match (&args.examples, &args.cohort) {
        (Some(path), _) => load_examples(path)?,
        (None, Some(path)) => {
            let records = load_records(path)?;
            logger.log_data_loaded(records.len(), &path.display().to_string());
            let mut rng = match args.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            build_training_examples(&records, &mut rng)
        }
        (None, None) => anyhow::bail!("Either a cohort file or --examples is required"),
    };
    let positives = examples.iter().filter(|e| e.label == 1).count();
    logger.log_phase(
        "Examples ready",
        Some(&format!("{} positive, {} negative", positives, examples.len() - positives)),
    );

    if let Some(export) = &args.export {
        save_examples(export, &examples)
            .with_context(|| format!("Failed to export examples to {}", export.display()))?;
        info!("Exported {} examples to {}", examples.len(), export.display());
    }

    let scorer = AdaptiveScorer::load(JsonWeightStore::new(&config.weights_path));
    logger.log_phase("Adjusting weights", None);
    let report = scorer.train(&examples);
    if report.boosted.is_empty() {
        logger.log_warning("No feature crossed the boost threshold; weights unchanged");
    }
    for (feature, old, new) in &report.boosted {
        info!("Boosted '{}': {:.3} -> {:.3}", feature.as_str(), old, new);
    }

    if args.dry_run {
        info!("Dry run; weights not saved");
    } else if !report.boosted.is_empty() {
        scorer.save_or_warn();
    }

    println!("{}", scorer.get_stats_display());
    info!("Training finished in {:.2?}", logger.get_elapsed());
    Ok(())
}
