// src/bin/report_weights.rs
use anyhow::Result;
use clap::Parser;
use linkage_lib::rl::{AdaptiveScorer, JsonWeightStore};
use linkage_lib::utils::config::MatchingConfig;
use linkage_lib::utils::env::load_env;
use log::info;
use std::path::PathBuf;

/// Prints the persisted weight table ranked by importance.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Weights file; overrides WEIGHTS_PATH
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Emit the importance ranking as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    load_env();
    let args = Args::parse();

    let weights_path = args
        .weights
        .unwrap_or_else(|| MatchingConfig::from_env().weights_path);
    info!("Reporting weights from {}", weights_path.display());
    let scorer = AdaptiveScorer::load(JsonWeightStore::new(&weights_path));

    let mut ranked: Vec<(String, f64)> = scorer.weights_snapshot().importance().into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    if args.json {
        let rows: Vec<serde_json::Value> = ranked
            .iter()
            .map(|(feature, importance)| serde_json::json!({ "feature": feature, "importance": importance }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{}", scorer.get_stats_display());
    println!("Feature Importance (highest first):");
    for (rank, (feature, importance)) in ranked.iter().enumerate() {
        println!("  {:>2}. {:<20} {:>6.1}%", rank + 1, feature, importance * 100.0);
    }
    Ok(())
}
