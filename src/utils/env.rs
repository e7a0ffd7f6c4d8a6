// src/utils/env.rs
use log::{debug, info};
use std::path::{Path, PathBuf};

const ENV_FILES: [&str; 3] = [".env", ".env.local", "../.env"];

/// Loads the first env file found in `paths`. Variables already set in the process win.
pub fn load_env_from(paths: &[&Path]) -> Option<PathBuf> {
    for path in paths {
        match dotenv::from_path(path) {
            Ok(()) => {
                info!("Loaded environment from {}", path.display());
                return Some(path.to_path_buf());
            }
            Err(e) => debug!("No env file at {}: {}", path.display(), e),
        }
    }
    info!("No .env file found. Proceeding with system environment variables.");
    None
}

/// Call after the logger is initialised so the outcome is reported.
pub fn load_env() -> Option<PathBuf> {
    let paths: Vec<&Path> = ENV_FILES.into_iter().map(Path::new).collect();
    load_env_from(&paths)
}
