// src/lib.rs
pub mod matching;
pub mod models;
pub mod rl;
pub mod utils;
