// src/lib.rs

pub mod api;
pub mod config;
pub mod error;
pub mod handlers;
pub mod log_cleanup;
pub mod logging;
pub mod model;
pub mod nlu;
pub mod services;
pub mod tokenize;

use nlu::IntentNlu;
use std::path::PathBuf;
use std::sync::Arc;

/* ---------- Shared State ---------- */
pub struct AppState {
    pub nlu: Arc<dyn IntentNlu>,
    pub log_dir: PathBuf,
    pub log_prefix: String,
}
