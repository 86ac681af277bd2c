// src/services.rs

use super::AppState;
use super::api::IntentRequest;
use super::error::ServiceError;
use super::log_cleanup;
use chrono::Utc;
use tracing::{debug, info, warn};

/// Classifies one request and returns the top intent name.
pub fn run_prediction(state: &AppState, request: IntentRequest) -> Result<String, ServiceError> {
    let text = match request.text {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Err(ServiceError::MissingText),
    };

    let prediction = state.nlu.predict(&text, &request.context)?;
    info!(
        "text={:?} intent={} score={:.4} candidates={}",
        text,
        prediction.intent,
        prediction.score,
        prediction.intents.len()
    );
    if let Ok(ranked) = serde_json::to_string(&prediction.intents) {
        debug!("ranked intents: {}", ranked);
    }
    Ok(prediction.intent)
}

/// Drops log files from previous months. Failures are logged, never returned.
pub fn clean_logs(state: &AppState) {
    let today = Utc::now().date_naive();
    if let Err(e) = log_cleanup::clean_logs(&state.log_dir, &state.log_prefix, today) {
        warn!("log cleanup failed in {}: {}", state.log_dir.display(), e);
    }
}
