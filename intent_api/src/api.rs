// src/api.rs

use serde::{Deserialize, Serialize};

pub const CODE_SUCCESS: i32 = 0;
pub const CODE_UNKNOWN_METHOD: i32 = 50012;

/// Form or query-string request. `context` is a JSON array of turns or one plain turn.
#[derive(Deserialize, Default)]
pub struct IntentForm {
    pub text: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Default)]
pub struct IntentRequest {
    pub text: Option<String>,
    pub context: Vec<String>,
}

impl TryFrom<IntentForm> for IntentRequest {
    type Error = serde_json::Error;

    fn try_from(form: IntentForm) -> Result<Self, Self::Error> {
        let context = match form.context.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(raw) if raw.starts_with('[') => serde_json::from_str(raw)?,
            Some(raw) => vec![raw.to_string()],
        };
        Ok(IntentRequest {
            text: form.text,
            context,
        })
    }
}

/// `{"message", "code", "data"}` reply shared by every outcome.
#[derive(Serialize)]
pub struct Envelope<T> {
    pub message: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            message: "success".to_string(),
            code: CODE_SUCCESS,
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code,
            data: None,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub intents: usize,
}
