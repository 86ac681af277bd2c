// src/error.rs

use super::api::Envelope;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NluError {
    #[error("Failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse model JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tensor operation failed: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Failed to fetch pretrained weights: {0}")]
    Hub(#[from] hf_hub::api::sync::ApiError),

    #[error("No fine-tuned weights found in {0}")]
    MissingWeights(PathBuf),

    #[error("Intent vocabulary {0} is empty")]
    EmptyVocab(PathBuf),

    #[error("Model produced {got} intent logits, vocabulary has {expected}")]
    LogitMismatch { expected: usize, got: usize },
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("missing field: text")]
    MissingText,

    #[error("invalid context: {0}")]
    InvalidContext(String),

    #[error("invalid body: {0}")]
    InvalidBody(String),

    #[error("inference failed: {0}")]
    Inference(#[from] NluError),

    #[error("Internal Server Error")]
    InternalError,
}

impl ServiceError {
    pub fn code(&self) -> i32 {
        match self {
            ServiceError::MissingText => 40001,
            ServiceError::InvalidContext(_) => 40002,
            ServiceError::InvalidBody(_) => 40003,
            ServiceError::Inference(_) => 50001,
            ServiceError::InternalError => 50000,
        }
    }
}

// Render errors in the same envelope as successful replies
impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::MissingText
            | ServiceError::InvalidContext(_)
            | ServiceError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ServiceError::Inference(_) | ServiceError::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(Envelope::<()>::error(
            self.to_string(),
            self.code(),
        ))
    }
}
