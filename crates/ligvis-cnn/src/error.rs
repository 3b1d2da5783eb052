//! Error types for the CNN scorer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CnnError>;

#[derive(Error, Debug)]
pub enum CnnError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Invalid model description: {0}")]
    InvalidModel(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<candle_core::Error> for CnnError {
    fn from(e: candle_core::Error) -> Self {
        CnnError::Inference(e.to_string())
    }
}
