//! Error types for the Voxweave TTS pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    #[error("Generation failed: {0}")]
    GenerationError(String),

    #[error("Audio error: {0}")]
    AudioError(String),

    #[error("Merge failed: {0}")]
    MergeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::AudioError(e.to_string())
    }
}

impl From<symphonia::core::errors::Error> for Error {
    fn from(e: symphonia::core::errors::Error) -> Self {
        Error::AudioError(e.to_string())
    }
}
