//! Error types for nowserving.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Backend errors
    #[error("Backend request failed: {message}")]
    Http { message: String },

    #[error("Backend returned status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Malformed backend payload: {message}")]
    Payload { message: String },

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    // Audio errors
    #[error("Audio output unavailable: {message}")]
    AudioUnavailable { message: String },

    #[error("Audio decoding failed: {message}")]
    AudioDecode { message: String },

    #[error("Audio playback failed: {message}")]
    AudioPlayback { message: String },

    // Local speech errors
    #[error("Speech tool not found: {tool}")]
    SpeechToolNotFound { tool: String },

    #[error("Local speech failed: {message}")]
    SpeechFailed { message: String },

    // Video player errors
    #[error("Video player error: {message}")]
    Video { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::Http {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Payload {
            message: err.to_string(),
        }
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, MonitorError>;
