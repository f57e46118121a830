//! Error types for the follower scanner

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the follower scanner
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing API key for {0}")]
    MissingApiKey(&'static str),

    #[error("Invalid engine configuration: {0}")]
    InvalidEngineConfig(String),

    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    // Upstream API errors
    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("{service} API error {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} rate limited")]
    RateLimited { service: &'static str },

    // Data errors
    #[error("No data found: {0}")]
    NoData(String),

    // Persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::Deserialization(e.to_string())
        } else {
            Error::Http(e.to_string())
        }
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Http("connection reset".to_string()).is_retryable());
        assert!(Error::RateLimited { service: "helius" }.is_retryable());
        assert!(Error::Api {
            service: "moralis",
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!Error::Api {
            service: "moralis",
            status: 401,
            body: "unauthorized".to_string()
        }
        .is_retryable());
        assert!(!Error::InvalidEngineConfig("window".to_string()).is_retryable());
    }
}
