use std::time::Duration;

use thiserror::Error;

/// Failure classes that propagate out of the request layer.
///
/// Offline and bridge-unavailable conditions never show up here: the
/// connection coordinator resolves those into `ConnectionState` capability
/// flags before any data call is attempted.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("bridge error: {0}")]
    Protocol(String),
}

impl BridgeError {
    /// True for the server-side error string case ("note was not found: 42"),
    /// which callers present as a transient per-operation failure rather than
    /// a connection problem.
    pub fn is_protocol(&self) -> bool {
        matches!(self, BridgeError::Protocol(_))
    }
}

#[derive(Error, Debug)]
pub enum AnkiBridgeError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("AI API key not found, add it in settings")]
    MissingApiKey,

    #[error("AI provider returned no content")]
    EmptyAiResponse,

    #[error("AnkiBridgeError: {0}")]
    Custom(String),
}

impl From<std::io::Error> for AnkiBridgeError {
    fn from(error: std::io::Error) -> Self {
        AnkiBridgeError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for AnkiBridgeError {
    fn from(error: reqwest::Error) -> Self {
        AnkiBridgeError::Reqwest(Box::new(error))
    }
}
