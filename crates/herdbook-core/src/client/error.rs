use thiserror::Error;

use crate::config::{MSG_GENERIC_ERROR, MSG_NOT_FOUND, MSG_SERVER_ERROR, MSG_UNAUTHORIZED};

/// Errors that can occur while talking to the backend.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Unauthorized. Check the API token.")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error: {status}")]
    Server { status: u16 },

    #[error("API returned error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl ClientError {
    /// Maps a non-success HTTP status to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => ClientError::Unauthorized,
            404 => ClientError::NotFound(message.into()),
            500..=599 => ClientError::Server { status },
            _ => ClientError::Api {
                status,
                message: message.into(),
            },
        }
    }

    /// Message suitable for showing in the tree view.
    pub fn user_message(&self) -> &'static str {
        match self {
            ClientError::Unauthorized => MSG_UNAUTHORIZED,
            ClientError::NotFound(_) => MSG_NOT_FOUND,
            ClientError::Server { .. } => MSG_SERVER_ERROR,
            _ => MSG_GENERIC_ERROR,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ClientError::from_status(status.as_u16(), err.to_string()),
            None => ClientError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Parse(err.to_string())
    }
}
