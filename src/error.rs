use thiserror::Error;

use crate::constants::GENERIC_ERROR_MESSAGE;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{message}")]
    RateLimited { message: String },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("Connection error: {0}")]
    Connectivity(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Builds the error for a non-success HTTP response.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => ClientError::Unauthorized { message },
            429 => ClientError::RateLimited { message },
            _ => ClientError::Api { status, message },
        }
    }

    /// Classifies a transport failure. Connect failures and timeouts are
    /// connectivity errors; anything else stays a request error.
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            ClientError::Connectivity(error.to_string())
        } else {
            ClientError::Request(error)
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::RateLimited { .. } => Some(429),
            ClientError::Unauthorized { .. } => Some(401),
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Status 429 is authoritative; the message match only covers servers
    /// that report throttling under another status.
    pub fn is_rate_limited(&self) -> bool {
        if self.status() == Some(429) {
            return true;
        }
        let message = self.to_string().to_lowercase();
        message.contains("too many requests") || message.contains("rate limit")
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Message suitable for showing next to a failed item.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            GENERIC_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{}: {}", field, msg),
                    None => format!("{}: invalid value ({})", field, e.code),
                })
            })
            .collect();
        messages.sort();
        ClientError::Validation(messages.join("; "))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
