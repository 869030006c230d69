use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or running the service.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}

/// Failures while loading the static context file.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Context file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Malformed context record on line {line_number}: {cause} (line: {raw_line})")]
    Malformed {
        line_number: usize,
        raw_line: String,
        #[source]
        cause: serde_json::Error,
    },

    #[error("Failed to read context file: {cause}")]
    Io {
        #[source]
        cause: std::io::Error,
    },
}

/// Classified failures of an outbound completion call.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Upstream API quota exceeded: {0}")]
    RateLimited(String),

    #[error("Failed to reach the completion API: {0}")]
    Transport(String),

    #[error("Completion API returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Completion failed: {0}")]
    Unknown(String),
}

impl CompletionError {
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        CompletionError::Upstream {
            status,
            message: message.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        CompletionError::Unknown(message.into())
    }

    /// Whether another attempt could succeed. Quota and client errors are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Transport(_) => true,
            CompletionError::Upstream { status, .. } => *status >= 500,
            CompletionError::RateLimited(_) | CompletionError::Unknown(_) => false,
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            CompletionError::Transport(err.to_string())
        } else if err.is_decode() {
            CompletionError::Unknown(format!("invalid response body: {err}"))
        } else if let Some(status) = err.status() {
            CompletionError::upstream(status.as_u16(), err.to_string())
        } else {
            CompletionError::Unknown(err.to_string())
        }
    }
}
