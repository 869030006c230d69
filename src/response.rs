//! Mapping of handler outcomes to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::{CompletionError, ContextError};

pub const NO_PROMPT_MESSAGE: &str = "No prompt provided";
pub const QUOTA_EXCEEDED_MESSAGE: &str =
    "You have exceeded your API quota. Please check your plan and billing details.";

/// Body of every failed request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A request failure, already classified for the client.
#[derive(Debug)]
pub enum ApiError {
    /// Prompt missing, blank, or not a string.
    Validation,
    Context(ContextError),
    Completion(CompletionError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation => StatusCode::BAD_REQUEST,
            ApiError::Context(ContextError::NotFound { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Context(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Completion(CompletionError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Completion(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Quota failures hide the upstream text.
    pub fn message(&self) -> String {
        match self {
            ApiError::Validation => NO_PROMPT_MESSAGE.to_string(),
            ApiError::Context(err) => err.to_string(),
            ApiError::Completion(CompletionError::RateLimited(_)) => {
                QUOTA_EXCEEDED_MESSAGE.to_string()
            }
            ApiError::Completion(err) => err.to_string(),
        }
    }
}

impl From<ContextError> for ApiError {
    fn from(err: ContextError) -> Self {
        ApiError::Context(err)
    }
}

impl From<CompletionError> for ApiError {
    fn from(err: CompletionError) -> Self {
        ApiError::Completion(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
