//! The completion endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderName, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use tracing::{debug, error, info_span, warn, Instrument};
use uuid::Uuid;

use crate::context::ContextStore;
use crate::provider::CompletionClient;
use crate::response::ApiError;
use crate::PromptRequest;

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn CompletionClient>,
    pub context: Arc<ContextStore>,
}

impl AppState {
    pub fn new(client: Arc<dyn CompletionClient>, context: ContextStore) -> Self {
        Self {
            client,
            context: Arc::new(context),
        }
    }
}

/// `POST /api/gpt/`: validate, load context, complete.
pub async fn complete(
    State(state): State<AppState>,
    body: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<String>, ApiError> {
    let span = info_span!("completion", request_id = %Uuid::new_v4());
    handle(state, body).instrument(span).await
}

async fn handle(
    state: AppState,
    body: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<String>, ApiError> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(%rejection, "Rejected request body");
            return Err(ApiError::Validation);
        }
    };
    let prompt = request.prompt().ok_or(ApiError::Validation)?;

    let context = state.context.load().map_err(|err| {
        error!(path = %state.context.path().display(), error = %err, "Failed to load context");
        err
    })?;

    let reply = state
        .client
        .complete(&context, prompt)
        .await
        .map_err(|err| {
            warn!(error = %err, "Completion failed");
            err
        })?;

    debug!(reply_len = reply.len(), "Completion succeeded");
    Ok(Json(reply))
}

/// `OPTIONS /api/gpt/`: fixed CORS pre-flight answer.
pub async fn preflight() -> impl IntoResponse {
    const HEADERS: [(HeaderName, &str); 3] = [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
        (
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            "Content-Type, Authorization",
        ),
    ];
    (StatusCode::OK, HEADERS)
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
