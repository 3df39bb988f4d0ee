use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::ChatError;
use crate::llm::chat::ChatPipeline;
use crate::llm::message::parse_history;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<ChatPipeline>,
}

#[derive(Serialize)]
struct ApiResponse {
    status: String,
}

/// Plain-text error response for failures that happen before streaming.
#[derive(Debug)]
pub struct ApiError(ChatError);

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Malformed histories and provider failures share one status
        let reason = match &self.0 {
            ChatError::Validation(msg) => msg.clone(),
            ChatError::Provider(e) => e.to_string(),
        };
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("Internal Server Error: {}", reason),
        )
            .into_response()
    }
}

/// Create and configure the API router
pub fn create_api(pipeline: ChatPipeline) -> Router {
    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let conversation = parse_history(&body).map_err(|e| {
        error!("Rejected chat request: {}", e);
        e
    })?;
    info!(messages = conversation.len(), "Chat request received");

    let relay = state.pipeline.respond(&conversation).await.map_err(|e| {
        error!("Error occurred during the request: {}", e);
        e
    })?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(relay),
    )
        .into_response())
}

async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse {
        status: "Server is running and healthy".to_string(),
    })
}
