//! Vesper backend: join token issuance and system prompt storage for the
//! voice client.

pub mod api;
pub mod api_prompt;
pub mod api_token;
pub mod config;

use api::ApiError;
use api_prompt::PromptStore;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use vesper_voice::TokenIssuer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<TokenIssuer>,
    pub prompts: PromptStore,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
}

/// Maximum request body size (64 KiB).
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("no such route".to_string())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_origins);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/token", post(api_token::create_token_handler))
        .route(
            "/api/prompt",
            get(api_prompt::get_prompt_handler).put(api_prompt::update_prompt_handler),
        )
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(Extension(Arc::new(state)))
}
