//! Join token endpoint.

use crate::api::ApiError;
use crate::AppState;
use axum::extract::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn default_room_name() -> String {
    "voice-agent-room".to_string()
}

fn default_participant_name() -> String {
    "user".to_string()
}

/// Request body for `POST /api/token`.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default = "default_room_name")]
    pub room_name: String,
    #[serde(default = "default_participant_name")]
    pub participant_name: String,
    /// Agent to dispatch into the room, carried in the token metadata.
    #[serde(default)]
    pub agent_name: Option<String>,
}

/// Response body for `POST /api/token`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub participant_token: String,
    pub server_url: String,
}

/// Handler for `POST /api/token`.
pub async fn create_token_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.issuer.generate_join_token(
        &payload.room_name,
        &payload.participant_name,
        payload.agent_name.as_deref(),
    );

    let participant_token = match token {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(room = %payload.room_name, "token request refused: {}", e);
            return Err(e.into());
        }
    };

    Ok(Json(TokenResponse {
        participant_token,
        server_url: state.issuer.server_url().to_string(),
    }))
}
