//! System prompt storage and endpoints.
//!
//! The prompt lives in a small JSON file so the agent worker can read the
//! newest version at the start of every call.

use crate::api::ApiError;
use crate::AppState;
use axum::extract::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Returned when no prompt has been stored or the file cannot be parsed.
pub const FALLBACK_PROMPT: &str = "You are a helpful voice AI assistant.";

/// Written on first startup.
pub const DEFAULT_PROMPT: &str = "You are a helpful voice AI assistant. \
When the user asks a factual question, use the search_knowledge_base tool \
to find relevant information from the uploaded documents. \
Always provide clear, concise, and conversational answers. \
If you use information from the knowledge base, mention that you found it in the documents.";

/// Request and response body for the prompt endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBody {
    pub system_prompt: String,
}

/// File-backed system prompt.
#[derive(Debug, Clone)]
pub struct PromptStore {
    path: PathBuf,
}

impl PromptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes [`DEFAULT_PROMPT`] if no prompt file exists yet. Returns
    /// whether a file was created.
    pub fn ensure_initialized(&self) -> std::io::Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.write(DEFAULT_PROMPT)?;
        tracing::info!(path = %self.path.display(), "initialized default system prompt");
        Ok(true)
    }

    /// Reads the stored prompt, or [`FALLBACK_PROMPT`] when the file is
    /// missing or unreadable.
    pub fn read(&self) -> String {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), "failed to read prompt file: {}", e);
                }
                return FALLBACK_PROMPT.to_string();
            }
        };
        match serde_json::from_str::<PromptBody>(&contents) {
            Ok(body) => body.system_prompt,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "prompt file is not valid: {}", e);
                FALLBACK_PROMPT.to_string()
            }
        }
    }

    pub fn write(&self, prompt: &str) -> std::io::Result<()> {
        let body = PromptBody {
            system_prompt: prompt.to_string(),
        };
        let json = serde_json::to_string_pretty(&body)?;
        std::fs::write(&self.path, json)
    }
}

/// Handler for `GET /api/prompt`.
pub async fn get_prompt_handler(Extension(state): Extension<Arc<AppState>>) -> Json<PromptBody> {
    let store = state.prompts.clone();
    let system_prompt = tokio::task::spawn_blocking(move || store.read())
        .await
        .unwrap_or_else(|_| FALLBACK_PROMPT.to_string());
    Json(PromptBody { system_prompt })
}

/// Handler for `PUT /api/prompt`.
pub async fn update_prompt_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<PromptBody>,
) -> Result<Json<PromptBody>, ApiError> {
    if payload.system_prompt.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "system_prompt must not be empty".to_string(),
        ));
    }

    let store = state.prompts.clone();
    let prompt = payload.system_prompt.clone();
    tokio::task::spawn_blocking(move || store.write(&prompt))
        .await
        .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))?
        .map_err(|e| ApiError::InternalServerError(format!("failed to store prompt: {}", e)))?;

    tracing::info!(chars = payload.system_prompt.len(), "system prompt updated");
    Ok(Json(payload))
}
