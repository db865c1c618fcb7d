use crate::config::LiveKitConfig;
use crate::credentials::{Credential, CredentialProvider, CredentialRequest};
use crate::error::{CredentialError, VoiceError};
use async_trait::async_trait;
use livekit_api::access_token::{AccessToken, VideoGrants};
use std::time::Duration;
use tracing::info;

/// Mints LiveKit join tokens.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    config: LiveKitConfig,
}

impl TokenIssuer {
    pub fn new(config: LiveKitConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    /// Returns the URL clients should join with the minted token.
    pub fn server_url(&self) -> &str {
        self.config.client_url()
    }

    /// Generates a join token for `participant_name` in `room_name`.
    ///
    /// When `agent_name` is given, it is embedded in the token metadata so
    /// the agent worker knows which agent the participant asked for.
    pub fn generate_join_token(
        &self,
        room_name: &str,
        participant_name: &str,
        agent_name: Option<&str>,
    ) -> Result<String, VoiceError> {
        if !self.is_enabled() {
            return Err(VoiceError::Config(
                "LiveKit url, api key and api secret must be set".to_string(),
            ));
        }
        if room_name.trim().is_empty() {
            return Err(VoiceError::InvalidRequest(
                "room_name must not be empty".to_string(),
            ));
        }
        if participant_name.trim().is_empty() {
            return Err(VoiceError::InvalidRequest(
                "participant_name must not be empty".to_string(),
            ));
        }

        let mut token = AccessToken::with_api_key(&self.config.api_key, &self.config.api_secret)
            .with_identity(participant_name)
            .with_name(participant_name)
            .with_grants(VideoGrants {
                room_join: true,
                room: room_name.to_string(),
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
                ..Default::default()
            })
            .with_ttl(Duration::from_secs(self.config.token_ttl_seconds));

        if let Some(agent) = agent_name.map(str::trim).filter(|a| !a.is_empty()) {
            let metadata = serde_json::json!({ "agent_name": agent }).to_string();
            token = token.with_metadata(&metadata);
        }

        let jwt = token.to_jwt()?;
        info!(
            room = room_name,
            participant = participant_name,
            agent = agent_name.unwrap_or(""),
            "issued join token"
        );
        Ok(jwt)
    }
}

#[async_trait]
impl CredentialProvider for TokenIssuer {
    async fn fetch_credential(
        &self,
        request: &CredentialRequest,
    ) -> Result<Credential, CredentialError> {
        request.validate()?;
        let participant_token = self.generate_join_token(
            &request.room_name,
            &request.participant_name,
            Some(&request.agent_name),
        )?;
        Ok(Credential {
            participant_token,
            server_url: self.server_url().to_string(),
        })
    }
}
