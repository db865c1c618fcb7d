//! The Credential Provider boundary.
//!
//! Maps `(room_name, participant_name, agent_name)` to a participant token
//! and the media server URL to join with it.

use crate::error::CredentialError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Response fields accepted as the participant token, in priority order.
pub const TOKEN_FIELD_ALIASES: [&str; 3] = ["participant_token", "participantToken", "token"];

/// Response fields accepted as the server URL, in priority order.
pub const SERVER_URL_FIELD_ALIASES: [&str; 2] = ["server_url", "livekit_url"];

/// Identity a credential is requested for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialRequest {
    pub room_name: String,
    pub participant_name: String,
    pub agent_name: String,
}

impl CredentialRequest {
    pub fn new(
        room_name: impl Into<String>,
        participant_name: impl Into<String>,
        agent_name: impl Into<String>,
    ) -> Self {
        Self {
            room_name: room_name.into(),
            participant_name: participant_name.into(),
            agent_name: agent_name.into(),
        }
    }

    /// All three identifiers must be non-empty.
    pub fn validate(&self) -> Result<(), CredentialError> {
        for (field, value) in [
            ("room_name", &self.room_name),
            ("participant_name", &self.participant_name),
            ("agent_name", &self.agent_name),
        ] {
            if value.trim().is_empty() {
                return Err(CredentialError::InvalidRequest(format!(
                    "{field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// A short-lived connection credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub participant_token: String,
    pub server_url: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("participant_token", &"[REDACTED]")
            .field("server_url", &self.server_url)
            .finish()
    }
}

/// Source of connection credentials.
///
/// Implementations perform at most one round trip and never retry.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn fetch_credential(
        &self,
        request: &CredentialRequest,
    ) -> Result<Credential, CredentialError>;
}

/// Extracts a [`Credential`] from a credential service response body.
///
/// The first non-empty alias wins for each field. A missing or empty token
/// or server URL is a hard error.
pub fn parse_credential_response(body: &Value) -> Result<Credential, CredentialError> {
    let object = body
        .as_object()
        .ok_or_else(|| CredentialError::Malformed("expected a JSON object".to_string()))?;

    let pick = |aliases: &[&str]| {
        aliases
            .iter()
            .filter_map(|alias| object.get(*alias).and_then(Value::as_str))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_string)
    };

    match (pick(&TOKEN_FIELD_ALIASES), pick(&SERVER_URL_FIELD_ALIASES)) {
        (Some(participant_token), Some(server_url)) => Ok(Credential {
            participant_token,
            server_url,
        }),
        _ => Err(CredentialError::MissingFields),
    }
}

/// Fetches credentials from an HTTP token endpoint.
///
/// Sends `POST <endpoint>` with a JSON body of `room_name`,
/// `participant_name` and `agent_name`.
#[derive(Debug, Clone)]
pub struct HttpCredentialProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCredentialProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CredentialProvider for HttpCredentialProvider {
    async fn fetch_credential(
        &self,
        request: &CredentialRequest,
    ) -> Result<Credential, CredentialError> {
        request.validate()?;

        debug!(
            endpoint = %self.endpoint,
            room = %request.room_name,
            participant = %request.participant_name,
            "requesting connection credential"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| CredentialError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CredentialError::Malformed(e.to_string()))?;

        parse_credential_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_primary_aliases() {
        let credential =
            parse_credential_response(&json!({"participant_token": "t1", "server_url": "wss://x"}))
                .expect("should parse");
        assert_eq!(credential.participant_token, "t1");
        assert_eq!(credential.server_url, "wss://x");
    }

    #[test]
    fn accepts_legacy_aliases() {
        let credential =
            parse_credential_response(&json!({"token": "jwt", "livekit_url": "ws://lk:7880"}))
                .expect("should parse");
        assert_eq!(credential.participant_token, "jwt");
        assert_eq!(credential.server_url, "ws://lk:7880");

        let credential =
            parse_credential_response(&json!({"participantToken": "camel", "server_url": "wss://y"}))
                .expect("should parse");
        assert_eq!(credential.participant_token, "camel");
    }

    #[test]
    fn empty_alias_falls_through_to_next() {
        let credential = parse_credential_response(
            &json!({"participant_token": "", "token": "fallback", "server_url": "wss://x"}),
        )
        .expect("should parse");
        assert_eq!(credential.participant_token, "fallback");
    }

    #[test]
    fn missing_fields_is_an_error() {
        let err = parse_credential_response(&json!({"participant_token": "t1"})).unwrap_err();
        assert_eq!(err, CredentialError::MissingFields);
        assert_eq!(err.to_string(), "missing connection fields");

        let err = parse_credential_response(&json!({"server_url": "wss://x", "token": "  "}))
            .unwrap_err();
        assert_eq!(err, CredentialError::MissingFields);
    }

    #[test]
    fn non_object_body_is_malformed() {
        let err = parse_credential_response(&json!(["t1", "wss://x"])).unwrap_err();
        assert!(matches!(err, CredentialError::Malformed(_)));
    }

    #[test]
    fn request_requires_all_identifiers() {
        assert!(CredentialRequest::new("r1", "p1", "agent").validate().is_ok());
        let err = CredentialRequest::new("r1", "", "agent").validate().unwrap_err();
        assert!(matches!(err, CredentialError::InvalidRequest(msg) if msg.contains("participant_name")));
    }

    #[test]
    fn credential_debug_hides_token() {
        let credential = Credential {
            participant_token: "very-secret-jwt".into(),
            server_url: "wss://x".into(),
        };
        assert!(!format!("{credential:?}").contains("very-secret-jwt"));
    }
}
