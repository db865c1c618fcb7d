use serde::{Deserialize, Serialize};
use std::fmt;

/// URL of a local LiveKit server started with `livekit-server --dev`.
pub const DEV_LIVEKIT_URL: &str = "ws://localhost:7880";
/// API key of a local LiveKit dev server.
pub const DEV_LIVEKIT_API_KEY: &str = "devkey";
/// API secret of a local LiveKit dev server.
pub const DEV_LIVEKIT_API_SECRET: &str = "secret";

fn default_url() -> String {
    DEV_LIVEKIT_URL.to_string()
}

fn default_api_key() -> String {
    DEV_LIVEKIT_API_KEY.to_string()
}

fn default_api_secret() -> String {
    DEV_LIVEKIT_API_SECRET.to_string()
}

fn default_token_ttl_seconds() -> u64 {
    3600
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LiveKitConfig {
    /// Server URL the backend uses.
    #[serde(default = "default_url")]
    pub url: String,
    /// Client-facing server URL handed out with tokens. Falls back to `url`
    /// when empty.
    #[serde(default)]
    pub public_url: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(skip_serializing, default = "default_api_secret")]
    pub api_secret: String,
    /// JWT token TTL in seconds for LiveKit join tokens. Default: 3600 (1 hour).
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
}

impl Default for LiveKitConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            public_url: String::new(),
            api_key: default_api_key(),
            api_secret: default_api_secret(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

impl fmt::Debug for LiveKitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveKitConfig")
            .field("url", &self.url)
            .field("public_url", &self.public_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish()
    }
}

impl LiveKitConfig {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            public_url: String::new(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }

    /// Whether enough is configured to mint tokens.
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
            && !self.api_key.trim().is_empty()
            && !self.api_secret.trim().is_empty()
    }

    /// Returns the URL clients should connect to.
    pub fn client_url(&self) -> &str {
        if self.public_url.trim().is_empty() {
            &self.url
        } else {
            &self.public_url
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secret() {
        let config = LiveKitConfig::new(DEV_LIVEKIT_URL, "key", "super-secret");
        let rendered = format!("{config:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn client_url_prefers_public_url() {
        let mut config = LiveKitConfig::default();
        assert_eq!(config.client_url(), DEV_LIVEKIT_URL);
        config.public_url = "wss://voice.example.com".into();
        assert_eq!(config.client_url(), "wss://voice.example.com");
    }

    #[test]
    fn empty_secret_is_not_configured() {
        let config = LiveKitConfig::new(DEV_LIVEKIT_URL, "key", " ");
        assert!(!config.is_configured());
        assert!(LiveKitConfig::default().is_configured());
    }
}
