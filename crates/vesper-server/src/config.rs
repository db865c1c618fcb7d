//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;
use vesper_voice::config::LiveKitConfig;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// LiveKit credentials used to mint join tokens.
    #[serde(default)]
    pub livekit: LiveKitConfig,

    #[serde(default)]
    pub prompt: PromptConfig,

    #[serde(default)]
    pub cors: CorsConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "vesper_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Where the agent's system prompt is stored.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_prompt_path")]
    pub path: String,
}

/// Browser origins allowed to call the API.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_prompt_path() -> String {
    "system_prompt.json".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    [
        "http://localhost:5173",
        "http://localhost:3000",
        "http://localhost",
        "http://127.0.0.1",
        "http://127.0.0.1:3000",
    ]
    .iter()
    .map(|o| o.to_string())
    .collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            path: default_prompt_path(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `VESPER_HOST` overrides `server.host`
/// - `VESPER_PORT` overrides `server.port`
/// - `VESPER_LOG_LEVEL` overrides `logging.level`
/// - `VESPER_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `VESPER_PROMPT_FILE` overrides `prompt.path`
/// - `LIVEKIT_URL`, `LIVEKIT_API_KEY` and `LIVEKIT_API_SECRET` override the
///   matching `livekit` fields
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies overrides looked up through `var`. Unparsable host or port values
/// are ignored.
pub fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("VESPER_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("VESPER_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = var("VESPER_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("VESPER_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(path) = var("VESPER_PROMPT_FILE") {
        config.prompt.path = path;
    }
    if let Some(url) = var("LIVEKIT_URL") {
        config.livekit.url = url;
    }
    if let Some(key) = var("LIVEKIT_API_KEY") {
        config.livekit.api_key = key;
    }
    if let Some(secret) = var("LIVEKIT_API_SECRET") {
        config.livekit.api_secret = secret;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.prompt.path, "system_prompt.json");
        assert_eq!(config.livekit.url, "ws://localhost:7880");
        assert_eq!(config.cors.allowed_origins.len(), 5);
    }

    #[test]
    fn sections_parse_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9100

            [livekit]
            url = "wss://lk.example.com"
            api_key = "key"
            api_secret = "shh"

            [cors]
            allowed_origins = ["https://app.example.com"]
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.livekit.api_key, "key");
        assert_eq!(config.livekit.token_ttl_seconds, 3600);
        assert_eq!(config.cors.allowed_origins, vec!["https://app.example.com"]);
    }

    #[test]
    fn env_overrides_take_precedence() {
        let env: HashMap<&str, &str> = [
            ("VESPER_PORT", "7001"),
            ("VESPER_HOST", "not-an-ip"),
            ("VESPER_LOG_JSON", "1"),
            ("VESPER_PROMPT_FILE", "/tmp/prompt.json"),
            ("LIVEKIT_API_SECRET", "override"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.port, 7001);
        assert_eq!(config.server.host, default_host());
        assert!(config.logging.json);
        assert_eq!(config.prompt.path, "/tmp/prompt.json");
        assert_eq!(config.livekit.api_secret, "override");
        assert_eq!(config.livekit.api_key, "devkey");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Some("/nonexistent/vesper.toml")).unwrap();
        assert_eq!(config.server.port, default_port());
    }
}
