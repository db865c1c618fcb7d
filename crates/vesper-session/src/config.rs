//! Client-side session configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_max_retries() -> u32 {
    2
}

fn default_backoff_base_ms() -> u64 {
    700
}

fn default_connect_watchdog_ms() -> u64 {
    15_000
}

fn default_agent_name() -> String {
    "voice-agent".to_string()
}

fn default_room_prefix() -> String {
    "voice-agent-room".to_string()
}

fn default_participant_prefix() -> String {
    "user".to_string()
}

/// Retry and watchdog tuning for connection attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the initial attempt before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before retry `n` is `backoff_base_ms × n`.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on one attempt while connecting or reconnecting.
    #[serde(default = "default_connect_watchdog_ms")]
    pub connect_watchdog_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            connect_watchdog_ms: default_connect_watchdog_ms(),
        }
    }
}

impl RetryPolicy {
    /// Delay before the `retry`-th retry (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        Duration::from_millis(self.backoff_base_ms.saturating_mul(u64::from(retry)))
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.connect_watchdog_ms)
    }
}

/// Settings for one [`crate::SessionController`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Agent the session asks to be dispatched into the room.
    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    /// Prefix of the generated room name.
    #[serde(default = "default_room_prefix")]
    pub room_prefix: String,

    /// Prefix of the generated participant name.
    #[serde(default = "default_participant_prefix")]
    pub participant_prefix: String,

    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            agent_name: default_agent_name(),
            room_prefix: default_room_prefix(),
            participant_prefix: default_participant_prefix(),
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_linearly() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(700));
        assert_eq!(policy.backoff(2), Duration::from_millis(1400));
        assert_eq!(policy.watchdog(), Duration::from_secs(15));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: SessionConfig = toml::from_str(
            r#"
            agent_name = "rag-agent"

            [retry]
            max_retries = 4
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.agent_name, "rag-agent");
        assert_eq!(config.room_prefix, "voice-agent-room");
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.retry.backoff_base_ms, 700);
    }
}
