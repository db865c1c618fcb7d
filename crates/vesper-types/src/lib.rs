//! Shared types for the Vesper voice client.
//!
//! This crate provides the foundational types used across all Vesper crates:
//! conversation roles, connection states, disconnect reasons, transcript
//! segments and retrieval citations.
//!
//! No crate in the workspace depends on anything *except* `vesper-types` for
//! cross-cutting type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

mod citation;
mod transcript;

pub use citation::Citation;
pub use transcript::TranscriptSegment;

/// The party a transcript fragment belongs to.
///
/// The declaration order is significant: when two segments share a
/// timestamp, the agent's segment sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The remote AI agent.
    Agent,
    /// The local human participant.
    User,
}

impl Role {
    /// Returns the string label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of one media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No session is active.
    #[default]
    Disconnected,
    /// Fetching credentials and joining the media session.
    Connecting,
    /// The media session is live.
    Connected,
    /// The live session dropped and is being re-established.
    Reconnecting,
    /// The retry budget was exhausted. A manual `start()` leaves this state.
    Failed,
}

impl ConnectionState {
    /// Returns the string label for this state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        }
    }

    /// Whether a session attempt is currently underway or live.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Reconnecting)
    }

    /// Whether the watchdog applies to this state.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the media transport reported a disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum DisconnectReason {
    /// The remote side hung up cleanly.
    RemoteHangup,
    /// The server closed the room.
    RoomClosed,
    /// The server removed this participant from the room.
    ParticipantRemoved,
    /// The connection was lost and the transport gave up recovering it.
    TransportFailure(String),
}

impl DisconnectReason {
    /// Voluntary disconnects end the session without consuming the retry
    /// budget.
    pub fn is_voluntary(&self) -> bool {
        !matches!(self, Self::TransportFailure(_))
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteHangup => f.write_str("remote hangup"),
            Self::RoomClosed => f.write_str("room closed"),
            Self::ParticipantRemoved => f.write_str("participant removed"),
            Self::TransportFailure(detail) => write!(f, "transport failure: {detail}"),
        }
    }
}
