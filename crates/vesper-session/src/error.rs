//! Error types for session control.

use thiserror::Error;
use vesper_voice::CredentialError;

/// Failures surfaced through the session's `last_error`.
///
/// Cloneable so state snapshots can carry it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The credential provider failed or returned incomplete data.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The watchdog fired before the attempt connected.
    #[error("connection attempt timed out after {timeout_ms} ms")]
    ConnectionTimeout { timeout_ms: u64 },

    /// The media transport rejected or failed the join.
    #[error("failed to join media session: {0}")]
    Join(#[from] TransportError),

    /// The live session dropped and the transport gave up.
    #[error("media session dropped: {0}")]
    TransportDropped(String),

    /// The retry budget is exhausted. Only a manual `start()` recovers.
    #[error("connection failed after {attempts} attempts: {last}")]
    ConnectionFailed {
        attempts: u32,
        last: Box<SessionError>,
    },

    /// The session was ended before it connected.
    #[error("session ended before it connected")]
    Ended,
}

/// Errors reported by a [`crate::MediaTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The media server refused the credential.
    #[error("join rejected: {0}")]
    Rejected(String),

    /// Signaling or media connectivity failed.
    #[error("transport error: {0}")]
    Network(String),
}

/// Microphone failures. Local to push-to-talk; never affects connectivity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("input device not found: {0}")]
    NotFound(String),

    #[error("microphone error: {0}")]
    Device(String),

    /// The session stopped being connected while the microphone was being
    /// enabled.
    #[error("microphone enable cancelled")]
    Cancelled,
}
