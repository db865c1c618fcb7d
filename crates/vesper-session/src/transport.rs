//! Boundary to the underlying real-time media stack.
//!
//! The controller never touches WebRTC directly. An implementation joins
//! the room with the fetched credential and forwards room events through an
//! unbounded channel, in the order the media stack reported them.

use crate::error::TransportError;
use crate::identity::SessionIdentity;
use async_trait::async_trait;
use tokio::sync::mpsc;
use vesper_types::{DisconnectReason, Role};
use vesper_voice::Credential;

/// One transcription result inside a [`TransportEvent::Transcription`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionFragment {
    pub id: String,
    pub text: String,
    pub is_final: bool,
}

/// Events a joined media session reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The transport lost connectivity and is trying to recover on its own.
    Reconnecting,
    /// The transport recovered.
    Reconnected,
    /// The session is gone.
    Disconnected(DisconnectReason),
    /// Speech-to-text results for one party.
    Transcription {
        role: Role,
        fragments: Vec<TranscriptionFragment>,
    },
    /// A side-channel data packet.
    Data {
        topic: Option<String>,
        payload: Vec<u8>,
    },
}

/// Receiving half of a joined session's event stream. The stream ending
/// counts as a transport failure.
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Joins the media session. Dropping the returned future abandons the
    /// join.
    async fn join(
        &self,
        credential: &Credential,
        identity: &SessionIdentity,
    ) -> Result<TransportEvents, TransportError>;

    /// Tears down any joined or partially joined session. Must not block and
    /// must be safe to call when nothing is joined.
    fn leave(&self);
}
