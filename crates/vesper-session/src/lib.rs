//! Session connection control for the Vesper voice client.
//!
//! [`Session`] is a pure state machine: every input goes through
//! [`Session::apply`], which returns the side effects to perform.
//! [`SessionController`] executes those effects on a Tokio runtime:
//! credential fetches and joins run as tasks, the connect watchdog and
//! retry backoff run as timers, and every task result comes back as another
//! [`Input`]. Results from superseded attempts are recognized by their epoch
//! and ignored, so nothing fires after `end()`.
//!
//! Live transcription and citation events from the media session are routed
//! into a [`vesper_transcript::Reconciler`] and published as
//! [`StreamSnapshot`]s. [`PushToTalk`] gates the local microphone on the
//! session being connected.

pub mod config;
pub mod controller;
pub mod error;
pub mod identity;
pub mod machine;
pub mod ptt;
pub mod transport;

pub use config::{RetryPolicy, SessionConfig};
pub use controller::{SessionController, StreamSnapshot};
pub use error::{DeviceError, SessionError, TransportError};
pub use identity::SessionIdentity;
pub use machine::{ConnectionEvent, Effect, Input, Session, SessionSnapshot, TimerKind};
pub use ptt::{Microphone, PushToTalk, TalkInput};
pub use transport::{MediaTransport, TranscriptionFragment, TransportEvent, TransportEvents};
