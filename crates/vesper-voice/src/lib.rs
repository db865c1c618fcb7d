//! LiveKit integration for the Vesper voice client.
//!
//! Covers both sides of the credential exchange: the server mints LiveKit
//! join tokens with [`TokenIssuer`], and the client obtains them through the
//! [`CredentialProvider`] boundary, usually over HTTP with
//! [`HttpCredentialProvider`].
//!
//! The provider performs exactly one round trip per call. Retrying is the
//! session controller's job.

pub mod config;
pub mod credentials;
pub mod error;
pub mod issuer;

pub use config::{LiveKitConfig, DEV_LIVEKIT_API_KEY, DEV_LIVEKIT_API_SECRET, DEV_LIVEKIT_URL};
pub use credentials::{
    parse_credential_response, Credential, CredentialProvider, CredentialRequest,
    HttpCredentialProvider, SERVER_URL_FIELD_ALIASES, TOKEN_FIELD_ALIASES,
};
pub use error::{CredentialError, VoiceError};
pub use issuer::TokenIssuer;
