use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("LiveKit token error: {0}")]
    LiveKit(#[from] livekit_api::access_token::AccessTokenError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid token request: {0}")]
    InvalidRequest(String),
}

/// Failure to obtain a connection credential.
///
/// Cloneable so session snapshots can carry it as the last error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// One of the request identifiers was empty.
    #[error("invalid credential request: {0}")]
    InvalidRequest(String),

    /// The network round trip failed.
    #[error("credential request failed: {0}")]
    Transport(String),

    /// The credential service answered with a non-success status.
    #[error("credential service returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not a JSON object.
    #[error("malformed credential response: {0}")]
    Malformed(String),

    /// A token or server URL field was absent or empty.
    #[error("missing connection fields")]
    MissingFields,

    /// Local token minting failed.
    #[error("credential issuance failed: {0}")]
    Issuance(String),
}

impl From<VoiceError> for CredentialError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::InvalidRequest(msg) => CredentialError::InvalidRequest(msg),
            other => CredentialError::Issuance(other.to_string()),
        }
    }
}
