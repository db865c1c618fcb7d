//! Error types for side-channel parsing.

/// Reasons a side-channel message was dropped.
#[derive(Debug, thiserror::Error)]
pub enum SideChannelError {
    /// Payload bytes were not valid UTF-8.
    #[error("side-channel payload is not UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    /// Payload was not JSON of the expected shape.
    #[error("malformed side-channel message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Well-formed message of a type this client does not consume.
    #[error("unexpected side-channel message type: {0}")]
    UnexpectedType(String),

    /// A citation message with no sources.
    #[error("citation message carried no sources")]
    EmptySources,
}
