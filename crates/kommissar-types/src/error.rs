//! Error types for event decoding and validation.

/// Errors that can occur while decoding or validating an [`Event`](crate::Event).
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// A classification attribute the index requires is empty.
    #[error("event is missing required field `{0}`")]
    MissingField(&'static str),

    /// The payload is not a valid watch document.
    #[error("event decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
