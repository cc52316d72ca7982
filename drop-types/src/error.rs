//! Wire-level error types.

/// Errors produced while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The payload is not valid JSON, or a known message kind failed to
    /// deserialize into its typed form.
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload has no string `type` discriminator.
    #[error("message has no type discriminator")]
    MissingType,
}
