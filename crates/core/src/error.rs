//! Payload error model.

use thiserror::Error;

/// Result type for payload construction.
pub type PayloadResult<T> = Result<T, PayloadError>;

/// Failure while turning a typed Rust value into a [`Value`](crate::Value).
///
/// Normalization itself has no error type: every input produces output.
/// This only covers the entry points that go through `serde`.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The value's `Serialize` impl rejected it (e.g. a map with non-string keys).
    #[error("payload could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}
