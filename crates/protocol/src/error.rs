//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while framing or decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The peer closed the stream (a zero-byte read).
    #[error("Peer disconnected")]
    Disconnected,

    #[error("Frame length {0} exceeds limit of {max} bytes", max = crate::MAX_FRAME_LEN)]
    FrameTooLarge(usize),

    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid handshake line: {0:?}")]
    InvalidHandshake(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether this error ends the stream, as opposed to a single bad payload.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ProtocolError::Malformed(_))
    }
}
