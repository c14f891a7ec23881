//! Outbound media seam.

use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The outbound queue is full; the frame was dropped
    #[error("Outbound queue full")]
    Full,
    #[error("Media channel closed")]
    Closed,
    /// The stream has not been identified yet
    #[error("Media stream not started")]
    NotStarted,
}

/// Non-blocking outbound side of the telephony media channel.
///
/// Every method returns immediately. Failures are reported so the caller can
/// log them; frames are never retried.
pub trait MediaSink: Send + Sync {
    /// Queue one chunk of synthesized audio for playback.
    fn send_audio(&self, chunk: Bytes) -> Result<(), SinkError>;

    /// Flush audio the gateway has buffered but not yet played.
    fn clear(&self) -> Result<(), SinkError>;

    /// Close the media channel.
    fn close(&self);
}
