//! Outbound side of the Twilio media stream.

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::messages::{MediaRoute, TwilioOutbound};
use crate::core::session::{MediaSink, SinkError};

/// Queues frames for the socket writer task without ever waiting.
pub struct TwilioMediaSink {
    stream_sid: String,
    routes: mpsc::Sender<MediaRoute>,
    closed: AtomicBool,
}

impl TwilioMediaSink {
    pub fn new(stream_sid: impl Into<String>, routes: mpsc::Sender<MediaRoute>) -> Self {
        Self {
            stream_sid: stream_sid.into(),
            routes,
            closed: AtomicBool::new(false),
        }
    }

    pub fn stream_sid(&self) -> &str {
        &self.stream_sid
    }

    fn push(&self, message: TwilioOutbound) -> Result<(), SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }
        if self.stream_sid.is_empty() {
            return Err(SinkError::NotStarted);
        }
        self.routes
            .try_send(MediaRoute::Outgoing(message))
            .map_err(|e| match e {
                TrySendError::Full(_) => SinkError::Full,
                TrySendError::Closed(_) => SinkError::Closed,
            })
    }
}

impl MediaSink for TwilioMediaSink {
    fn send_audio(&self, chunk: Bytes) -> Result<(), SinkError> {
        self.push(TwilioOutbound::media(&self.stream_sid, &chunk))
    }

    fn clear(&self) -> Result<(), SinkError> {
        self.push(TwilioOutbound::clear(&self.stream_sid))
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.routes.try_send(MediaRoute::Close);
    }
}
