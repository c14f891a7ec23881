//! Twilio Media Streams WebSocket
//!
//! Twilio connects here from `<Connect><Stream url="wss://.../stream">`.
//! Inbound µ-law audio is forwarded to speech-to-text, and the resulting
//! transcripts drive a per-call [`CallSession`](crate::core::session::CallSession).
//! Synthesized replies and `clear` commands go back over the same socket.

mod handler;
pub mod messages;
pub mod sink;

pub use handler::{StreamParams, media_stream_handler};
pub use messages::{MediaRoute, TwilioInbound, TwilioOutbound};
pub use sink::TwilioMediaSink;
