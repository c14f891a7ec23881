//! Deepgram live streaming Speech-to-Text integration.
//!
//! The client streams raw call audio to Deepgram's `/v1/listen` WebSocket and
//! reports interim and final transcripts through the [`BaseSTT`] callbacks.
//!
//! - [`config`]: `DeepgramSTTConfig` and URL construction
//! - [`messages`]: server and control message types
//! - [`client`]: the `DeepgramSTT` client
//!
//! Telephony audio is sent as binary µ-law frames at 8 kHz, exactly as the
//! media gateway delivers it. No transcoding happens here.
//!
//! [`BaseSTT`]: crate::core::stt::BaseSTT

mod client;
mod config;
mod messages;


pub use client::DeepgramSTT;
pub use config::{DEEPGRAM_LISTEN_URL, DeepgramSTTConfig};
pub use messages::{
    Alternative, Channel, ControlMessage, DeepgramMessage, ErrorMessage, MetadataMessage,
    ResultsMessage, SpeechStartedMessage, UtteranceEndMessage,
};
