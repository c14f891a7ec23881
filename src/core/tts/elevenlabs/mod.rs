//! ElevenLabs streaming Text-to-Speech integration.
//!
//! Uses the `stream-input` WebSocket API so audio starts flowing before the
//! whole utterance is rendered. Output is requested as `ulaw_8000`, which the
//! telephony gateway plays without transcoding.

mod config;
mod messages;
mod provider;


pub use config::{ELEVENLABS_TTS_URL, ElevenLabsTTSConfig};
pub use messages::{AudioResponse, CloseConnection, InitializeConnection, SendText};
pub use provider::ElevenLabsTTS;
