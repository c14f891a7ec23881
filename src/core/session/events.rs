//! Inputs to the per-call event loop.

use bytes::Bytes;

use crate::core::reflection::{Reflection, ReflectionError};
use crate::core::tts::TTSError;

/// Identifies one outbound speech handle. Ids only grow within a session,
/// so events carrying an older id are stale.
pub type SpeechId = u64;

#[derive(Debug)]
pub enum SessionEvent {
    /// Telephony `start`: the call is identified
    Start { call_id: String },
    /// First inbound audio frame
    Media,
    /// STT result; interim results only signal activity
    Transcript { text: String, is_final: bool },
    /// Provider voice-activity signal
    CallerActivity,
    ReflectionReady {
        id: SpeechId,
        outcome: Result<Reflection, ReflectionError>,
    },
    SpeechAudio { id: SpeechId, chunk: Bytes },
    SpeechFinished {
        id: SpeechId,
        outcome: Result<(), TTSError>,
    },
    /// Telephony `stop`
    Stop,
    /// The media socket went away
    Hangup,
}

impl SessionEvent {
    pub fn transcript(text: impl Into<String>, is_final: bool) -> Self {
        SessionEvent::Transcript {
            text: text.into(),
            is_final,
        }
    }

    /// Whether this event means the caller is talking.
    pub fn is_caller_activity(&self) -> bool {
        match self {
            SessionEvent::Transcript { text, .. } => !text.trim().is_empty(),
            SessionEvent::CallerActivity => true,
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::Start { .. } => "start",
            SessionEvent::Media => "media",
            SessionEvent::Transcript { .. } => "transcript",
            SessionEvent::CallerActivity => "caller_activity",
            SessionEvent::ReflectionReady { .. } => "reflection_ready",
            SessionEvent::SpeechAudio { .. } => "speech_audio",
            SessionEvent::SpeechFinished { .. } => "speech_finished",
            SessionEvent::Stop => "stop",
            SessionEvent::Hangup => "hangup",
        }
    }
}
