//! WebSocket message types for the Deepgram live streaming API.
//!
//! Incoming messages carry a `type` discriminator:
//! - [`ResultsMessage`]: interim or final transcript for a span of audio
//! - [`MetadataMessage`]: stream metadata, sent once the request is accepted
//! - [`UtteranceEndMessage`]: end of an utterance detected from word timing
//! - [`SpeechStartedMessage`]: voice activity began (requires `vad_events`)
//! - [`ErrorMessage`]: stream-level failure
//!
//! Outgoing audio is sent as binary frames; [`ControlMessage`] covers the
//! JSON control frames.

use serde::{Deserialize, Serialize};

// =============================================================================
// Incoming Messages (Server to Client)
// =============================================================================

/// A single recognition hypothesis.
#[derive(Debug, Clone, Deserialize)]
pub struct Alternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: f64,
}

/// Per-channel results.
#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

/// Transcript results for a span of audio.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultsMessage {
    /// Offset of the span from the start of the stream, in seconds
    #[serde(default)]
    pub start: f64,
    /// Length of the span, in seconds
    #[serde(default)]
    pub duration: f64,
    /// The text for this span will not change again
    #[serde(default)]
    pub is_final: bool,
    /// Deepgram detected an endpoint after this span
    #[serde(default)]
    pub speech_final: bool,
    pub channel: Channel,
}

impl ResultsMessage {
    /// Best hypothesis, if any.
    pub fn best(&self) -> Option<&Alternative> {
        self.channel.alternatives.first()
    }

    /// Start offset in whole milliseconds.
    pub fn start_ms(&self) -> u64 {
        (self.start.max(0.0) * 1000.0).round() as u64
    }
}

/// Stream metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataMessage {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub channels: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UtteranceEndMessage {
    #[serde(default)]
    pub last_word_end: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechStartedMessage {
    #[serde(default)]
    pub timestamp: f64,
}

/// Error frame. Deepgram has used both `description` and `message` for the
/// human-readable text.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorMessage {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
}

impl ErrorMessage {
    pub fn text(&self) -> String {
        self.description
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "unknown Deepgram error".to_string())
    }
}

/// Parsed server message.
#[derive(Debug)]
pub enum DeepgramMessage {
    Results(ResultsMessage),
    Metadata(MetadataMessage),
    UtteranceEnd(UtteranceEndMessage),
    SpeechStarted(SpeechStartedMessage),
    Error(ErrorMessage),
    /// Unknown message type (for forward compatibility)
    Unknown(String),
}

impl DeepgramMessage {
    /// Parse a WebSocket text frame by peeking at its `type` field first.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct TypePeek {
            #[serde(rename = "type")]
            message_type: String,
        }

        let peek: TypePeek = serde_json::from_str(text)?;

        match peek.message_type.as_str() {
            "Results" => Ok(DeepgramMessage::Results(serde_json::from_str(text)?)),
            "Metadata" => Ok(DeepgramMessage::Metadata(serde_json::from_str(text)?)),
            "UtteranceEnd" => Ok(DeepgramMessage::UtteranceEnd(serde_json::from_str(text)?)),
            "SpeechStarted" => Ok(DeepgramMessage::SpeechStarted(serde_json::from_str(text)?)),
            "Error" => Ok(DeepgramMessage::Error(serde_json::from_str(text)?)),
            _ => Ok(DeepgramMessage::Unknown(text.to_string())),
        }
    }
}

// =============================================================================
// Outgoing Messages (Client to Server)
// =============================================================================

/// JSON control frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Keeps the stream open while no audio is flowing
    KeepAlive,
    /// Flush pending audio and return final results
    Finalize,
    /// Flush and close the stream
    CloseStream,
}

impl ControlMessage {
    pub fn to_json(self) -> String {
        match self {
            ControlMessage::KeepAlive => r#"{"type":"KeepAlive"}"#,
            ControlMessage::Finalize => r#"{"type":"Finalize"}"#,
            ControlMessage::CloseStream => r#"{"type":"CloseStream"}"#,
        }
        .to_string()
    }
}
