//! Twilio Media Streams message types
//!
//! Every frame on the media WebSocket is a JSON object tagged by `event`.
//! Audio travels as base64 µ-law, 8 kHz, mono in both directions.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Custom parameter naming the persona for a call.
pub const PERSONA_PARAMETER: &str = "persona";

// =============================================================================
// Incoming Messages (Twilio -> Gateway)
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TwilioInbound {
    /// First frame after the socket opens
    Connected {
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        version: Option<String>,
    },

    /// Stream metadata; sent once before any media
    Start {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        start: StartPayload,
    },

    Media {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        media: MediaPayload,
    },

    /// The stream ended (hangup or TwiML moved on)
    Stop {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        #[serde(default)]
        stop: Option<StopPayload>,
    },

    /// Playback of a previously sent mark completed
    Mark {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        #[serde(default)]
        mark: Option<MarkPayload>,
    },

    /// Events this gateway does not act on (e.g. `dtmf`)
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload {
    pub stream_sid: String,
    pub call_sid: String,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
    #[serde(default)]
    pub media_format: Option<MediaFormat>,
}

impl StartPayload {
    /// Persona requested through `<Parameter name="persona">`, if any.
    pub fn persona(&self) -> Option<&str> {
        self.custom_parameters
            .get(PERSONA_PARAMETER)
            .map(String::as_str)
            .filter(|p| !p.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    pub encoding: String,
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaPayload {
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub payload: String,
}

impl MediaPayload {
    /// Whether the frame carries the caller's audio.
    pub fn is_inbound(&self) -> bool {
        self.track.as_deref().is_none_or(|t| t == "inbound")
    }

    pub fn decode(&self) -> Result<Bytes, base64::DecodeError> {
        BASE64.decode(self.payload.as_bytes()).map(Bytes::from)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPayload {
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub call_sid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkPayload {
    pub name: String,
}

impl TwilioInbound {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

// =============================================================================
// Outgoing Messages (Gateway -> Twilio)
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TwilioOutbound {
    /// Audio to play to the caller
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },

    /// Drop any audio buffered for playback
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundMedia {
    pub payload: String,
}

impl TwilioOutbound {
    pub fn media(stream_sid: &str, audio: &[u8]) -> Self {
        TwilioOutbound::Media {
            stream_sid: stream_sid.to_string(),
            media: OutboundMedia {
                payload: BASE64.encode(audio),
            },
        }
    }

    pub fn clear(stream_sid: &str) -> Self {
        TwilioOutbound::Clear {
            stream_sid: stream_sid.to_string(),
        }
    }
}

/// Work items for the socket writer task.
#[derive(Debug)]
pub enum MediaRoute {
    Outgoing(TwilioOutbound),
    /// Send a close frame and stop writing
    Close,
}
