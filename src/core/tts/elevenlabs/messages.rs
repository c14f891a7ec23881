//! Message types for the ElevenLabs stream-input WebSocket.
//!
//! A synthesis is three client frames: [`InitializeConnection`] (a single
//! space plus voice settings), one [`SendText`] and [`CloseConnection`] (an
//! empty string). The server answers with [`AudioResponse`] frames until one
//! carries `isFinal: true`.

use serde::{Deserialize, Serialize};

use crate::core::tts::base::VoiceSettings;

#[derive(Debug, Clone, Serialize)]
pub struct VoiceSettingsPayload {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl From<VoiceSettings> for VoiceSettingsPayload {
    fn from(settings: VoiceSettings) -> Self {
        Self {
            stability: settings.stability,
            similarity_boost: settings.similarity_boost,
            style: settings.style,
            use_speaker_boost: settings.use_speaker_boost,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InitializeConnection {
    pub text: &'static str,
    pub voice_settings: VoiceSettingsPayload,
}

impl InitializeConnection {
    pub fn new(settings: VoiceSettings) -> Self {
        Self {
            text: " ",
            voice_settings: settings.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendText {
    pub text: String,
    pub try_trigger_generation: bool,
}

impl SendText {
    /// The API expects each text chunk to end with a space.
    pub fn new(text: &str) -> Self {
        let mut text = text.trim().to_string();
        text.push(' ');
        Self {
            text,
            try_trigger_generation: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CloseConnection {
    pub text: &'static str,
}

/// Server frame. Errors arrive in the same shape with `message`/`error`
/// set and no audio.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioResponse {
    /// Base64 audio in the requested output format
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default, rename = "isFinal")]
    pub is_final: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AudioResponse {
    pub fn is_final(&self) -> bool {
        self.is_final.unwrap_or(false)
    }

    pub fn error_text(&self) -> Option<String> {
        self.error.clone().or_else(|| {
            self.message
                .clone()
                .filter(|_| self.audio.is_none() && !self.is_final())
        })
    }
}
