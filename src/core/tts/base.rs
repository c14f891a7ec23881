//! Base traits and types for streaming text-to-speech providers.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;

/// Errors that can occur while synthesizing speech.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TTSError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Audio generation failed: {0}")]
    AudioGenerationFailed(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type TTSResult<T> = Result<T, TTSError>;

/// Synthesized audio in arrival order. The stream ends when the provider
/// reports the utterance complete. Dropping it abandons the synthesis.
pub type AudioStream = Pin<Box<dyn Stream<Item = TTSResult<Bytes>> + Send>>;

/// Voice tuning parameters forwarded to the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.55,
            similarity_boost: 0.7,
            style: 0.2,
            use_speaker_boost: true,
        }
    }
}

/// Configuration shared by every TTS provider.
#[derive(Debug, Clone)]
pub struct TTSConfig {
    /// Provider name (e.g., "elevenlabs")
    pub provider: String,
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Output format understood by the provider (telephony uses µ-law 8 kHz)
    pub audio_format: String,
    pub voice_settings: VoiceSettings,
    /// Override for the provider endpoint (tests, proxies)
    pub endpoint: Option<String>,
}

impl Default for TTSConfig {
    fn default() -> Self {
        Self {
            provider: "elevenlabs".to_string(),
            api_key: String::new(),
            model: "eleven_monolingual_v1".to_string(),
            audio_format: "ulaw_8000".to_string(),
            voice_settings: VoiceSettings::default(),
            endpoint: None,
        }
    }
}

/// Base trait for streaming TTS providers.
#[async_trait]
pub trait BaseTTS: Send + Sync {
    /// Start synthesizing `text` with `voice_id`.
    ///
    /// Returns once the provider accepted the request; audio arrives on the
    /// returned stream.
    async fn synthesize(&self, text: &str, voice_id: &str) -> TTSResult<AudioStream>;

    /// Provider metadata for logging.
    fn get_provider_info(&self) -> serde_json::Value;
}
