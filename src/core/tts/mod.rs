mod base;
pub mod elevenlabs;

pub use base::{AudioStream, BaseTTS, TTSConfig, TTSError, TTSResult, VoiceSettings};
pub use elevenlabs::{ELEVENLABS_TTS_URL, ElevenLabsTTS};

/// Factory function to create a TTS provider.
///
/// # Supported Providers
///
/// - `"elevenlabs"` - ElevenLabs stream-input WebSocket API
pub fn create_tts_provider(provider_type: &str, config: TTSConfig) -> TTSResult<Box<dyn BaseTTS>> {
    match provider_type.to_lowercase().as_str() {
        "elevenlabs" | "eleven-labs" => Ok(Box::new(ElevenLabsTTS::new(config)?)),
        _ => Err(TTSError::InvalidConfiguration(format!(
            "Unsupported TTS provider: {provider_type}. Supported providers: elevenlabs"
        ))),
    }
}
