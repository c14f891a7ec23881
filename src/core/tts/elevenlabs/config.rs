//! Configuration for the ElevenLabs stream-input API.

use url::Url;

use crate::core::tts::base::{TTSConfig, TTSError, TTSResult};

/// Default ElevenLabs WebSocket base URL.
pub const ELEVENLABS_TTS_URL: &str = "wss://api.elevenlabs.io";

#[derive(Debug, Clone)]
pub struct ElevenLabsTTSConfig {
    pub base: TTSConfig,
    /// Scheme and authority of the WebSocket API
    pub base_url: String,
}

impl ElevenLabsTTSConfig {
    pub fn from_base(base: TTSConfig) -> Self {
        let base_url = base
            .endpoint
            .clone()
            .unwrap_or_else(|| ELEVENLABS_TTS_URL.to_string());
        Self { base, base_url }
    }

    /// `{base}/v1/text-to-speech/{voice_id}/stream-input?model_id=..&output_format=..`
    pub fn build_stream_url(&self, voice_id: &str) -> TTSResult<Url> {
        let mut url = Url::parse(self.base_url.trim_end_matches('/')).map_err(|e| {
            TTSError::InvalidConfiguration(format!("Invalid ElevenLabs endpoint: {e}"))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                TTSError::InvalidConfiguration("ElevenLabs endpoint cannot be a base".to_string())
            })?
            .pop_if_empty()
            .extend(["v1", "text-to-speech", voice_id, "stream-input"]);

        url.query_pairs_mut()
            .append_pair("model_id", &self.base.model)
            .append_pair("output_format", &self.base.audio_format);

        Ok(url)
    }

    /// Value for the `Host` header of the upgrade request.
    pub fn host_header(url: &Url) -> TTSResult<String> {
        let host = url.host_str().ok_or_else(|| {
            TTSError::InvalidConfiguration("ElevenLabs endpoint has no host".to_string())
        })?;

        Ok(match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}
