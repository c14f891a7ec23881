//! ElevenLabs stream-input TTS provider.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info};

use super::config::ElevenLabsTTSConfig;
use super::messages::{AudioResponse, CloseConnection, InitializeConnection, SendText};
use crate::core::tts::base::{AudioStream, BaseTTS, TTSConfig, TTSError, TTSResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ElevenLabsTTS {
    config: ElevenLabsTTSConfig,
}

impl ElevenLabsTTS {
    pub fn new(config: TTSConfig) -> TTSResult<Self> {
        if config.api_key.is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "API key is required for ElevenLabs TTS".to_string(),
            ));
        }

        let config = ElevenLabsTTSConfig::from_base(config);
        config.build_stream_url("probe")?;

        Ok(Self { config })
    }

    fn encode<T: serde::Serialize>(message: &T) -> TTSResult<Message> {
        serde_json::to_string(message)
            .map(|json| Message::Text(json.into()))
            .map_err(|e| TTSError::InternalError(format!("Failed to serialize message: {e}")))
    }
}

#[async_trait]
impl BaseTTS for ElevenLabsTTS {
    async fn synthesize(&self, text: &str, voice_id: &str) -> TTSResult<AudioStream> {
        if text.trim().is_empty() {
            return Err(TTSError::InvalidConfiguration("Text is empty".to_string()));
        }
        if voice_id.trim().is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "Voice id is required".to_string(),
            ));
        }

        let url = self.config.build_stream_url(voice_id)?;
        let host = ElevenLabsTTSConfig::host_header(&url)?;

        let request = tokio_tungstenite::tungstenite::http::Request::builder()
            .method("GET")
            .uri(url.as_str())
            .header("Host", host)
            .header("Upgrade", "websocket")
            .header("Connection", "upgrade")
            .header("Sec-WebSocket-Key", generate_key())
            .header("Sec-WebSocket-Version", "13")
            .header("xi-api-key", &self.config.base.api_key)
            .body(())
            .map_err(|e| {
                TTSError::ConnectionFailed(format!("Failed to create WebSocket request: {e}"))
            })?;

        let (ws_stream, _response) = timeout(CONNECT_TIMEOUT, connect_async(request))
            .await
            .map_err(|_| TTSError::ConnectionFailed("Timed out connecting to ElevenLabs".into()))?
            .map_err(|e| TTSError::ConnectionFailed(format!("Failed to connect to ElevenLabs: {e}")))?;

        let (mut sink, mut stream) = ws_stream.split();

        for message in [
            Self::encode(&InitializeConnection::new(self.config.base.voice_settings))?,
            Self::encode(&SendText::new(text))?,
            Self::encode(&CloseConnection::default())?,
        ] {
            sink.send(message)
                .await
                .map_err(|e| TTSError::NetworkError(format!("Failed to send text: {e}")))?;
        }

        debug!(voice_id, chars = text.len(), "ElevenLabs synthesis started");

        let audio = async_stream::try_stream! {
            // Keep the sink alive for the stream's lifetime; dropping both
            // halves closes the socket.
            let _sink = sink;

            while let Some(frame) = stream.next().await {
                let frame = frame
                    .map_err(|e| TTSError::NetworkError(format!("WebSocket error: {e}")))?;

                match frame {
                    Message::Text(text) => {
                        let response: AudioResponse = serde_json::from_str(&text).map_err(|e| {
                            TTSError::ProviderError(format!("Malformed ElevenLabs frame: {e}"))
                        })?;

                        if let Some(error) = response.error_text() {
                            Err::<(), _>(TTSError::AudioGenerationFailed(error))?;
                        }

                        if let Some(encoded) = response.audio.as_deref().filter(|a| !a.is_empty()) {
                            let chunk = BASE64.decode(encoded).map_err(|e| {
                                TTSError::ProviderError(format!("Invalid base64 audio: {e}"))
                            })?;
                            yield Bytes::from(chunk);
                        }

                        if response.is_final() {
                            break;
                        }
                    }
                    Message::Binary(chunk) => {
                        yield chunk;
                    }
                    Message::Close(frame) => {
                        info!("ElevenLabs WebSocket closed: {:?}", frame);
                        break;
                    }
                    _ => {}
                }
            }
        };

        Ok(Box::pin(audio))
    }

    fn get_provider_info(&self) -> serde_json::Value {
        json!({
            "provider": "elevenlabs",
            "api": "stream-input",
            "model": self.config.base.model,
            "output_format": self.config.base.audio_format,
        })
    }
}
