//! Configuration for the Deepgram live streaming API.

use std::time::Duration;

use url::Url;

use super::super::base::{STTConfig, STTError};

/// Default Deepgram live transcription endpoint.
pub const DEEPGRAM_LISTEN_URL: &str = "wss://api.deepgram.com/v1/listen";

/// Deepgram closes idle streams after roughly 10 seconds without audio or
/// a KeepAlive message.
const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

/// Deepgram-specific configuration layered over [`STTConfig`].
#[derive(Debug, Clone)]
pub struct DeepgramSTTConfig {
    /// Shared STT settings
    pub base: STTConfig,
    /// WebSocket endpoint (overridable for tests)
    pub endpoint: String,
    /// Interval between KeepAlive control messages
    pub keepalive_interval: Duration,
}

impl DeepgramSTTConfig {
    /// Build the Deepgram configuration from the shared settings.
    pub fn from_base(base: STTConfig) -> Self {
        let endpoint = base
            .endpoint
            .clone()
            .unwrap_or_else(|| DEEPGRAM_LISTEN_URL.to_string());

        Self {
            base,
            endpoint,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
        }
    }

    /// Build the listen URL with all streaming options as query parameters.
    pub fn build_websocket_url(&self) -> Result<Url, STTError> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            STTError::ConfigurationError(format!("Invalid Deepgram endpoint: {e}"))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("model", &self.base.model)
                .append_pair("encoding", &self.base.encoding)
                .append_pair("sample_rate", &self.base.sample_rate.to_string())
                .append_pair("channels", &self.base.channels.to_string())
                .append_pair("interim_results", bool_param(self.base.interim_results))
                .append_pair("smart_format", bool_param(self.base.smart_format))
                .append_pair("language", &self.base.language);

            if self.base.vad_events {
                query.append_pair("vad_events", "true");
            }
        }

        Ok(url)
    }

    /// Value for the `Host` header of the upgrade request.
    pub fn host_header(url: &Url) -> Result<String, STTError> {
        let host = url.host_str().ok_or_else(|| {
            STTError::ConfigurationError("Deepgram endpoint has no host".to_string())
        })?;

        Ok(match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}

#[inline]
fn bool_param(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
