mod base;
pub mod deepgram;

// Re-export public types and traits
pub use base::{
    BaseSTT, STTConfig, STTError, STTErrorCallback, STTResult, STTResultCallback,
    SpeechStartedCallback,
};

// Re-export Deepgram implementation
pub use deepgram::{DeepgramSTT, DeepgramSTTConfig};

/// Supported STT providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum STTProvider {
    /// Deepgram live streaming WebSocket API
    Deepgram,
}

impl std::fmt::Display for STTProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            STTProvider::Deepgram => write!(f, "deepgram"),
        }
    }
}

impl std::str::FromStr for STTProvider {
    type Err = STTError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deepgram" => Ok(STTProvider::Deepgram),
            _ => Err(STTError::ConfigurationError(format!(
                "Unsupported STT provider: {s}. Supported providers: deepgram"
            ))),
        }
    }
}

/// Create an STT provider by name.
///
/// ```rust,no_run
/// use listenly_gateway::core::stt::{create_stt_provider, STTConfig};
///
/// let config = STTConfig {
///     api_key: "your-deepgram-api-key".to_string(),
///     ..Default::default()
/// };
/// let stt = create_stt_provider("deepgram", config).unwrap();
/// assert!(!stt.is_ready());
/// ```
pub fn create_stt_provider(
    provider: &str,
    config: STTConfig,
) -> Result<Box<dyn BaseSTT>, STTError> {
    match provider.parse::<STTProvider>()? {
        STTProvider::Deepgram => Ok(Box::new(DeepgramSTT::new(config)?)),
    }
}
