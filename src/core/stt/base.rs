//! Base traits and types for streaming speech-to-text providers.
//!
//! A provider receives the raw inbound call audio and reports transcript
//! results through registered callbacks. Interim results are only a signal
//! that the caller is talking; final results carry text the session keeps.

use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during STT operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum STTError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Network error while streaming
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Provider-specific error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Audio could not be accepted by the provider
    #[error("Invalid audio format: {0}")]
    InvalidAudioFormat(String),

    /// Operation attempted before `connect` succeeded
    #[error("Not connected")]
    NotConnected,
}

/// Configuration shared by every STT provider.
#[derive(Debug, Clone)]
pub struct STTConfig {
    /// Provider name (e.g., "deepgram")
    pub provider: String,
    /// API key for authentication
    pub api_key: String,
    /// Model identifier (e.g., "nova-2")
    pub model: String,
    /// BCP-47 language code
    pub language: String,
    /// Audio encoding of the inbound stream (telephony uses "mulaw")
    pub encoding: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of audio channels
    pub channels: u16,
    /// Request interim (non-final) results
    pub interim_results: bool,
    /// Apply provider-side formatting (punctuation, numerals)
    pub smart_format: bool,
    /// Ask the provider for voice-activity "speech started" events
    pub vad_events: bool,
    /// Override for the provider WebSocket endpoint (tests, proxies)
    pub endpoint: Option<String>,
}

impl Default for STTConfig {
    fn default() -> Self {
        Self {
            provider: "deepgram".to_string(),
            api_key: String::new(),
            model: "nova-2".to_string(),
            language: "en-US".to_string(),
            encoding: "mulaw".to_string(),
            sample_rate: 8000,
            channels: 1,
            interim_results: true,
            smart_format: true,
            vad_events: false,
            endpoint: None,
        }
    }
}

/// A single transcript event from the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct STTResult {
    /// Transcribed text
    pub transcript: String,
    /// Whether the provider will not revise this text again
    pub is_final: bool,
    /// Whether the provider considers the utterance complete
    pub is_speech_final: bool,
    /// Confidence between 0.0 and 1.0
    pub confidence: f32,
    /// Offset of the segment from the start of the audio stream, if reported
    pub start_ms: Option<u64>,
}

impl STTResult {
    pub fn new(transcript: String, is_final: bool, is_speech_final: bool, confidence: f32) -> Self {
        Self {
            transcript,
            is_final,
            is_speech_final,
            confidence,
            start_ms: None,
        }
    }

    pub fn with_start_ms(mut self, start_ms: u64) -> Self {
        self.start_ms = Some(start_ms);
        self
    }
}

/// Callback type for transcript results.
pub type STTResultCallback =
    Arc<dyn Fn(STTResult) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for provider voice-activity "speech started" events.
pub type SpeechStartedCallback =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for streaming errors.
pub type STTErrorCallback =
    Arc<dyn Fn(STTError) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Base trait for streaming STT providers.
///
/// Callbacks may be registered before or after `connect`; results that
/// arrive with no callback registered are logged and dropped.
#[async_trait]
pub trait BaseSTT: Send + Sync {
    /// Create a provider from the shared configuration.
    fn new(config: STTConfig) -> Result<Self, STTError>
    where
        Self: Sized;

    /// Open the streaming connection.
    async fn connect(&mut self) -> Result<(), STTError>;

    /// Close the streaming connection gracefully.
    async fn disconnect(&mut self) -> Result<(), STTError>;

    /// Whether the provider accepts audio.
    fn is_ready(&self) -> bool;

    /// Queue one inbound audio frame.
    ///
    /// Never waits: a frame that cannot be queued is rejected with an error
    /// so the caller can drop it.
    fn send_audio(&self, audio: Bytes) -> Result<(), STTError>;

    /// Register the callback for transcript results.
    async fn on_result(&mut self, callback: STTResultCallback) -> Result<(), STTError>;

    /// Register the callback for voice-activity "speech started" events.
    async fn on_speech_started(&mut self, callback: SpeechStartedCallback)
    -> Result<(), STTError>;

    /// Register the callback for streaming errors.
    async fn on_error(&mut self, callback: STTErrorCallback) -> Result<(), STTError>;

    /// Current configuration.
    fn get_config(&self) -> Option<&STTConfig>;

    /// Provider name for logging.
    fn get_provider_info(&self) -> &'static str;
}
