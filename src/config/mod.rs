//! Configuration module for the Listenly gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `pacing`, `persona`, `safety`: turn-taking settings shared with call sessions
//!
//! # Example
//! ```rust,no_run
//! use listenly_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

mod env;
mod merge;
pub mod pacing;
pub mod persona;
pub mod safety;
mod utils;
mod validation;
mod yaml;

pub use pacing::{
    DEFAULT_MAX_NUDGES, DEFAULT_NUDGE_WINDOW_MS, DEFAULT_SILENCE_MS, DEFAULT_WINDOW_MS,
    NudgePolicy, PacingConfig, PacingOverrides,
};
pub use persona::{DEFAULT_PERSONA, Persona, PersonaRegistry, builtin_personas};
pub use safety::{DEFAULT_SAFETY_ANNOUNCEMENT, DEFAULT_SAFETY_PATTERNS, SafetyConfig};

/// Listening port when neither YAML nor `PORT` sets one.
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_CONNECTIONS_PER_IP: u32 = 20;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Deepgram streaming settings (credentials live on [`ServerConfig`])
#[derive(Debug, Clone, PartialEq)]
pub struct SttSettings {
    pub model: String,
    pub language: String,
    /// Request `SpeechStarted` events for earlier barge-in
    pub vad_events: bool,
    pub endpoint: Option<String>,
}

impl Default for SttSettings {
    fn default() -> Self {
        Self {
            model: "nova-2".to_string(),
            language: "en-US".to_string(),
            vad_events: false,
            endpoint: None,
        }
    }
}

/// OpenAI reflection settings
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionSettings {
    pub model: String,
    pub temperature: f32,
    pub endpoint: Option<String>,
}

impl Default for ReflectionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            endpoint: None,
        }
    }
}

/// ElevenLabs synthesis settings
#[derive(Debug, Clone, PartialEq)]
pub struct TtsSettings {
    pub model: String,
    pub audio_format: String,
    pub endpoint: Option<String>,
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            model: "eleven_monolingual_v1".to_string(),
            audio_format: "ulaw_8000".to_string(),
            endpoint: None,
            stability: 0.55,
            similarity_boost: 0.7,
            style: 0.2,
            use_speaker_boost: true,
        }
    }
}

/// Server configuration
///
/// Contains all configuration needed to run the gateway, including:
/// - Server settings (host, port, TLS)
/// - Provider credentials (Deepgram, OpenAI, ElevenLabs, Twilio)
/// - Provider tuning (models, formats, endpoints)
/// - Turn-taking pacing, safety patterns and personas
/// - Connection limits
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Provider credentials
    pub deepgram_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    /// Twilio account SID; call control is disabled unless both Twilio
    /// values are present
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,

    // Provider settings
    pub stt: SttSettings,
    pub reflection: ReflectionSettings,
    pub tts: TtsSettings,

    // Turn-taking
    pub pacing: PacingConfig,
    pub safety: SafetyConfig,
    pub personas: PersonaRegistry,

    // Connection limits
    /// Maximum concurrent media streams
    /// Default: None (unlimited)
    pub max_concurrent_calls: Option<usize>,
    /// Maximum concurrent media streams per IP address
    /// Default: 20
    pub max_connections_per_ip: u32,
}

/// Zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.deepgram_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.elevenlabs_api_key {
            key.zeroize();
        }
        if let Some(ref mut token) = self.twilio_auth_token {
            token.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and defaults).
    ///
    /// The `.env` file, if any, is loaded into the process environment by
    /// `main` before this runs.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        validation::validate_tls(&self.tls)?;
        validation::validate_pacing(&self.pacing)?;
        validation::validate_safety(&self.safety)?;
        validation::validate_personas(&self.personas)?;
        Ok(())
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Whether safety escalation can reach the telephony provider.
    pub fn has_call_control(&self) -> bool {
        self.twilio_account_sid.is_some() && self.twilio_auth_token.is_some()
    }

    /// Get API key for a specific provider
    ///
    /// # Arguments
    /// * `provider` - The name of the provider (e.g., "deepgram", "elevenlabs")
    ///
    /// # Returns
    /// * `Result<String, String>` - The API key on success, or an error message on failure
    pub fn get_api_key(&self, provider: &str) -> Result<String, String> {
        let (key, name) = match provider.to_lowercase().as_str() {
            "deepgram" => (&self.deepgram_api_key, "Deepgram"),
            "openai" => (&self.openai_api_key, "OpenAI"),
            "elevenlabs" | "eleven-labs" => (&self.elevenlabs_api_key, "ElevenLabs"),
            _ => return Err(format!("Unsupported provider: {provider}")),
        };
        key.clone()
            .ok_or_else(|| format!("{name} API key not configured in server environment"))
    }
}
