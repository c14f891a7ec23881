//! Base trait and types for reflection generators.
//!
//! A reflection generator turns the caller's recent words into at most one
//! short spoken reply. It may also decide that staying quiet is the better
//! response, which it signals with [`ReflectionIntent::Silence`] or an empty
//! text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReflectionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    /// The model answered with something that is not the expected JSON
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// What kind of reply the generator chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReflectionIntent {
    Reflect,
    Affirm,
    Celebrate,
    Clarify,
    Silence,
    #[serde(other)]
    Unknown,
}

/// Structured generator output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub intent: ReflectionIntent,
    #[serde(default)]
    pub text: String,
    /// Suggested pause before speaking. Parsed for completeness; pacing is
    /// governed by the session's own silence and rate limits.
    #[serde(default)]
    pub wait_seconds: Option<f32>,
}

impl Reflection {
    /// Whether this reflection should produce no speech.
    pub fn is_silent(&self) -> bool {
        self.intent == ReflectionIntent::Silence || self.text.trim().is_empty()
    }
}

/// Configuration for a reflection generator.
#[derive(Debug, Clone)]
pub struct ReflectionConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    /// Override for the provider base URL (tests, proxies)
    pub endpoint: Option<String>,
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            endpoint: None,
        }
    }
}

#[async_trait]
pub trait ReflectionGenerator: Send + Sync {
    /// Produce a reflection for the caller's recent words.
    async fn reflect(&self, window_text: &str) -> Result<Reflection, ReflectionError>;

    fn get_provider_info(&self) -> &'static str;
}
