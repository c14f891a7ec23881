//! Shared application state.
//!
//! One [`AppState`] is built at startup and handed to every route. It owns the
//! immutable configuration, the provider clients shared by all calls, the
//! compiled safety patterns and the connection accounting used by the
//! connection-limit middleware.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{PacingConfig, ServerConfig};
use crate::core::call_control::{
    CallControl, DisabledCallControl, TwilioCallControl, TwilioCredentials,
};
use crate::core::reflection::{OpenAIReflection, ReflectionConfig, ReflectionGenerator};
use crate::core::session::{MediaSink, SafetyInterceptor, SessionDeps, SessionSettings};
use crate::core::stt::STTConfig;
use crate::core::tts::{BaseTTS, ElevenLabsTTS, TTSConfig, VoiceSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectionLimitError {
    #[error("Global connection limit reached")]
    GlobalLimitReached,
    #[error("Per-IP connection limit reached")]
    PerIpLimitReached,
}

/// Provider clients shared by every call.
#[derive(Clone)]
pub struct Providers {
    pub reflection: Option<Arc<dyn ReflectionGenerator>>,
    pub tts: Option<Arc<dyn BaseTTS>>,
    pub call_control: Arc<dyn CallControl>,
}

impl Providers {
    /// Build the provider clients the configuration has credentials for.
    pub fn from_config(
        config: &ServerConfig,
        http_client: &reqwest::Client,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let reflection: Option<Arc<dyn ReflectionGenerator>> = match &config.openai_api_key {
            Some(api_key) => {
                let reflection_config = ReflectionConfig {
                    api_key: api_key.clone(),
                    model: config.reflection.model.clone(),
                    temperature: config.reflection.temperature,
                    endpoint: config.reflection.endpoint.clone(),
                };
                Some(Arc::new(OpenAIReflection::new(
                    reflection_config,
                    http_client.clone(),
                )?))
            }
            None => {
                warn!("OPENAI_API_KEY not set; calls will listen without reflecting");
                None
            }
        };

        let tts: Option<Arc<dyn BaseTTS>> = match &config.elevenlabs_api_key {
            Some(api_key) => {
                let tts_config = TTSConfig {
                    provider: "elevenlabs".to_string(),
                    api_key: api_key.clone(),
                    model: config.tts.model.clone(),
                    audio_format: config.tts.audio_format.clone(),
                    voice_settings: VoiceSettings {
                        stability: config.tts.stability,
                        similarity_boost: config.tts.similarity_boost,
                        style: config.tts.style,
                        use_speaker_boost: config.tts.use_speaker_boost,
                    },
                    endpoint: config.tts.endpoint.clone(),
                };
                Some(Arc::new(ElevenLabsTTS::new(tts_config)?))
            }
            None => {
                warn!("ELEVENLABS_API_KEY not set; calls will not speak");
                None
            }
        };

        let call_control: Arc<dyn CallControl> =
            match (&config.twilio_account_sid, &config.twilio_auth_token) {
                (Some(account_sid), Some(auth_token)) => {
                    Arc::new(TwilioCallControl::new(
                        TwilioCredentials {
                            account_sid: account_sid.clone(),
                            auth_token: auth_token.clone(),
                        },
                        http_client.clone(),
                    ))
                }
                _ => {
                    warn!(
                        "Twilio credentials not set; safety escalation will close the stream without an announcement"
                    );
                    Arc::new(DisabledCallControl)
                }
            };

        Ok(Self {
            reflection,
            tts,
            call_control,
        })
    }
}

pub struct AppState {
    pub config: ServerConfig,
    pub http_client: reqwest::Client,
    pub safety: Arc<SafetyInterceptor>,
    pub providers: Providers,

    ws_connections: AtomicUsize,
    ip_connections: DashMap<IpAddr, usize>,
}

impl AppState {
    /// Build the state and every provider client the configuration enables.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        let http_client = reqwest::Client::builder()
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;
        let providers = Providers::from_config(&config, &http_client)?;
        Self::assemble(config, http_client, providers)
    }

    /// Build the state around caller-supplied providers.
    pub fn with_providers(
        config: ServerConfig,
        providers: Providers,
    ) -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        Self::assemble(config, reqwest::Client::new(), providers)
    }

    fn assemble(
        config: ServerConfig,
        http_client: reqwest::Client,
        providers: Providers,
    ) -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        let safety = SafetyInterceptor::new(&config.safety.patterns)
            .map_err(|e| format!("Invalid safety patterns: {e}"))?;
        info!(
            patterns = safety.pattern_count(),
            personas = config.personas.ids().len(),
            "Application state ready"
        );

        Ok(Arc::new(Self {
            config,
            http_client,
            safety: Arc::new(safety),
            providers,
            ws_connections: AtomicUsize::new(0),
            ip_connections: DashMap::new(),
        }))
    }

    // =========================================================================
    // Connection accounting
    // =========================================================================

    /// Reserve a media-stream slot for `ip`.
    pub fn try_acquire_connection(&self, ip: IpAddr) -> Result<(), ConnectionLimitError> {
        let global_max = self.config.max_concurrent_calls;
        self.ws_connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| match global_max {
                Some(max) if current >= max => None,
                _ => Some(current + 1),
            })
            .map_err(|_| ConnectionLimitError::GlobalLimitReached)?;

        let per_ip_max = self.config.max_connections_per_ip as usize;
        let mut entry = self.ip_connections.entry(ip).or_insert(0);
        if *entry >= per_ip_max {
            drop(entry);
            self.ws_connections.fetch_sub(1, Ordering::AcqRel);
            return Err(ConnectionLimitError::PerIpLimitReached);
        }
        *entry += 1;
        Ok(())
    }

    /// Release a slot acquired with [`Self::try_acquire_connection`].
    pub fn release_connection(&self, ip: IpAddr) {
        let _ = self
            .ws_connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current.checked_sub(1)
            });
        self.ip_connections.remove_if_mut(&ip, |_, count| {
            *count = count.saturating_sub(1);
            *count == 0
        });
    }

    pub fn ws_connection_count(&self) -> usize {
        self.ws_connections.load(Ordering::Acquire)
    }

    pub fn ip_connection_count(&self, ip: &IpAddr) -> usize {
        self.ip_connections.get(ip).map(|c| *c).unwrap_or(0)
    }

    // =========================================================================
    // Per-call wiring
    // =========================================================================

    /// STT configuration for one call, or an error when no key is set.
    pub fn stt_config(&self) -> Result<STTConfig, String> {
        let api_key = self.config.get_api_key("deepgram")?;
        Ok(STTConfig {
            provider: "deepgram".to_string(),
            api_key,
            model: self.config.stt.model.clone(),
            language: self.config.stt.language.clone(),
            vad_events: self.config.stt.vad_events,
            endpoint: self.config.stt.endpoint.clone(),
            ..STTConfig::default()
        })
    }

    /// Resolve the persona for a call and its effective pacing.
    pub fn session_settings(&self, persona: Option<&str>) -> Option<SessionSettings> {
        let persona = self.config.personas.resolve(persona)?.clone();
        let pacing: PacingConfig = self.config.pacing.with_overrides(&persona.pacing);
        Some(SessionSettings {
            persona,
            pacing,
            safety_announcement: self.config.safety.announcement.clone(),
        })
    }

    /// Collaborators for one call session.
    pub fn session_deps(&self, sink: Arc<dyn MediaSink>) -> SessionDeps {
        SessionDeps {
            safety: self.safety.clone(),
            reflection: self.providers.reflection.clone(),
            tts: self.providers.tts.clone(),
            call_control: self.providers.call_control.clone(),
            sink,
        }
    }
}
