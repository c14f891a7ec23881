//! Merge YAML overrides on top of environment values and defaults.

use std::path::PathBuf;

use super::env::EnvConfig;
use super::pacing::PacingConfig;
use super::persona::{DEFAULT_PERSONA, Persona, PersonaRegistry};
use super::safety::SafetyConfig;
use super::yaml::{PersonasYaml, YamlConfig};
use super::{
    DEFAULT_MAX_CONNECTIONS_PER_IP, DEFAULT_PORT, ReflectionSettings, ServerConfig, SttSettings,
    TlsConfig, TtsSettings,
};

/// Build a [`ServerConfig`] from the environment, with `yaml` taking
/// precedence wherever it sets a value.
pub fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let env = EnvConfig::load()?;
    let yaml = yaml.unwrap_or_default();

    let server = yaml.server.unwrap_or_default();
    let providers = yaml.providers.unwrap_or_default();
    let stt = yaml.stt.unwrap_or_default();
    let reflection = yaml.reflection.unwrap_or_default();
    let tts = yaml.tts.unwrap_or_default();
    let pacing = yaml.pacing.unwrap_or_default();
    let safety = yaml.safety.unwrap_or_default();
    let security = yaml.security.unwrap_or_default();

    let tls = merge_tls(
        server.tls.as_ref().and_then(|t| t.enabled),
        server
            .tls
            .as_ref()
            .and_then(|t| t.cert_path.clone())
            .or(env.tls_cert_path.clone()),
        server
            .tls
            .as_ref()
            .and_then(|t| t.key_path.clone())
            .or(env.tls_key_path.clone()),
    )?;

    let default_stt = SttSettings::default();
    let stt = SttSettings {
        model: stt
            .model
            .or(env.deepgram_model.clone())
            .unwrap_or(default_stt.model),
        language: stt
            .language
            .or(env.deepgram_language.clone())
            .unwrap_or(default_stt.language),
        vad_events: stt
            .vad_events
            .or(env.deepgram_vad_events)
            .unwrap_or(default_stt.vad_events),
        endpoint: stt.endpoint,
    };

    let default_reflection = ReflectionSettings::default();
    let reflection = ReflectionSettings {
        model: reflection
            .model
            .or(env.openai_model.clone())
            .unwrap_or(default_reflection.model),
        temperature: reflection
            .temperature
            .unwrap_or(default_reflection.temperature),
        endpoint: reflection.endpoint,
    };

    let default_tts = TtsSettings::default();
    let tts = TtsSettings {
        model: tts
            .model
            .or(env.elevenlabs_model.clone())
            .unwrap_or(default_tts.model),
        audio_format: tts.audio_format.unwrap_or(default_tts.audio_format),
        endpoint: tts.endpoint,
        stability: tts.stability.unwrap_or(default_tts.stability),
        similarity_boost: tts.similarity_boost.unwrap_or(default_tts.similarity_boost),
        style: tts.style.unwrap_or(default_tts.style),
        use_speaker_boost: tts
            .use_speaker_boost
            .unwrap_or(default_tts.use_speaker_boost),
    };

    let default_pacing = PacingConfig::default();
    let pacing = PacingConfig {
        silence_ms: pacing
            .silence_ms
            .or(env.silence_ms)
            .unwrap_or(default_pacing.silence_ms),
        window_ms: pacing
            .window_ms
            .or(env.window_ms)
            .unwrap_or(default_pacing.window_ms),
        max_nudges_per_window: pacing
            .max_nudges_per_window
            .or(env.max_nudges_per_min)
            .unwrap_or(default_pacing.max_nudges_per_window),
        nudge_window_ms: pacing
            .nudge_window_ms
            .unwrap_or(default_pacing.nudge_window_ms),
        nudge_policy: pacing
            .nudge_policy
            .or(env.nudge_policy)
            .unwrap_or(default_pacing.nudge_policy),
    };

    let default_safety = SafetyConfig::default();
    let safety = SafetyConfig {
        patterns: safety
            .patterns
            .or(env.safety_patterns.clone())
            .unwrap_or(default_safety.patterns),
        announcement: safety
            .announcement
            .or(env.safety_announcement.clone())
            .unwrap_or(default_safety.announcement),
    };

    let personas = merge_personas(&env, yaml.personas.unwrap_or_default());

    Ok(ServerConfig {
        host: server
            .host
            .or(env.host.clone())
            .unwrap_or_else(|| "0.0.0.0".to_string()),
        port: server.port.or(env.port).unwrap_or(DEFAULT_PORT),
        tls,

        deepgram_api_key: providers.deepgram_api_key.or(env.deepgram_api_key.clone()),
        openai_api_key: providers.openai_api_key.or(env.openai_api_key.clone()),
        elevenlabs_api_key: providers
            .elevenlabs_api_key
            .or(env.elevenlabs_api_key.clone()),
        twilio_account_sid: providers
            .twilio_account_sid
            .or(env.twilio_account_sid.clone()),
        twilio_auth_token: providers
            .twilio_auth_token
            .or(env.twilio_auth_token.clone()),

        stt,
        reflection,
        tts,
        pacing,
        safety,
        personas,

        max_concurrent_calls: security.max_concurrent_calls.or(env.max_concurrent_calls),
        max_connections_per_ip: security
            .max_connections_per_ip
            .or(env.max_connections_per_ip)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS_PER_IP),
    })
}

/// TLS is on when both paths are known, unless explicitly disabled.
fn merge_tls(
    enabled: Option<bool>,
    cert_path: Option<String>,
    key_path: Option<String>,
) -> Result<Option<TlsConfig>, Box<dyn std::error::Error>> {
    if enabled == Some(false) {
        return Ok(None);
    }
    match (cert_path, key_path) {
        (Some(cert_path), Some(key_path)) => Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
        })),
        (None, None) if enabled != Some(true) => Ok(None),
        _ => Err("TLS requires both a certificate path and a key path".into()),
    }
}

/// Built-in personas, then ENV voices, then YAML definitions.
fn merge_personas(env: &EnvConfig, yaml: PersonasYaml) -> PersonaRegistry {
    let default_id = yaml
        .default
        .or(env.default_persona.clone())
        .unwrap_or_else(|| DEFAULT_PERSONA.to_string());

    let mut registry = PersonaRegistry::default();
    registry.set_default(&default_id);

    for (id, voice) in &env.persona_voices {
        if let Some(persona) = registry.get_mut(id) {
            persona.voice_id = Some(voice.clone());
        }
    }

    for (id, definition) in yaml.definitions {
        match registry.get_mut(&id) {
            Some(persona) => {
                if let Some(voice_id) = definition.voice_id {
                    persona.voice_id = Some(voice_id);
                }
                if let Some(opening) = definition.opening {
                    persona.opening = opening;
                }
                if let Some(pacing) = definition.pacing {
                    persona.pacing = pacing;
                }
            }
            None => {
                let mut persona = Persona::new(
                    &id.trim().to_lowercase(),
                    definition.opening.as_deref().unwrap_or_default(),
                );
                persona.voice_id = definition.voice_id;
                persona.pacing = definition.pacing.unwrap_or_default();
                registry.insert(persona);
            }
        }
    }

    registry
}
