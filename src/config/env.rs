//! Environment variable layer.
//!
//! Every field is optional; unset values fall through to the defaults in
//! [`super::merge`]. Values from a `.env` file are already present in the
//! process environment by the time this runs.

use super::pacing::NudgePolicy;
use super::utils::{env_var, parse_bool, parse_env, parse_list};

/// Persona voices read from the environment, keyed by persona id.
pub(crate) const PERSONA_VOICE_VARS: &[(&str, &str)] = &[
    ("grampa", "ELEVEN_GRAMPA"),
    ("grandma", "ELEVEN_GRANDMA"),
    ("mom", "ELEVEN_MOM"),
    ("dad", "ELEVEN_DAD"),
];

#[derive(Debug, Default)]
pub(crate) struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,

    pub deepgram_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,

    pub deepgram_model: Option<String>,
    pub deepgram_language: Option<String>,
    pub deepgram_vad_events: Option<bool>,
    pub openai_model: Option<String>,
    pub elevenlabs_model: Option<String>,

    /// (persona id, voice id)
    pub persona_voices: Vec<(String, String)>,
    pub default_persona: Option<String>,

    pub silence_ms: Option<u64>,
    pub window_ms: Option<u64>,
    pub max_nudges_per_min: Option<u32>,
    pub nudge_policy: Option<NudgePolicy>,

    pub safety_patterns: Option<Vec<String>>,
    pub safety_announcement: Option<String>,

    pub max_concurrent_calls: Option<usize>,
    pub max_connections_per_ip: Option<u32>,
}

impl EnvConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let deepgram_vad_events = match env_var("DEEPGRAM_VAD_EVENTS") {
            Some(raw) => Some(
                parse_bool(&raw)
                    .ok_or_else(|| format!("Invalid value for DEEPGRAM_VAD_EVENTS: '{raw}'"))?,
            ),
            None => None,
        };

        let persona_voices = PERSONA_VOICE_VARS
            .iter()
            .filter_map(|(persona, var)| env_var(var).map(|voice| (persona.to_string(), voice)))
            .collect();

        Ok(Self {
            host: env_var("HOST"),
            port: parse_env("PORT")?,
            tls_cert_path: env_var("TLS_CERT_PATH"),
            tls_key_path: env_var("TLS_KEY_PATH"),

            deepgram_api_key: env_var("DEEPGRAM_API_KEY"),
            openai_api_key: env_var("OPENAI_API_KEY"),
            elevenlabs_api_key: env_var("ELEVENLABS_API_KEY"),
            twilio_account_sid: env_var("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: env_var("TWILIO_AUTH_TOKEN"),

            deepgram_model: env_var("DEEPGRAM_MODEL"),
            deepgram_language: env_var("DEEPGRAM_LANGUAGE"),
            deepgram_vad_events,
            openai_model: env_var("OPENAI_MODEL"),
            elevenlabs_model: env_var("ELEVENLABS_MODEL"),

            persona_voices,
            default_persona: env_var("DEFAULT_PERSONA"),

            silence_ms: parse_env("SILENCE_MS")?,
            window_ms: parse_env("WINDOW_MS")?,
            max_nudges_per_min: parse_env("MAX_NUDGES_PER_MIN")?,
            nudge_policy: parse_env("NUDGE_POLICY")?,

            safety_patterns: env_var("SAFETY_PATTERNS").map(|raw| parse_list(&raw)),
            safety_announcement: env_var("SAFETY_ANNOUNCEMENT"),

            max_concurrent_calls: parse_env("MAX_CONCURRENT_CALLS")?,
            max_connections_per_ip: parse_env("MAX_CONNECTIONS_PER_IP")?,
        })
    }
}
