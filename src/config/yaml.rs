use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use super::pacing::{NudgePolicy, PacingOverrides};

/// Complete YAML configuration structure
///
/// All fields are optional so a file can override only what it needs; the
/// rest comes from environment variables and defaults.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8080
///   tls:
///     enabled: true
///     cert_path: "/etc/listenly/cert.pem"
///     key_path: "/etc/listenly/key.pem"
///
/// providers:
///   deepgram_api_key: "dg-key"
///   openai_api_key: "sk-key"
///   elevenlabs_api_key: "xi-key"
///   twilio_account_sid: "AC123"
///   twilio_auth_token: "token"
///
/// stt:
///   model: "nova-2"
///   language: "en-US"
///   vad_events: true
///
/// reflection:
///   model: "gpt-4o-mini"
///   temperature: 0.2
///
/// tts:
///   model: "eleven_monolingual_v1"
///   stability: 0.55
///
/// pacing:
///   silence_ms: 1800
///   window_ms: 40000
///   max_nudges_per_window: 3
///   nudge_window_ms: 60000
///   nudge_policy: "consume"
///
/// safety:
///   announcement: "Please call 988."
///   patterns:
///     - "\\bkill myself\\b"
///
/// personas:
///   default: "grandma"
///   definitions:
///     grandma:
///       voice_id: "voice-abc"
///       pacing:
///         silence_ms: 2400
///     uncle:
///       voice_id: "voice-xyz"
///       opening: "Hey, I'm here."
///
/// security:
///   max_concurrent_calls: 50
///   max_connections_per_ip: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub providers: Option<ProvidersYaml>,
    pub stt: Option<SttYaml>,
    pub reflection: Option<ReflectionYaml>,
    pub tts: Option<TtsYaml>,
    pub pacing: Option<PacingYaml>,
    pub safety: Option<SafetyYaml>,
    pub personas: Option<PersonasYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Provider credentials from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub deepgram_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
}

/// Speech-to-text settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SttYaml {
    pub model: Option<String>,
    pub language: Option<String>,
    pub vad_events: Option<bool>,
    pub endpoint: Option<String>,
}

/// Reflection generator settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ReflectionYaml {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub endpoint: Option<String>,
}

/// Text-to-speech settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TtsYaml {
    pub model: Option<String>,
    pub audio_format: Option<String>,
    pub endpoint: Option<String>,
    pub stability: Option<f32>,
    pub similarity_boost: Option<f32>,
    pub style: Option<f32>,
    pub use_speaker_boost: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PacingYaml {
    pub silence_ms: Option<u64>,
    pub window_ms: Option<u64>,
    pub max_nudges_per_window: Option<u32>,
    pub nudge_window_ms: Option<u64>,
    pub nudge_policy: Option<NudgePolicy>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SafetyYaml {
    /// Replaces the built-in pattern list when present
    pub patterns: Option<Vec<String>>,
    pub announcement: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PersonasYaml {
    pub default: Option<String>,
    /// Keyed by persona id; known ids are patched, new ids are added
    pub definitions: HashMap<String, PersonaYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PersonaYaml {
    pub voice_id: Option<String>,
    pub opening: Option<String>,
    pub pacing: Option<PacingOverrides>,
}

/// Connection limits from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub max_concurrent_calls: Option<usize>,
    pub max_connections_per_ip: Option<u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 9000
  tls:
    enabled: true
    cert_path: "/tmp/cert.pem"
    key_path: "/tmp/key.pem"

providers:
  deepgram_api_key: "dg-key"
  openai_api_key: "sk-key"
  elevenlabs_api_key: "xi-key"
  twilio_account_sid: "AC123"
  twilio_auth_token: "tw-token"

stt:
  model: "nova-2-phonecall"
  vad_events: true

reflection:
  temperature: 0.5

pacing:
  silence_ms: 2000
  nudge_policy: "refund"

safety:
  announcement: "Call 988."
  patterns:
    - "\\bcrisis\\b"

personas:
  default: "mom"
  definitions:
    mom:
      voice_id: "voice-mom"
      pacing:
        silence_ms: 2500
    uncle:
      voice_id: "voice-uncle"
      opening: "Hey there."

security:
  max_concurrent_calls: 20
  max_connections_per_ip: 4
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(9000));
        assert_eq!(server.tls.as_ref().unwrap().enabled, Some(true));

        let providers = config.providers.as_ref().unwrap();
        assert_eq!(providers.twilio_account_sid.as_deref(), Some("AC123"));

        assert_eq!(
            config.stt.as_ref().unwrap().model.as_deref(),
            Some("nova-2-phonecall")
        );
        assert_eq!(config.reflection.as_ref().unwrap().temperature, Some(0.5));

        let pacing = config.pacing.as_ref().unwrap();
        assert_eq!(pacing.silence_ms, Some(2000));
        assert_eq!(pacing.nudge_policy, Some(NudgePolicy::Refund));
        assert!(pacing.window_ms.is_none());

        let safety = config.safety.as_ref().unwrap();
        assert_eq!(safety.patterns.as_ref().unwrap(), &vec![r"\bcrisis\b".to_string()]);

        let personas = config.personas.as_ref().unwrap();
        assert_eq!(personas.default.as_deref(), Some("mom"));
        let mom = &personas.definitions["mom"];
        assert_eq!(mom.voice_id.as_deref(), Some("voice-mom"));
        assert_eq!(mom.pacing.unwrap().silence_ms, Some(2500));
        assert!(mom.opening.is_none());
        assert_eq!(
            personas.definitions["uncle"].opening.as_deref(),
            Some("Hey there.")
        );

        let security = config.security.as_ref().unwrap();
        assert_eq!(security.max_concurrent_calls, Some(20));
        assert_eq!(security.max_connections_per_ip, Some(4));
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.pacing.is_none());
        assert!(config.personas.is_none());
    }

    #[test]
    fn test_invalid_nudge_policy_rejected() {
        let result: Result<YamlConfig, _> = serde_yaml::from_str("pacing:\n  nudge_policy: sometimes\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "server:\n  host: \"localhost\"\n  port: 3000\n").unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();
        let server = config.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("localhost"));
        assert_eq!(server.port, Some(3000));
    }

    #[test]
    fn test_from_file_not_found() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let result = YamlConfig::from_file(&path);

        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");
        fs::write(&config_path, "invalid: yaml: content:").unwrap();

        let result = YamlConfig::from_file(&config_path);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }
}
