//! Configuration validation, run after merging.

use super::pacing::PacingConfig;
use super::persona::PersonaRegistry;
use super::safety::SafetyConfig;
use super::TlsConfig;

/// Reject pacing values the turn-taking loop cannot work with.
pub fn validate_pacing(pacing: &PacingConfig) -> Result<(), Box<dyn std::error::Error>> {
    if pacing.silence_ms == 0 {
        return Err("pacing.silence_ms must be greater than 0".into());
    }
    if pacing.window_ms == 0 {
        return Err("pacing.window_ms must be greater than 0".into());
    }
    if pacing.nudge_window_ms == 0 {
        return Err("pacing.nudge_window_ms must be greater than 0".into());
    }
    if pacing.max_nudges_per_window == 0 {
        return Err("pacing.max_nudges_per_window must be greater than 0".into());
    }
    Ok(())
}

/// Every pattern must compile, and an empty list would disable the safety
/// path entirely.
pub fn validate_safety(safety: &SafetyConfig) -> Result<(), Box<dyn std::error::Error>> {
    if safety.patterns.is_empty() {
        return Err("safety.patterns must contain at least one pattern".into());
    }
    for pattern in &safety.patterns {
        regex::RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| format!("Invalid safety pattern '{pattern}': {e}"))?;
    }
    if safety.announcement.trim().is_empty() {
        return Err("safety.announcement must not be empty".into());
    }
    Ok(())
}

/// The default persona must exist, and persona overrides follow the same
/// rules as the server pacing.
pub fn validate_personas(personas: &PersonaRegistry) -> Result<(), Box<dyn std::error::Error>> {
    if personas.default_persona().is_none() {
        return Err(format!(
            "Default persona '{}' is not defined. Known personas: {}",
            personas.default_id(),
            personas.ids().join(", ")
        )
        .into());
    }
    for id in personas.ids() {
        let Some(persona) = personas.get(id) else {
            continue;
        };
        let overrides = persona.pacing;
        if overrides.silence_ms == Some(0)
            || overrides.window_ms == Some(0)
            || overrides.max_nudges_per_window == Some(0)
        {
            return Err(format!("Persona '{id}' has a zero pacing override").into());
        }
    }
    Ok(())
}

pub fn validate_tls(tls: &Option<TlsConfig>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(tls) = tls {
        if !tls.cert_path.exists() {
            return Err(format!(
                "TLS certificate file not found: {}",
                tls.cert_path.display()
            )
            .into());
        }
        if !tls.key_path.exists() {
            return Err(format!("TLS key file not found: {}", tls.key_path.display()).into());
        }
    }
    Ok(())
}
