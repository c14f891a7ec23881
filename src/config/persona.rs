//! Listener personas: voice, opening line and pacing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::pacing::PacingOverrides;

/// Persona used when none is requested or the requested one is unknown.
pub const DEFAULT_PERSONA: &str = "grampa";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    /// TTS voice; without one the persona cannot speak
    #[serde(default)]
    pub voice_id: Option<String>,
    /// Spoken once when the call starts
    pub opening: String,
    #[serde(default)]
    pub pacing: PacingOverrides,
}

impl Persona {
    pub fn new(id: &str, opening: &str) -> Self {
        Self {
            id: id.to_string(),
            voice_id: None,
            opening: opening.to_string(),
            pacing: PacingOverrides::default(),
        }
    }

    /// Voice id when one is configured and non-blank.
    pub fn voice(&self) -> Option<&str> {
        self.voice_id.as_deref().filter(|v| !v.trim().is_empty())
    }
}

/// Built-in personas without voices; voices come from configuration.
pub fn builtin_personas() -> Vec<Persona> {
    vec![
        Persona::new("grampa", "I'm ready, kiddo. Tell me what you've got."),
        Persona::new("grandma", "I'm right here with you."),
        Persona::new("mom", "I'm here. Take your time."),
        Persona::new("dad", "I'm listening. Go ahead."),
    ]
}

/// Personas keyed by id, with a fallback.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: HashMap<String, Persona>,
    default_id: String,
}

impl Default for PersonaRegistry {
    fn default() -> Self {
        Self::new(builtin_personas(), DEFAULT_PERSONA)
    }
}

impl PersonaRegistry {
    pub fn new(personas: Vec<Persona>, default_id: &str) -> Self {
        Self {
            personas: personas
                .into_iter()
                .map(|p| (p.id.to_lowercase(), p))
                .collect(),
            default_id: default_id.to_lowercase(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.get(&id.trim().to_lowercase())
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Persona> {
        self.personas.get_mut(&id.trim().to_lowercase())
    }

    /// Insert or replace a persona.
    pub fn insert(&mut self, persona: Persona) {
        self.personas.insert(persona.id.to_lowercase(), persona);
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    pub fn set_default(&mut self, id: &str) {
        self.default_id = id.trim().to_lowercase();
    }

    pub fn default_persona(&self) -> Option<&Persona> {
        self.personas.get(&self.default_id)
    }

    /// Resolve a requested id, falling back to the default persona.
    ///
    /// Returns `None` only when the default itself is missing, which
    /// validation rejects at startup.
    pub fn resolve(&self, requested: Option<&str>) -> Option<&Persona> {
        requested
            .and_then(|id| self.get(id))
            .or_else(|| self.default_persona())
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.personas.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
