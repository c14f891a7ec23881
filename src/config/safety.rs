//! Crisis-language detection settings.

/// Case-insensitive patterns matched against every final transcript.
pub const DEFAULT_SAFETY_PATTERNS: &[&str] = &[
    r"\bkill(ing)? myself\b",
    r"\bsuicid",
    r"\bend (it all|my life)\b",
    r"\bwant(ed)? to die\b",
    r"\bhurt(ing)? myself\b",
    r"\bself[- ]?harm",
    r"\bno reason to live\b",
    r"\bbetter off dead\b",
    r"\btake my (own )?life\b",
    r"\bcut(ting)? myself\b",
];

/// Spoken to the caller before the call is ended.
pub const DEFAULT_SAFETY_ANNOUNCEMENT: &str = "It sounds like you may be in danger. \
Please call or text 988 to reach the Suicide and Crisis Lifeline, \
or call 911 if you are in immediate danger. You are not alone.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyConfig {
    pub patterns: Vec<String>,
    pub announcement: String,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_SAFETY_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            announcement: DEFAULT_SAFETY_ANNOUNCEMENT.to_string(),
        }
    }
}
