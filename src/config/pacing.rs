//! Turn-taking pacing parameters.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pause after the last final transcript before a reflection is attempted.
pub const DEFAULT_SILENCE_MS: u64 = 1800;
/// How far back the transcript window reaches.
pub const DEFAULT_WINDOW_MS: u64 = 40_000;
/// Maximum unprompted utterances per nudge window.
pub const DEFAULT_MAX_NUDGES: u32 = 3;
/// Length of the rolling nudge window.
pub const DEFAULT_NUDGE_WINDOW_MS: u64 = 60_000;

/// What happens to a reserved nudge when the reservation produced no speech
/// (silent, empty or failed reflection, barge-in while reflecting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NudgePolicy {
    /// The slot stays used
    #[default]
    Consume,
    /// The slot is returned to the limiter
    Refund,
}

impl FromStr for NudgePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "consume" => Ok(NudgePolicy::Consume),
            "refund" => Ok(NudgePolicy::Refund),
            other => Err(format!(
                "Invalid nudge policy '{other}'. Expected 'consume' or 'refund'"
            )),
        }
    }
}

/// Per-persona overrides; unset fields inherit the server pacing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingOverrides {
    pub silence_ms: Option<u64>,
    pub window_ms: Option<u64>,
    pub max_nudges_per_window: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    pub silence_ms: u64,
    pub window_ms: u64,
    pub max_nudges_per_window: u32,
    pub nudge_window_ms: u64,
    pub nudge_policy: NudgePolicy,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            silence_ms: DEFAULT_SILENCE_MS,
            window_ms: DEFAULT_WINDOW_MS,
            max_nudges_per_window: DEFAULT_MAX_NUDGES,
            nudge_window_ms: DEFAULT_NUDGE_WINDOW_MS,
            nudge_policy: NudgePolicy::default(),
        }
    }
}

impl PacingConfig {
    pub fn silence(&self) -> Duration {
        Duration::from_millis(self.silence_ms)
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn nudge_window(&self) -> Duration {
        Duration::from_millis(self.nudge_window_ms)
    }

    /// Apply persona overrides on top of this configuration.
    pub fn with_overrides(&self, overrides: &PacingOverrides) -> Self {
        Self {
            silence_ms: overrides.silence_ms.unwrap_or(self.silence_ms),
            window_ms: overrides.window_ms.unwrap_or(self.window_ms),
            max_nudges_per_window: overrides
                .max_nudges_per_window
                .unwrap_or(self.max_nudges_per_window),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let pacing = PacingConfig::default();
        assert_eq!(pacing.silence(), Duration::from_millis(1800));
        assert_eq!(pacing.window(), Duration::from_secs(40));
        assert_eq!(pacing.max_nudges_per_window, 3);
        assert_eq!(pacing.nudge_window(), Duration::from_secs(60));
        assert_eq!(pacing.nudge_policy, NudgePolicy::Consume);
    }

    #[test]
    fn test_overrides() {
        let pacing = PacingConfig::default().with_overrides(&PacingOverrides {
            silence_ms: Some(2500),
            window_ms: None,
            max_nudges_per_window: Some(1),
        });
        assert_eq!(pacing.silence_ms, 2500);
        assert_eq!(pacing.window_ms, DEFAULT_WINDOW_MS);
        assert_eq!(pacing.max_nudges_per_window, 1);
        assert_eq!(pacing.nudge_window_ms, DEFAULT_NUDGE_WINDOW_MS);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("Refund".parse::<NudgePolicy>(), Ok(NudgePolicy::Refund));
        assert_eq!(" consume ".parse::<NudgePolicy>(), Ok(NudgePolicy::Consume));
        assert!("maybe".parse::<NudgePolicy>().is_err());
    }
}
