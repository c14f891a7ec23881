/// Lifecycle of one call session.
///
/// ```text
/// Connecting ─▶ Listening ⇄ Reflecting ─▶ Speaking ─▶ Listening
///                   any non-terminal ─▶ SafetyEscalated ─▶ Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Socket accepted, no media or start signal yet
    Connecting,
    Listening,
    /// A reflection request is in flight
    Reflecting,
    /// Synthesized audio is streaming into the call
    Speaking,
    /// Crisis language detected; nothing else may happen
    SafetyEscalated,
    Closed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::SafetyEscalated | SessionState::Closed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::Listening => "listening",
            SessionState::Reflecting => "reflecting",
            SessionState::Speaking => "speaking",
            SessionState::SafetyEscalated => "safety_escalated",
            SessionState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
