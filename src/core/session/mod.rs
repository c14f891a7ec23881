//! Turn-taking and safety orchestration for one phone call.
//!
//! - [`window`]: rolling transcript window
//! - [`silence`]: silence/turn detector
//! - [`nudge`]: nudge rate limiter
//! - [`safety`]: crisis-language interceptor
//! - [`playback`]: outbound speech handle and barge-in
//! - [`orchestrator`]: the [`CallSession`] state machine composing them

mod events;
pub mod nudge;
mod orchestrator;
pub mod playback;
pub mod safety;
pub mod silence;
mod sink;
mod state;
pub mod window;

#[cfg(test)]
mod tests;

pub use events::{SessionEvent, SpeechId};
pub use nudge::NudgeLimiter;
pub use orchestrator::{CallSession, MAILBOX_CAPACITY, SessionDeps, SessionSettings, mailbox};
pub use playback::{Cancelled, PlaybackController, SpeakError, SpeechPhase};
pub use safety::SafetyInterceptor;
pub use silence::SilenceDetector;
pub use sink::{MediaSink, SinkError};
pub use state::SessionState;
pub use window::{TranscriptSegment, TranscriptWindow};
