//! Per-call session state machine.
//!
//! A [`CallSession`] is owned by exactly one task. Everything that can change
//! it arrives as a [`SessionEvent`] on its mailbox, and the silence deadline
//! is polled by the same loop, so no locks guard session state.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

use super::events::{SessionEvent, SpeechId};
use super::nudge::NudgeLimiter;
use super::playback::{PlaybackController, SpeechPhase};
use super::safety::SafetyInterceptor;
use super::silence::SilenceDetector;
use super::sink::MediaSink;
use super::state::SessionState;
use super::window::{TranscriptSegment, TranscriptWindow};
use crate::config::{NudgePolicy, PacingConfig, Persona};
use crate::core::call_control::CallControl;
use crate::core::reflection::{Reflection, ReflectionError, ReflectionGenerator};
use crate::core::tts::{BaseTTS, TTSError};

/// Mailbox depth per call. Audio chunks from synthesis are the bulk of it.
pub const MAILBOX_CAPACITY: usize = 256;

/// Create a session mailbox.
pub fn mailbox() -> (mpsc::Sender<SessionEvent>, mpsc::Receiver<SessionEvent>) {
    mpsc::channel(MAILBOX_CAPACITY)
}

/// Per-call settings resolved from server configuration and persona.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub persona: Persona,
    /// Effective pacing, persona overrides already applied
    pub pacing: PacingConfig,
    pub safety_announcement: String,
}

/// Shared collaborators.
#[derive(Clone)]
pub struct SessionDeps {
    pub safety: Arc<SafetyInterceptor>,
    pub reflection: Option<Arc<dyn ReflectionGenerator>>,
    pub tts: Option<Arc<dyn BaseTTS>>,
    pub call_control: Arc<dyn CallControl>,
    pub sink: Arc<dyn MediaSink>,
}

pub struct CallSession {
    session_id: String,
    call_id: Option<String>,
    settings: SessionSettings,
    created_at: Instant,
    state: SessionState,

    window: TranscriptWindow,
    detector: SilenceDetector,
    limiter: NudgeLimiter,
    playback: PlaybackController,
    last_final_at: Option<Instant>,

    safety_escalated: bool,
    opening_spoken: bool,

    safety: Arc<SafetyInterceptor>,
    reflection: Option<Arc<dyn ReflectionGenerator>>,
    call_control: Arc<dyn CallControl>,
    sink: Arc<dyn MediaSink>,
    events: mpsc::WeakSender<SessionEvent>,
}

impl CallSession {
    /// Create a session bound to `events`, the sending half of its mailbox.
    ///
    /// Only a weak reference is kept, so the mailbox closes once every
    /// external sender and in-flight task is gone.
    pub fn new(
        settings: SessionSettings,
        deps: SessionDeps,
        events: &mpsc::Sender<SessionEvent>,
    ) -> Self {
        let pacing = settings.pacing;
        let events = events.downgrade();

        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            call_id: None,
            created_at: Instant::now(),
            state: SessionState::Connecting,
            window: TranscriptWindow::new(pacing.window()),
            detector: SilenceDetector::new(pacing.silence()),
            limiter: NudgeLimiter::new(
                pacing.max_nudges_per_window,
                pacing.nudge_window(),
                pacing.silence(),
            ),
            playback: PlaybackController::new(deps.tts, events.clone()),
            last_final_at: None,
            safety_escalated: false,
            opening_spoken: false,
            safety: deps.safety,
            reflection: deps.reflection,
            call_control: deps.call_control,
            sink: deps.sink,
            events,
            settings,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_safety_escalated(&self) -> bool {
        self.safety_escalated
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn call_id(&self) -> Option<&str> {
        self.call_id.as_deref()
    }

    /// Pending silence deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.state.is_terminal() {
            return None;
        }
        self.detector.deadline()
    }

    /// Nudges used in the current window.
    pub fn nudge_count(&mut self) -> usize {
        self.limiter.count(Instant::now())
    }

    /// Drive the session until it closes or its mailbox does.
    pub async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) {
        info!(
            session_id = %self.session_id,
            persona = %self.settings.persona.id,
            "Call session started"
        );

        while !self.state.is_terminal() {
            let deadline = self.next_deadline();
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => self.close("mailbox closed"),
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.poll_timers();
                }
            }
        }

        self.teardown();
        info!(
            session_id = %self.session_id,
            call_id = self.call_id.as_deref().unwrap_or(""),
            duration_ms = self.created_at.elapsed().as_millis() as u64,
            safety_escalated = self.safety_escalated,
            "Call session ended"
        );
    }

    /// Process one event. Invalid (state, event) pairs are no-ops.
    pub fn handle(&mut self, event: SessionEvent) {
        if self.state.is_terminal() {
            return;
        }

        // Barge-in runs before anything else looks at the event.
        if event.is_caller_activity() && self.playback.is_active() {
            self.barge_in();
        }

        let now = Instant::now();
        match event {
            SessionEvent::Start { call_id } => {
                info!(session_id = %self.session_id, call_id = %call_id, "Call identified");
                self.call_id = Some(call_id);
                self.enter_listening();
            }
            SessionEvent::Media => {
                if self.state == SessionState::Connecting {
                    self.enter_listening();
                }
            }
            SessionEvent::Transcript { text, is_final } => {
                if is_final {
                    self.on_final_transcript(text, now);
                }
            }
            SessionEvent::CallerActivity => {}
            SessionEvent::ReflectionReady { id, outcome } => self.on_reflection(id, outcome),
            SessionEvent::SpeechAudio { id, chunk } => {
                if self.playback.on_audio(id)
                    && let Err(e) = self.sink.send_audio(chunk)
                {
                    warn!(session_id = %self.session_id, "Dropping outbound audio: {}", e);
                }
            }
            SessionEvent::SpeechFinished { id, outcome } => self.on_speech_finished(id, outcome),
            SessionEvent::Stop => self.close("stop"),
            SessionEvent::Hangup => self.close("hangup"),
        }
    }

    /// Check the silence deadline and attempt a reflection when it passed.
    pub fn poll_timers(&mut self) {
        let now = Instant::now();
        if !self.detector.fire(now) {
            return;
        }
        if self.state != SessionState::Listening {
            debug!(session_id = %self.session_id, state = %self.state, "Silence timeout ignored");
            return;
        }
        self.try_reflect(now);
    }

    fn enter_listening(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Listening;
        }
        if self.opening_spoken {
            return;
        }
        self.opening_spoken = true;

        let opening = self.settings.persona.opening.clone();
        match self.playback.speak(&opening, self.settings.persona.voice()) {
            Ok(id) => {
                debug!(session_id = %self.session_id, speech_id = id, "Speaking opening line");
                self.state = SessionState::Speaking;
            }
            Err(e) => {
                warn!(
                    session_id = %self.session_id,
                    persona = %self.settings.persona.id,
                    "Skipping opening line: {}", e
                );
            }
        }
    }

    fn on_final_transcript(&mut self, text: String, now: Instant) {
        if text.trim().is_empty() {
            return;
        }
        if self.safety.scan(&text) {
            self.escalate();
            return;
        }
        if self.state == SessionState::Connecting {
            return;
        }

        self.window
            .append(TranscriptSegment::final_text(text, now), now);
        self.last_final_at = Some(now);
        self.detector.arm(now);
    }

    fn try_reflect(&mut self, now: Instant) {
        let Some(generator) = self.reflection.clone() else {
            debug!(session_id = %self.session_id, "No reflection generator configured");
            return;
        };

        let window_text = self.window.snapshot(now);
        if window_text.is_empty() {
            return;
        }

        if !self
            .limiter
            .try_reserve(now, self.last_final_at, self.playback.is_active())
        {
            debug!(session_id = %self.session_id, "Nudge not granted");
            return;
        }

        let id = match self.playback.reserve() {
            Ok(id) => id,
            Err(e) => {
                self.limiter.refund();
                debug!(session_id = %self.session_id, "Cannot reserve playback: {}", e);
                return;
            }
        };
        let (Some(token), Some(events)) = (self.playback.token(), self.events.upgrade()) else {
            self.playback.release(id);
            self.limiter.refund();
            return;
        };

        self.state = SessionState::Reflecting;
        debug!(session_id = %self.session_id, speech_id = id, "Requesting reflection");

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => return,
                outcome = generator.reflect(&window_text) => outcome,
            };
            let _ = events.send(SessionEvent::ReflectionReady { id, outcome }).await;
        });
    }

    fn on_reflection(&mut self, id: SpeechId, outcome: Result<Reflection, ReflectionError>) {
        if !self.playback.is_current(id) || self.playback.phase() != Some(SpeechPhase::Reflecting)
        {
            debug!(session_id = %self.session_id, speech_id = id, "Stale reflection discarded");
            return;
        }

        let reflection = match outcome {
            Ok(reflection) if !reflection.is_silent() => reflection,
            Ok(_) => {
                debug!(session_id = %self.session_id, "Reflection chose silence");
                self.abandon_reservation(id);
                return;
            }
            Err(e) => {
                warn!(session_id = %self.session_id, "Reflection failed: {}", e);
                self.abandon_reservation(id);
                return;
            }
        };

        match self
            .playback
            .speak(&reflection.text, self.settings.persona.voice())
        {
            Ok(_) => {
                self.state = SessionState::Speaking;
            }
            Err(e) => {
                warn!(session_id = %self.session_id, "Cannot speak reflection: {}", e);
                self.abandon_reservation(id);
            }
        }
    }

    fn on_speech_finished(&mut self, id: SpeechId, outcome: Result<(), TTSError>) {
        if !self.playback.finish(id) {
            return;
        }
        if let Err(e) = outcome {
            warn!(session_id = %self.session_id, speech_id = id, "Synthesis failed: {}", e);
        }
        if self.state == SessionState::Speaking {
            self.state = SessionState::Listening;
        }
    }

    /// Release a reflecting handle that produced no speech.
    fn abandon_reservation(&mut self, id: SpeechId) {
        self.playback.release(id);
        self.refund_if_configured();
        self.state = SessionState::Listening;
    }

    fn refund_if_configured(&mut self) {
        if self.settings.pacing.nudge_policy == NudgePolicy::Refund {
            self.limiter.refund();
        }
    }

    fn barge_in(&mut self) {
        let Some(cancelled) = self.playback.cancel() else {
            return;
        };
        info!(
            session_id = %self.session_id,
            speech_id = cancelled.id,
            "Barge-in: caller spoke over outbound speech"
        );

        if cancelled.audio_started
            && let Err(e) = self.sink.clear()
        {
            warn!(session_id = %self.session_id, "Failed to clear outbound audio: {}", e);
        }
        if cancelled.phase == SpeechPhase::Reflecting {
            self.refund_if_configured();
        }
        self.state = SessionState::Listening;
    }

    /// Crisis path. Runs at most once per session and cannot be pre-empted.
    fn escalate(&mut self) {
        if self.safety_escalated {
            return;
        }
        self.safety_escalated = true;
        error!(
            session_id = %self.session_id,
            call_id = self.call_id.as_deref().unwrap_or(""),
            "Safety escalation triggered"
        );

        self.playback.seal();
        if let Some(cancelled) = self.playback.cancel()
            && cancelled.audio_started
            && let Err(e) = self.sink.clear()
        {
            warn!(session_id = %self.session_id, "Failed to clear outbound audio: {}", e);
        }
        self.detector.cancel();
        self.state = SessionState::SafetyEscalated;

        let call_control = self.call_control.clone();
        let sink = self.sink.clone();
        let call_id = self.call_id.clone().unwrap_or_default();
        let announcement = self.settings.safety_announcement.clone();
        let session_id = self.session_id.clone();
        tokio::spawn(async move {
            if let Err(e) = call_control.escalate(&call_id, &announcement).await {
                error!(
                    session_id = %session_id,
                    call_id = %call_id,
                    "Safety escalation command failed: {}", e
                );
                // Without the redirect nobody else ends the media stream.
                sink.close();
            }
        });

        self.state = SessionState::Closed;
    }

    fn close(&mut self, reason: &str) {
        if self.state == SessionState::Closed {
            return;
        }
        info!(session_id = %self.session_id, reason, "Closing call session");
        self.playback.seal();
        self.playback.cancel();
        self.detector.cancel();
        self.state = SessionState::Closed;
        self.sink.close();
    }

    fn teardown(&mut self) {
        self.playback.seal();
        self.playback.cancel();
        self.detector.cancel();
    }
}
