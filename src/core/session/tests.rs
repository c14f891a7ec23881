//! Scenario tests for the call session, driven with paused time and mock
//! collaborators.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::*;
use crate::config::{
    DEFAULT_SAFETY_PATTERNS, NudgePolicy, PacingConfig, PacingOverrides, Persona,
};
use crate::core::call_control::{CallControl, CallControlError};
use crate::core::reflection::{
    Reflection, ReflectionError, ReflectionGenerator, ReflectionIntent,
};
use crate::core::tts::{AudioStream, BaseTTS, TTSError, TTSResult};

// =============================================================================
// Mock collaborators
// =============================================================================

/// Decrements the live-stream counter when the stream is dropped.
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct MockTts {
    /// Keep streams open after the chunks until dropped
    hold_open: bool,
    chunks: Vec<Bytes>,
    calls: Mutex<Vec<String>>,
    live: Arc<AtomicUsize>,
    max_live: AtomicUsize,
}

impl MockTts {
    fn finishing(chunks: usize) -> Self {
        Self {
            chunks: (0..chunks).map(|i| Bytes::from(vec![i as u8; 160])).collect(),
            ..Default::default()
        }
    }

    fn holding(chunks: usize) -> Self {
        Self {
            hold_open: true,
            ..Self::finishing(chunks)
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BaseTTS for MockTts {
    async fn synthesize(&self, text: &str, _voice_id: &str) -> TTSResult<AudioStream> {
        self.calls.lock().push(text.to_string());
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);

        let guard = LiveGuard(self.live.clone());
        let chunks = self.chunks.clone();
        let hold_open = self.hold_open;
        Ok(Box::pin(async_stream::stream! {
            let _guard = guard;
            for chunk in chunks {
                yield Ok::<Bytes, TTSError>(chunk);
            }
            if hold_open {
                futures::future::pending::<()>().await;
            }
        }))
    }

    fn get_provider_info(&self) -> serde_json::Value {
        serde_json::json!({ "provider": "mock" })
    }
}

#[derive(Default)]
struct MockReflection {
    /// Never answer
    hold: bool,
    /// Scripted answers; once exhausted every call reflects
    script: Mutex<VecDeque<Result<Reflection, ReflectionError>>>,
    inputs: Mutex<Vec<String>>,
}

impl MockReflection {
    fn scripted(answers: Vec<Result<Reflection, ReflectionError>>) -> Self {
        Self {
            script: Mutex::new(answers.into()),
            ..Default::default()
        }
    }

    fn holding() -> Self {
        Self {
            hold: true,
            ..Default::default()
        }
    }

    fn inputs(&self) -> Vec<String> {
        self.inputs.lock().clone()
    }
}

fn reflect(text: &str) -> Reflection {
    Reflection {
        intent: ReflectionIntent::Reflect,
        text: text.to_string(),
        wait_seconds: None,
    }
}

fn silence() -> Reflection {
    Reflection {
        intent: ReflectionIntent::Silence,
        text: String::new(),
        wait_seconds: None,
    }
}

#[async_trait]
impl ReflectionGenerator for MockReflection {
    async fn reflect(&self, window_text: &str) -> Result<Reflection, ReflectionError> {
        self.inputs.lock().push(window_text.to_string());
        if self.hold {
            futures::future::pending::<()>().await;
        }
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Ok(reflect("That sounds like a lot.")))
    }

    fn get_provider_info(&self) -> &'static str {
        "mock"
    }
}

#[derive(Default)]
struct MockCallControl {
    fail: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockCallControl {
    fn count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl CallControl for MockCallControl {
    async fn escalate(&self, call_id: &str, announcement: &str) -> Result<(), CallControlError> {
        self.calls
            .lock()
            .push((call_id.to_string(), announcement.to_string()));
        if self.fail {
            Err(CallControlError::NotConfigured)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SinkOp {
    Audio(Bytes),
    Clear,
    Close,
}

#[derive(Default)]
struct RecordingSink {
    ops: Mutex<Vec<SinkOp>>,
}

impl RecordingSink {
    fn ops(&self) -> Vec<SinkOp> {
        self.ops.lock().clone()
    }

    fn audio_count(&self) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, SinkOp::Audio(_)))
            .count()
    }

    fn count(&self, wanted: &SinkOp) -> usize {
        self.ops().iter().filter(|op| *op == wanted).count()
    }
}

impl MediaSink for RecordingSink {
    fn send_audio(&self, chunk: Bytes) -> Result<(), SinkError> {
        self.ops.lock().push(SinkOp::Audio(chunk));
        Ok(())
    }

    fn clear(&self) -> Result<(), SinkError> {
        self.ops.lock().push(SinkOp::Clear);
        Ok(())
    }

    fn close(&self) {
        self.ops.lock().push(SinkOp::Close);
    }
}

// =============================================================================
// Harness
// =============================================================================

const ANNOUNCEMENT: &str = "Please call 988. You are not alone.";

struct Harness {
    session: CallSession,
    tx: mpsc::Sender<SessionEvent>,
    rx: mpsc::Receiver<SessionEvent>,
    tts: Arc<MockTts>,
    reflection: Arc<MockReflection>,
    call_control: Arc<MockCallControl>,
    sink: Arc<RecordingSink>,
}

struct Setup {
    tts: MockTts,
    reflection: MockReflection,
    call_control: MockCallControl,
    voice: Option<&'static str>,
    opening: &'static str,
    pacing: PacingConfig,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            tts: MockTts::finishing(2),
            reflection: MockReflection::default(),
            call_control: MockCallControl::default(),
            voice: Some("voice-grampa"),
            opening: "",
            pacing: PacingConfig::default(),
        }
    }
}

impl Setup {
    fn build(self) -> Harness {
        let tts = Arc::new(self.tts);
        let reflection = Arc::new(self.reflection);
        let call_control = Arc::new(self.call_control);
        let sink = Arc::new(RecordingSink::default());

        let persona = Persona {
            id: "grampa".to_string(),
            voice_id: self.voice.map(str::to_string),
            opening: self.opening.to_string(),
            pacing: PacingOverrides::default(),
        };
        let settings = SessionSettings {
            persona,
            pacing: self.pacing,
            safety_announcement: ANNOUNCEMENT.to_string(),
        };
        let deps = SessionDeps {
            safety: Arc::new(SafetyInterceptor::new(DEFAULT_SAFETY_PATTERNS).unwrap()),
            reflection: Some(reflection.clone() as Arc<dyn ReflectionGenerator>),
            tts: Some(tts.clone() as Arc<dyn BaseTTS>),
            call_control: call_control.clone() as Arc<dyn CallControl>,
            sink: sink.clone() as Arc<dyn MediaSink>,
        };

        let (tx, rx) = mailbox();
        let session = CallSession::new(settings, deps, &tx);
        Harness {
            session,
            tx,
            rx,
            tts,
            reflection,
            call_control,
            sink,
        }
    }
}

impl Harness {
    /// Let spawned tasks run and feed everything they produced back into the
    /// session, until the mailbox stays empty.
    async fn pump(&mut self) {
        let mut idle_rounds = 0;
        while idle_rounds < 3 {
            for _ in 0..8 {
                tokio::task::yield_now().await;
            }
            let mut delivered = false;
            while let Ok(event) = self.rx.try_recv() {
                self.session.handle(event);
                delivered = true;
            }
            idle_rounds = if delivered { 0 } else { idle_rounds + 1 };
        }
    }

    async fn send(&mut self, event: SessionEvent) {
        self.session.handle(event);
        self.pump().await;
    }

    async fn start(&mut self) {
        self.send(SessionEvent::Start {
            call_id: "CA0001".to_string(),
        })
        .await;
    }

    async fn say(&mut self, text: &str) {
        self.send(SessionEvent::transcript(text, true)).await;
    }

    /// Advance paused time and run the session's timer check.
    async fn advance(&mut self, ms: u64) {
        tokio::time::advance(Duration::from_millis(ms)).await;
        self.session.poll_timers();
        self.pump().await;
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_starts_connecting_and_listens_on_start() {
    let mut h = Setup::default().build();
    assert_eq!(h.session.state(), SessionState::Connecting);

    h.start().await;
    assert_eq!(h.session.state(), SessionState::Listening);
    assert_eq!(h.session.call_id(), Some("CA0001"));
}

#[tokio::test(start_paused = true)]
async fn test_first_media_frame_enters_listening() {
    let mut h = Setup::default().build();
    h.send(SessionEvent::Media).await;
    assert_eq!(h.session.state(), SessionState::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_opening_line_spoken_once() {
    let mut h = Setup {
        opening: "I'm ready, kiddo. Tell me what you've got.",
        ..Default::default()
    }
    .build();

    h.send(SessionEvent::Media).await;
    h.start().await;
    h.send(SessionEvent::Media).await;

    assert_eq!(
        h.tts.calls(),
        vec!["I'm ready, kiddo. Tell me what you've got.".to_string()]
    );
    assert_eq!(h.sink.audio_count(), 2);
    assert_eq!(h.session.state(), SessionState::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_opening_line_skipped_without_voice() {
    let mut h = Setup {
        opening: "I'm here. Take your time.",
        voice: None,
        ..Default::default()
    }
    .build();

    h.start().await;
    assert!(h.tts.calls().is_empty());
    assert_eq!(h.session.state(), SessionState::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_stop_closes_session_and_sink() {
    let mut h = Setup::default().build();
    h.start().await;
    h.send(SessionEvent::Stop).await;

    assert_eq!(h.session.state(), SessionState::Closed);
    assert_eq!(h.sink.count(&SinkOp::Close), 1);

    // Closed is terminal.
    h.say("hello again").await;
    h.advance(5_000).await;
    assert!(h.reflection.inputs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_run_exits_when_mailbox_closes() {
    let h = Setup::default().build();
    let Harness {
        session, tx, rx, sink, ..
    } = h;

    tx.send(SessionEvent::Start {
        call_id: "CA0002".to_string(),
    })
    .await
    .unwrap();
    drop(tx);

    tokio::time::timeout(Duration::from_secs(5), session.run(rx))
        .await
        .unwrap();
    assert_eq!(sink.count(&SinkOp::Close), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_reflects_after_silence() {
    let h = Setup::default().build();
    let Harness {
        session,
        tx,
        rx,
        reflection,
        tts,
        ..
    } = h;

    let task = tokio::spawn(session.run(rx));
    tx.send(SessionEvent::Start {
        call_id: "CA0003".to_string(),
    })
    .await
    .unwrap();
    tx.send(SessionEvent::transcript("I feel", true)).await.unwrap();

    // The run loop sleeps until the silence deadline on its own.
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(reflection.inputs(), vec!["I feel".to_string()]);
    assert_eq!(tts.calls(), vec!["That sounds like a lot.".to_string()]);

    tx.send(SessionEvent::Hangup).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}

// =============================================================================
// Turn-taking
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_reflection_receives_window_after_silence() {
    let mut h = Setup {
        reflection: MockReflection::holding(),
        ..Default::default()
    }
    .build();
    h.start().await;

    h.say("I feel").await;
    tokio::time::advance(Duration::from_millis(500)).await;
    h.say("really stuck today").await;

    // The second final re-armed the deadline to t=2300.
    h.advance(1_799).await;
    assert_eq!(h.session.state(), SessionState::Listening);
    assert!(h.reflection.inputs().is_empty());

    h.advance(1).await;
    assert_eq!(h.session.state(), SessionState::Reflecting);
    assert_eq!(h.session.nudge_count(), 1);
    assert_eq!(
        h.reflection.inputs(),
        vec!["I feel really stuck today".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_interim_results_do_not_enter_window() {
    let mut h = Setup::default().build();
    h.start().await;

    h.send(SessionEvent::transcript("I", false)).await;
    h.say("I feel").await;
    h.send(SessionEvent::transcript("I feel tired", false)).await;
    h.advance(1_800).await;

    assert_eq!(h.reflection.inputs(), vec!["I feel".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_reflection_is_spoken_and_returns_to_listening() {
    let mut h = Setup::default().build();
    h.start().await;

    h.say("my dog died last week").await;
    h.advance(1_800).await;

    assert_eq!(h.tts.calls(), vec!["That sounds like a lot.".to_string()]);
    assert_eq!(h.sink.audio_count(), 2);
    assert_eq!(h.session.state(), SessionState::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_speaking_state_while_audio_flows() {
    let mut h = Setup {
        tts: MockTts::holding(3),
        ..Default::default()
    }
    .build();
    h.start().await;

    h.say("I got the job").await;
    h.advance(1_800).await;

    assert_eq!(h.session.state(), SessionState::Speaking);
    assert_eq!(h.sink.audio_count(), 3);
    assert_eq!(h.tts.live(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_silent_reflection_returns_to_listening() {
    let mut h = Setup {
        reflection: MockReflection::scripted(vec![Ok(silence())]),
        ..Default::default()
    }
    .build();
    h.start().await;

    h.say("hmm").await;
    h.advance(1_800).await;

    assert_eq!(h.session.state(), SessionState::Listening);
    assert!(h.tts.calls().is_empty());
    // Consume policy keeps the slot used.
    assert_eq!(h.session.nudge_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refund_policy_returns_slot_on_silence() {
    let mut h = Setup {
        reflection: MockReflection::scripted(vec![Ok(silence())]),
        pacing: PacingConfig {
            nudge_policy: NudgePolicy::Refund,
            ..Default::default()
        },
        ..Default::default()
    }
    .build();
    h.start().await;

    h.say("hmm").await;
    h.advance(1_800).await;

    assert_eq!(h.session.state(), SessionState::Listening);
    assert_eq!(h.session.nudge_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_text_reflection_is_silent() {
    let mut h = Setup {
        reflection: MockReflection::scripted(vec![Ok(reflect("   "))]),
        ..Default::default()
    }
    .build();
    h.start().await;

    h.say("well").await;
    h.advance(1_800).await;

    assert!(h.tts.calls().is_empty());
    assert_eq!(h.session.state(), SessionState::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_reflection_failure_returns_to_listening() {
    let mut h = Setup {
        reflection: MockReflection::scripted(vec![Err(ReflectionError::NetworkError(
            "timeout".to_string(),
        ))]),
        ..Default::default()
    }
    .build();
    h.start().await;

    h.say("it has been a hard month").await;
    h.advance(1_800).await;

    assert_eq!(h.session.state(), SessionState::Listening);
    assert!(h.tts.calls().is_empty());

    // The session keeps working afterwards.
    h.say("and today too").await;
    h.advance(1_800).await;
    assert_eq!(h.tts.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_voice_skips_speech() {
    let mut h = Setup {
        voice: None,
        ..Default::default()
    }
    .build();
    h.start().await;

    h.say("I don't know").await;
    h.advance(1_800).await;

    assert_eq!(h.reflection.inputs().len(), 1);
    assert!(h.tts.calls().is_empty());
    assert_eq!(h.session.state(), SessionState::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_empty_window_consumes_no_nudge() {
    let mut h = Setup {
        pacing: PacingConfig::default().with_overrides(&PacingOverrides {
            window_ms: Some(1_000),
            ..Default::default()
        }),
        ..Default::default()
    }
    .build();
    h.start().await;

    h.say("short").await;
    // The segment aged out of the 1 s window before the 1.8 s deadline.
    h.advance(1_800).await;

    assert!(h.reflection.inputs().is_empty());
    assert_eq!(h.session.nudge_count(), 0);
    assert_eq!(h.session.state(), SessionState::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_blank_final_does_not_arm_detector() {
    let mut h = Setup::default().build();
    h.start().await;
    h.say("   ").await;
    assert!(h.session.next_deadline().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_four_timeouts_in_a_minute_speak_three_times() {
    let mut h = Setup::default().build();
    h.start().await;

    for i in 0..4 {
        h.say(&format!("thought number {i}")).await;
        h.advance(1_800).await;
        h.advance(5_000).await;
    }

    assert_eq!(h.reflection.inputs().len(), 3);
    assert_eq!(h.tts.calls().len(), 3);
    assert_eq!(h.session.nudge_count(), 3);
    assert_eq!(h.session.state(), SessionState::Listening);

    // Once the first nudge ages out another one is allowed.
    tokio::time::advance(Duration::from_secs(60)).await;
    h.say("one more").await;
    h.advance(1_800).await;
    assert_eq!(h.tts.calls().len(), 4);
}

// =============================================================================
// Barge-in
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_barge_in_cancels_speech_and_clears_audio() {
    let mut h = Setup {
        tts: MockTts::holding(2),
        ..Default::default()
    }
    .build();
    h.start().await;

    h.say("I failed the exam").await;
    h.advance(1_800).await;
    assert_eq!(h.session.state(), SessionState::Speaking);

    h.send(SessionEvent::transcript("but", false)).await;

    assert_eq!(h.session.state(), SessionState::Listening);
    assert_eq!(h.sink.count(&SinkOp::Clear), 1);
    assert_eq!(h.tts.live(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_barge_in_happens_before_event_is_processed() {
    let mut h = Setup {
        tts: MockTts::holding(1),
        ..Default::default()
    }
    .build();
    h.start().await;
    h.say("first").await;
    h.advance(1_800).await;
    assert_eq!(h.session.state(), SessionState::Speaking);

    // Handle without pumping: the state flips within this single call.
    h.session.handle(SessionEvent::transcript("wait", true));
    assert_eq!(h.session.state(), SessionState::Listening);
    // The final still went through normal processing and re-armed.
    assert!(h.session.next_deadline().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_caller_activity_event_barges_in() {
    let mut h = Setup {
        tts: MockTts::holding(1),
        ..Default::default()
    }
    .build();
    h.start().await;
    h.say("first").await;
    h.advance(1_800).await;

    h.send(SessionEvent::CallerActivity).await;
    assert_eq!(h.session.state(), SessionState::Listening);
    assert_eq!(h.tts.live(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_barge_in_while_reflecting_discards_result() {
    let mut h = Setup::default().build();
    h.start().await;
    h.say("first").await;

    // Fire the timer without pumping so the reflection stays in flight.
    tokio::time::advance(Duration::from_millis(1_800)).await;
    h.session.poll_timers();
    assert_eq!(h.session.state(), SessionState::Reflecting);

    h.send(SessionEvent::transcript("actually", false)).await;
    assert_eq!(h.session.state(), SessionState::Listening);
    assert!(h.tts.calls().is_empty());
    // No audio had started, so nothing to clear.
    assert_eq!(h.sink.count(&SinkOp::Clear), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stale_audio_is_discarded() {
    let mut h = Setup {
        tts: MockTts::holding(1),
        ..Default::default()
    }
    .build();
    h.start().await;
    h.say("first").await;
    h.advance(1_800).await;
    h.send(SessionEvent::CallerActivity).await;
    let before = h.sink.audio_count();

    h.send(SessionEvent::SpeechAudio {
        id: 1,
        chunk: Bytes::from_static(&[0xff; 160]),
    })
    .await;
    h.send(SessionEvent::SpeechFinished { id: 1, outcome: Ok(()) })
        .await;

    assert_eq!(h.sink.audio_count(), before);
    assert_eq!(h.session.state(), SessionState::Listening);
}

#[tokio::test(start_paused = true)]
async fn test_at_most_one_live_stream() {
    let mut h = Setup {
        tts: MockTts::holding(1),
        opening: "I'm listening. Go ahead.",
        ..Default::default()
    }
    .build();
    h.start().await;

    for i in 0..5 {
        h.say(&format!("sentence {i}")).await;
        h.advance(1_800).await;
        h.send(SessionEvent::transcript("uh", false)).await;
        h.advance(20_000).await;
    }

    assert!(h.tts.calls().len() >= 2);
    assert_eq!(h.tts.max_live.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Safety
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_crisis_while_speaking_escalates_once() {
    let mut h = Setup {
        tts: MockTts::holding(2),
        ..Default::default()
    }
    .build();
    h.start().await;
    h.say("work is awful").await;
    h.advance(1_800).await;
    assert_eq!(h.session.state(), SessionState::Speaking);
    let reflections_before = h.reflection.inputs().len();

    h.say("some days I want to kill myself").await;

    assert!(h.session.is_safety_escalated());
    assert_eq!(h.session.state(), SessionState::Closed);
    assert_eq!(h.tts.live(), 0);
    assert_eq!(h.sink.count(&SinkOp::Clear), 1);
    assert_eq!(h.call_control.count(), 1);
    assert_eq!(
        h.call_control.calls.lock()[0],
        ("CA0001".to_string(), ANNOUNCEMENT.to_string())
    );

    // Nothing else happens afterwards.
    h.say("hello?").await;
    h.advance(10_000).await;
    assert_eq!(h.reflection.inputs().len(), reflections_before);
    assert_eq!(h.call_control.count(), 1);
    assert!(h.session.next_deadline().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_safety_is_idempotent() {
    let mut h = Setup::default().build();
    h.start().await;

    h.say("I want to die").await;
    h.say("I want to die").await;
    h.send(SessionEvent::transcript("better off dead", true))
        .await;

    assert_eq!(h.call_control.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_crisis_segment_never_reaches_generator() {
    let mut h = Setup::default().build();
    h.start().await;

    h.say("I keep thinking about suicide").await;
    h.advance(5_000).await;

    assert!(h.reflection.inputs().is_empty());
    assert!(h.tts.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_crisis_during_reflection_discards_reply() {
    let mut h = Setup::default().build();
    h.start().await;
    h.say("first").await;
    tokio::time::advance(Duration::from_millis(1_800)).await;
    h.session.poll_timers();
    assert_eq!(h.session.state(), SessionState::Reflecting);

    h.say("I might hurt myself").await;

    assert_eq!(h.session.state(), SessionState::Closed);
    assert!(h.tts.calls().is_empty());
    assert_eq!(h.call_control.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_escalation_still_closes() {
    let mut h = Setup {
        call_control: MockCallControl {
            fail: true,
            ..Default::default()
        },
        ..Default::default()
    }
    .build();
    h.start().await;

    h.say("I have no reason to live").await;

    assert_eq!(h.session.state(), SessionState::Closed);
    assert_eq!(h.call_control.count(), 1);
    // Without the redirect the media channel is closed locally.
    assert_eq!(h.sink.count(&SinkOp::Close), 1);
}

#[tokio::test(start_paused = true)]
async fn test_successful_escalation_leaves_channel_to_provider() {
    let mut h = Setup::default().build();
    h.start().await;
    h.say("I want to end my life").await;

    assert_eq!(h.session.state(), SessionState::Closed);
    assert_eq!(h.sink.count(&SinkOp::Close), 0);
}

#[tokio::test(start_paused = true)]
async fn test_crisis_before_start_is_escalated() {
    let mut h = Setup::default().build();
    h.say("I want to kill myself").await;

    assert!(h.session.is_safety_escalated());
    assert_eq!(h.session.state(), SessionState::Closed);
    assert_eq!(h.call_control.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sender_kept_alive_by_harness() {
    // The harness sender keeps the mailbox open between events.
    let mut h = Setup::default().build();
    h.start().await;
    assert!(!h.tx.is_closed());
    h.send(SessionEvent::Hangup).await;
    assert_eq!(h.session.state(), SessionState::Closed);
}
