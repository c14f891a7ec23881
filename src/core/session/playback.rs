//! Playback / barge-in controller.
//!
//! Owns the single outbound speech handle of a session. A handle is created
//! in the reflecting phase by [`PlaybackController::reserve`] or directly in
//! the speaking phase by [`PlaybackController::speak`], and is released when
//! its audio finishes or it is cancelled.
//!
//! Synthesis runs in a spawned task that forwards every chunk to the session
//! mailbox. The task is bound to the handle's cancellation token, so
//! [`PlaybackController::cancel`] returns immediately and the provider stream
//! is dropped by the task on its next poll.

use std::sync::Arc;

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::events::{SessionEvent, SpeechId};
use crate::core::tts::{BaseTTS, TTSError};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SpeakError {
    #[error("Nothing to say")]
    EmptyText,
    #[error("No voice configured")]
    MissingVoice,
    #[error("No synthesizer configured")]
    NoSynthesizer,
    /// Safety escalation or teardown sealed the controller
    #[error("Playback is sealed")]
    Sealed,
    #[error("Another utterance is already playing")]
    Busy,
    #[error("Session mailbox closed")]
    MailboxClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechPhase {
    Reflecting,
    Speaking,
}

#[derive(Debug)]
struct SpeechHandle {
    id: SpeechId,
    token: CancellationToken,
    phase: SpeechPhase,
    audio_started: bool,
}

/// What a cancellation interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled {
    pub id: SpeechId,
    pub phase: SpeechPhase,
    /// Audio already reached the sink, so the gateway buffer needs a clear
    pub audio_started: bool,
}

pub struct PlaybackController {
    tts: Option<Arc<dyn BaseTTS>>,
    events: mpsc::WeakSender<SessionEvent>,
    current: Option<SpeechHandle>,
    next_id: SpeechId,
    sealed: bool,
}

impl PlaybackController {
    pub fn new(tts: Option<Arc<dyn BaseTTS>>, events: mpsc::WeakSender<SessionEvent>) -> Self {
        Self {
            tts,
            events,
            current: None,
            next_id: 1,
            sealed: false,
        }
    }

    /// Create a handle in the reflecting phase.
    pub fn reserve(&mut self) -> Result<SpeechId, SpeakError> {
        if self.sealed {
            return Err(SpeakError::Sealed);
        }
        if self.current.is_some() {
            return Err(SpeakError::Busy);
        }

        let id = self.allocate_id();
        self.current = Some(SpeechHandle {
            id,
            token: CancellationToken::new(),
            phase: SpeechPhase::Reflecting,
            audio_started: false,
        });
        Ok(id)
    }

    /// Start speaking `text`.
    ///
    /// A handle in the reflecting phase is promoted in place and keeps its
    /// id; otherwise a new handle is created. On error nothing changes.
    pub fn speak(&mut self, text: &str, voice: Option<&str>) -> Result<SpeechId, SpeakError> {
        if self.sealed {
            return Err(SpeakError::Sealed);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SpeakError::EmptyText);
        }
        let voice = voice
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(SpeakError::MissingVoice)?;
        let tts = self.tts.clone().ok_or(SpeakError::NoSynthesizer)?;
        if matches!(&self.current, Some(h) if h.phase == SpeechPhase::Speaking) {
            return Err(SpeakError::Busy);
        }
        let events = self.events.upgrade().ok_or(SpeakError::MailboxClosed)?;

        let (id, token) = match self.current.as_mut() {
            Some(handle) => {
                handle.phase = SpeechPhase::Speaking;
                (handle.id, handle.token.clone())
            }
            None => {
                let id = self.allocate_id();
                let token = CancellationToken::new();
                self.current = Some(SpeechHandle {
                    id,
                    token: token.clone(),
                    phase: SpeechPhase::Speaking,
                    audio_started: false,
                });
                (id, token)
            }
        };

        let text = text.to_string();
        let voice = voice.to_string();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    debug!(speech_id = id, "Synthesis cancelled");
                    return;
                }
                outcome = stream_speech(tts, text, voice, id, &events) => outcome,
            };
            let _ = events.send(SessionEvent::SpeechFinished { id, outcome }).await;
        });

        Ok(id)
    }

    /// Cancel the current handle, if any. Never waits on the provider.
    pub fn cancel(&mut self) -> Option<Cancelled> {
        let handle = self.current.take()?;
        handle.token.cancel();
        Some(Cancelled {
            id: handle.id,
            phase: handle.phase,
            audio_started: handle.audio_started,
        })
    }

    /// Drop the handle `id` without it having spoken. Stale ids are ignored.
    pub fn release(&mut self, id: SpeechId) -> bool {
        if !self.is_current(id) {
            return false;
        }
        self.cancel();
        true
    }

    /// Clear the handle `id` after its stream ended. Stale ids are ignored.
    pub fn finish(&mut self, id: SpeechId) -> bool {
        if !self.is_current(id) {
            return false;
        }
        self.current = None;
        true
    }

    /// Record that audio of `id` is going out. Returns false for chunks that
    /// must be discarded.
    pub fn on_audio(&mut self, id: SpeechId) -> bool {
        match self.current.as_mut() {
            Some(handle) if handle.id == id && handle.phase == SpeechPhase::Speaking => {
                handle.audio_started = true;
                true
            }
            _ => false,
        }
    }

    /// Permanently refuse new speech.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_current(&self, id: SpeechId) -> bool {
        matches!(&self.current, Some(h) if h.id == id)
    }

    pub fn phase(&self) -> Option<SpeechPhase> {
        self.current.as_ref().map(|h| h.phase)
    }

    /// Token of the current handle, for tasks bound to it.
    pub fn token(&self) -> Option<CancellationToken> {
        self.current.as_ref().map(|h| h.token.clone())
    }

    fn allocate_id(&mut self) -> SpeechId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

async fn stream_speech(
    tts: Arc<dyn BaseTTS>,
    text: String,
    voice: String,
    id: SpeechId,
    events: &mpsc::Sender<SessionEvent>,
) -> Result<(), TTSError> {
    let mut audio = tts.synthesize(&text, &voice).await?;
    while let Some(chunk) = audio.next().await {
        let chunk = chunk?;
        if events
            .send(SessionEvent::SpeechAudio { id, chunk })
            .await
            .is_err()
        {
            break;
        }
    }
    Ok(())
}
