//! Nudge rate limiter.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Caps system-initiated utterances per rolling window.
#[derive(Debug)]
pub struct NudgeLimiter {
    max: u32,
    window: Duration,
    silence: Duration,
    records: VecDeque<Instant>,
}

impl NudgeLimiter {
    pub fn new(max: u32, window: Duration, silence: Duration) -> Self {
        Self {
            max,
            window,
            silence,
            records: VecDeque::new(),
        }
    }

    /// Grant a nudge when the window has room, nothing is being said and
    /// the caller has been quiet for at least the silence threshold.
    /// Granting records the nudge at `now`.
    pub fn try_reserve(
        &mut self,
        now: Instant,
        last_final_at: Option<Instant>,
        speech_active: bool,
    ) -> bool {
        self.prune(now);

        if self.records.len() >= self.max as usize || speech_active {
            return false;
        }

        if let Some(last_final_at) = last_final_at
            && now.saturating_duration_since(last_final_at) < self.silence
        {
            return false;
        }

        self.records.push_back(now);
        true
    }

    /// Return the most recent reservation.
    pub fn refund(&mut self) {
        self.records.pop_back();
    }

    /// Nudges recorded inside the window ending at `now`.
    pub fn count(&mut self, now: Instant) -> usize {
        self.prune(now);
        self.records.len()
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.records.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                self.records.pop_front();
            } else {
                break;
            }
        }
    }
}
