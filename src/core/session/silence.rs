//! Silence/turn detector.
//!
//! Holds at most one deadline. The session loop sleeps until
//! [`SilenceDetector::deadline`] and then calls [`SilenceDetector::fire`], so
//! the timeout is serialized with every other session event.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct SilenceDetector {
    silence: Duration,
    deadline: Option<Instant>,
}

impl SilenceDetector {
    pub fn new(silence: Duration) -> Self {
        Self {
            silence,
            deadline: None,
        }
    }

    /// Replace any pending deadline with `now + silence`.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.silence);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True exactly once per armed deadline, once `now` reaches it.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
