//! Rolling transcript window.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// One finalized piece of caller speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSegment {
    pub captured_at: Instant,
    pub text: String,
    pub is_final: bool,
}

impl TranscriptSegment {
    pub fn final_text(text: impl Into<String>, captured_at: Instant) -> Self {
        Self {
            captured_at,
            text: text.into(),
            is_final: true,
        }
    }
}

/// Time-bounded FIFO of transcript segments.
///
/// Eviction is lazy: it happens on every append and snapshot, so a read
/// never returns a segment older than the window.
#[derive(Debug)]
pub struct TranscriptWindow {
    window: Duration,
    segments: VecDeque<TranscriptSegment>,
}

impl TranscriptWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            segments: VecDeque::new(),
        }
    }

    /// Append a segment in arrival order. Blank text is ignored.
    pub fn append(&mut self, segment: TranscriptSegment, now: Instant) {
        self.evict(now);
        if segment.text.trim().is_empty() {
            return;
        }
        self.segments.push_back(segment);
    }

    /// Space-joined text of every segment still inside the window.
    pub fn snapshot(&mut self, now: Instant) -> String {
        self.evict(now);
        self.segments
            .iter()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn evict(&mut self, now: Instant) {
        while let Some(front) = self.segments.front() {
            if now.saturating_duration_since(front.captured_at) > self.window {
                self.segments.pop_front();
            } else {
                break;
            }
        }
    }
}
