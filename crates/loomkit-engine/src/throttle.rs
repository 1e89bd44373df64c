//! Preview render throttle
//!
//! A debounce over point-add events: the first request after a quiet
//! window runs immediately, later requests inside the window leave one
//! pending render that runs when the window elapses. A pending render that
//! is superseded by a newer request is dropped, never queued.

use std::time::{Duration, Instant};

/// What the caller should do with a render request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Render now
    RunNow,
    /// Render later; `superseded` is true when an earlier pending render
    /// was dropped in favour of this one
    Deferred { superseded: bool },
}

#[derive(Debug, Clone)]
pub struct RenderThrottle {
    window: Duration,
    last_run: Option<Instant>,
    pending: bool,
    dropped: u64,
}

impl RenderThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_run: None,
            pending: false,
            dropped: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn request(&mut self, now: Instant) -> ThrottleDecision {
        if self.window_elapsed(now) {
            // a pending render is covered by this one
            self.pending = false;
            self.last_run = Some(now);
            return ThrottleDecision::RunNow;
        }
        let superseded = self.pending;
        if superseded {
            self.dropped += 1;
        }
        self.pending = true;
        ThrottleDecision::Deferred { superseded }
    }

    /// True when a pending render is due at `now`.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.pending && self.window_elapsed(now) {
            self.pending = false;
            self.last_run = Some(now);
            true
        } else {
            false
        }
    }

    /// Take the pending render regardless of the window.
    pub fn flush(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    /// Forget the pending render and the window; the next request runs.
    pub fn cancel(&mut self) -> bool {
        self.last_run = None;
        std::mem::take(&mut self.pending)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Renders dropped because a newer request replaced them.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn window_elapsed(&self, now: Instant) -> bool {
        match self.last_run {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.window,
        }
    }
}

impl Default for RenderThrottle {
    fn default() -> Self {
        Self::new(Duration::from_millis(8))
    }
}
