//! Cancelable one-shot timer on a caller-supplied clock.
//!
//! Time is a [`Duration`] since page load. The host passes "now" into every
//! call, so the same timer runs under a real clock (`web_time::Instant`) and
//! under a virtual clock in tests.

use web_time::Duration;

/// A single pending deadline. Starting it again replaces the deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelableTimer {
    deadline: Option<Duration>,
}

impl CancelableTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending deadline and arm a new one `delay` after `now`.
    pub fn restart(&mut self, now: Duration, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Fire if the deadline has been reached. A fired timer is disarmed.
    pub fn fire_if_due(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
