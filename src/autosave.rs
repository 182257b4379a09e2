//! Debounced autosave timer.
//!
//! Every mutation re-arms the timer; the save fires once the document has been
//! quiet for the configured delay. The timer holds only a deadline and is
//! driven by the caller through [`Autosave::tick_at`], so it has no thread of
//! its own and tests can pass explicit instants.

use std::time::{Duration, Instant};

pub const DEFAULT_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone)]
pub struct Autosave {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Default for Autosave {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl Autosave {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the quiet period from now.
    pub fn arm(&mut self) {
        self.arm_at(Instant::now());
    }

    /// Restart the quiet period from `now`, replacing any earlier deadline.
    pub fn arm_at(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true exactly once when the deadline has passed, disarming the
    /// timer.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
