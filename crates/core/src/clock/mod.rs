use serde::{Deserialize, Serialize};

/// Caller-driven clock in seconds. Nothing in the crate reads wall-clock
/// time; whoever owns the clock decides when it moves.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(time_seconds: f64) -> Self {
        Self {
            time_seconds: time_seconds.max(0.0),
        }
    }

    pub fn now(&self) -> f64 {
        self.time_seconds
    }

    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    pub fn advance(&mut self, delta: f64) {
        self.time_seconds = (self.time_seconds + delta).max(0.0);
    }
}
