//! Elapsed-time measurement for stages and runs.

use std::time::Instant;

/// Measures total time since start and time between steps.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    started: Instant,
    last_step: Instant,
}

impl Timer {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last_step: now,
        }
    }

    /// Milliseconds since the timer started.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Milliseconds since the previous step, or since start for the first one.
    pub fn step_ms(&mut self) -> u64 {
        let now = Instant::now();
        let step = now.duration_since(self.last_step).as_millis() as u64;
        self.last_step = now;
        step
    }
}
