//! Simulation clock for the tick loop.

use std::time::Duration;

/// Frame dt above this is clamped so a stalled frame cannot explode timers.
pub const MAX_FRAME_DT: f32 = 0.25;

/// Tracks frame timing for a play session.
///
/// Advanced with the frame dt handed to the session, never the wall clock.
#[derive(Debug)]
pub struct Time {
    /// Total simulated time.
    elapsed: Duration,
    /// Ticks run since the session started.
    frame_count: u64,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    pub fn new() -> Self {
        Self {
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Advance by an explicit dt. Returns the clamped dt actually applied.
    pub fn advance(&mut self, dt: f32) -> f32 {
        let dt = dt.clamp(0.0, MAX_FRAME_DT);
        self.elapsed += Duration::from_secs_f32(dt);
        self.frame_count += 1;
        dt
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Reset to a fresh session clock.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
