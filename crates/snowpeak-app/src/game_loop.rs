//! Variable-rate frame clock.
//!
//! The simulation runs one tick per rendered frame with the measured frame
//! time as `dt`. A stall (debugger, window drag, slow disk) would otherwise
//! hand the controllers a huge `dt` and teleport avatars through walls, so
//! the clock clamps every frame to a maximum.

use std::time::Instant;
use tracing::warn;

/// Default frame time clamp in seconds.
pub const MAX_FRAME_TIME: f32 = 0.1;

/// Measures wall time between frames.
#[derive(Debug, Clone)]
pub struct FrameClock {
    previous_time: Instant,
    max_frame_time: f32,
    frame_count: u64,
    total_time: f64,
}

impl FrameClock {
    /// Clock starting now, clamping frames to `max_frame_time` seconds.
    pub fn new(max_frame_time: f32) -> Self {
        Self::starting_at(Instant::now(), max_frame_time)
    }

    /// Clock whose first frame is measured from `start`.
    pub fn starting_at(start: Instant, max_frame_time: f32) -> Self {
        Self {
            previous_time: start,
            max_frame_time,
            frame_count: 0,
            total_time: 0.0,
        }
    }

    /// Measure the frame ending now.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// Measure the frame ending at `now`. Returns the clamped `dt`.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let frame_time = now.saturating_duration_since(self.previous_time).as_secs_f32();
        self.previous_time = now;

        let dt = if frame_time > self.max_frame_time {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                self.max_frame_time * 1000.0
            );
            self.max_frame_time
        } else {
            frame_time
        };

        self.total_time += f64::from(dt);
        self.frame_count += 1;
        dt
    }

    /// Instant the last frame ended.
    pub fn last_frame_at(&self) -> Instant {
        self.previous_time
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Sum of clamped frame times in seconds.
    pub fn total_time(&self) -> f64 {
        self.total_time
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(MAX_FRAME_TIME)
    }
}
