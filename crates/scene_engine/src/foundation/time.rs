//! Frame timing utilities

use std::time::Instant;

/// Frame clock driving the logical frame counter
///
/// The frame number is what queued events are scheduled against. Delta time
/// is either measured from the wall clock or fixed.
#[derive(Debug)]
pub struct FrameClock {
    last_frame: Instant,
    fixed_delta: Option<f32>,
    delta_time: f32,
    total_time: f32,
    frame: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a wall-clock driven frame clock
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            fixed_delta: None,
            delta_time: 0.0,
            total_time: 0.0,
            frame: 0,
        }
    }

    /// Create a clock that advances by a fixed step every frame
    pub fn fixed(delta_time: f32) -> Self {
        Self {
            fixed_delta: Some(delta_time),
            delta_time,
            ..Self::new()
        }
    }

    /// Switch between a fixed step and wall-clock timing
    pub fn set_fixed_delta(&mut self, fixed_delta: Option<f32>) {
        self.fixed_delta = fixed_delta;
        self.last_frame = Instant::now();
    }

    /// Sample the delta time for the frame about to run
    pub fn begin_frame(&mut self) -> f32 {
        let now = Instant::now();
        self.delta_time = self
            .fixed_delta
            .unwrap_or_else(|| now.duration_since(self.last_frame).as_secs_f32());
        self.last_frame = now;
        self.delta_time
    }

    /// Finish the current frame and advance the frame counter
    pub fn end_frame(&mut self) {
        self.total_time += self.delta_time;
        self.frame += 1;
    }

    /// Get the time since the last frame in seconds
    pub const fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total simulated time
    pub const fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Current logical frame number
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Get the average FPS since clock creation
    #[allow(clippy::cast_precision_loss)]
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame as f32 / self.total_time
        } else {
            0.0
        }
    }
}
