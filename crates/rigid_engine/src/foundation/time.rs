//! Time management utilities
//!
//! The physics scene is always advanced by a constant step. `FixedTimestep`
//! turns variable wall-clock frame times into a whole number of such steps.

use std::time::{Duration, Instant};

/// High-precision timer for frame timing
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer (should be called once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
    }

    /// Get the time since the last frame in seconds
    pub const fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub const fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Accumulates frame time and hands out fixed simulation steps
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: f32,
    max_frame_time: f32,
    max_steps_per_frame: u32,
    accumulator: f32,
}

impl FixedTimestep {
    /// Create an accumulator producing steps of `step` seconds.
    ///
    /// Frame times above `max_frame_time` are clamped so a long stall cannot
    /// trigger an unbounded catch-up, and at most `max_steps_per_frame` steps
    /// are produced per call to [`FixedTimestep::advance`].
    pub fn new(step: f32, max_frame_time: f32, max_steps_per_frame: u32) -> Self {
        Self {
            step,
            max_frame_time,
            max_steps_per_frame: max_steps_per_frame.max(1),
            accumulator: 0.0,
        }
    }

    /// Length of one simulation step in seconds
    pub const fn step(&self) -> f32 {
        self.step
    }

    /// Add a frame's worth of time and return how many steps to simulate
    pub fn advance(&mut self, frame_time: f32) -> u32 {
        if !(frame_time.is_finite() && self.step > 0.0) {
            return 0;
        }

        self.accumulator += frame_time.clamp(0.0, self.max_frame_time);

        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps_per_frame {
            self.accumulator -= self.step;
            steps += 1;
        }

        // Drop whatever could not be simulated this frame
        if steps == self.max_steps_per_frame {
            self.accumulator = self.accumulator.min(self.step);
        }
        steps
    }

    /// Fraction of a step left in the accumulator, for render interpolation
    pub fn alpha(&self) -> f32 {
        if self.step > 0.0 {
            self.accumulator / self.step
        } else {
            0.0
        }
    }

    /// Discard any accumulated time
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub const fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start_time = Some(Instant::now());
        stopwatch
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += start.elapsed();
        }
    }

    /// Get the elapsed time in milliseconds
    pub fn elapsed_millis(&self) -> f32 {
        let running = self.start_time.map_or(Duration::ZERO, |start| start.elapsed());
        (self.elapsed + running).as_secs_f32() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_timestep_accumulates() {
        let mut stepper = FixedTimestep::new(0.5, 2.0, 10);

        assert_eq!(stepper.advance(0.25), 0);
        assert_eq!(stepper.advance(0.375), 1);
        assert_eq!(stepper.alpha(), 0.25);
    }

    #[test]
    fn test_fixed_timestep_caps_long_frames() {
        let mut stepper = FixedTimestep::new(0.25, 1.0, 100);

        // A ten second stall only yields the capped four steps
        assert_eq!(stepper.advance(10.0), 4);
    }

    #[test]
    fn test_fixed_timestep_limits_steps_per_frame() {
        let mut stepper = FixedTimestep::new(0.125, 1.0, 3);

        assert_eq!(stepper.advance(1.0), 3);
        assert!(stepper.alpha() <= 1.0);
        stepper.reset();
        assert_eq!(stepper.alpha(), 0.0);
    }

    #[test]
    fn test_fixed_timestep_ignores_bad_input() {
        let mut stepper = FixedTimestep::new(0.01, 1.0, 3);
        assert_eq!(stepper.advance(f32::NAN), 0);
        assert_eq!(stepper.advance(-1.0), 0);
    }
}
