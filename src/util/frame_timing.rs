use std::cell::Cell;

use web_time::{Duration, Instant};

/// Source of the animation time fed to the composite shader.
pub trait Clock {
    /// Seconds elapsed since the clock started.
    fn elapsed(&self) -> f32;
}

/// Monotonic wall clock.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    start: Instant,
}

impl FrameClock {
    /// Clock starting now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FrameClock {
    fn elapsed(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }
}

/// Deterministic clock driven by the caller (tests, offline rendering).
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds: Cell<f32>,
}

impl ManualClock {
    /// Clock frozen at `seconds`.
    #[must_use]
    pub fn at(seconds: f32) -> Self {
        Self {
            seconds: Cell::new(seconds),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, seconds: f32) {
        self.seconds.set(seconds);
    }

    /// Advance by `dt` seconds.
    pub fn advance(&self, dt: f32) {
        self.seconds.set(self.seconds.get() + dt);
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> f32 {
        self.seconds.get()
    }
}

/// Frame timing with FPS calculation and optional frame limiting
pub struct FrameTiming {
    /// Target FPS (0 = unlimited)
    target_fps: u32,
    /// Minimum frame duration based on target FPS
    min_frame_duration: Duration,
    /// Last frame timestamp
    last_frame: Instant,
    /// Smoothed FPS using exponential moving average
    smoothed_fps: f32,
    /// Smoothing factor (lower = smoother, 0.0-1.0)
    smoothing: f32,
}

impl FrameTiming {
    /// Create a new frame timer with the given FPS target (0 = unlimited).
    #[must_use]
    pub fn new(target_fps: u32) -> Self {
        let min_frame_duration = if target_fps > 0 {
            Duration::from_secs_f64(1.0 / f64::from(target_fps))
        } else {
            Duration::ZERO
        };

        Self {
            target_fps,
            min_frame_duration,
            last_frame: Instant::now(),
            smoothed_fps: 60.0,
            smoothing: 0.05,
        }
    }

    /// Whether enough time has passed since the last frame to render.
    #[must_use]
    pub fn should_render(&self) -> bool {
        if self.target_fps == 0 {
            return true;
        }
        self.last_frame.elapsed() >= self.min_frame_duration
    }

    /// Call after rendering to update timing.
    pub fn end_frame(&mut self) {
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if frame_time > 0.0 {
            let instant_fps = 1.0 / frame_time;
            self.smoothed_fps = self.smoothed_fps * (1.0 - self.smoothing)
                + instant_fps * self.smoothing;
        }
    }

    /// Smoothed FPS.
    #[must_use]
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::at(1.0);
        clock.advance(0.5);
        assert_eq!(clock.elapsed(), 1.5);
        clock.set(0.0);
        assert_eq!(clock.elapsed(), 0.0);
    }

    #[test]
    fn frame_clock_is_monotonic() {
        let clock = FrameClock::new();
        let a = clock.elapsed();
        let b = clock.elapsed();
        assert!(b >= a);
    }

    #[test]
    fn unlimited_timing_always_renders() {
        assert!(FrameTiming::new(0).should_render());
    }
}
