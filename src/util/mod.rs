//! Shared utilities: frame clocks and FPS tracking.

pub mod frame_timing;
