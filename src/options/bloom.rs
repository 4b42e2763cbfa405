use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::clamp_option;

/// Bloom filter parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Bloom", inline)]
#[serde(default)]
pub struct BloomOptions {
    /// Run the bloom stage and composite its output.
    #[schemars(title = "Enabled")]
    pub enabled: bool,
    /// Widens the blur kernel (`sigma = 1 + strength`).
    #[schemars(title = "Strength", range(min = 0.0, max = 5.0), extend("step" = 0.01))]
    pub strength: f32,
    /// Multiplier on the blur tap spacing.
    #[schemars(title = "Radius", range(min = 0.0, max = 3.0), extend("step" = 0.01))]
    pub radius: f32,
    /// Luminance where the soft threshold reaches full pass-through.
    #[schemars(title = "Threshold", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub threshold: f32,
    /// Width of the soft threshold ramp below `threshold`.
    #[schemars(title = "Smoothing", range(min = 0.0, max = 0.5), extend("step" = 0.01))]
    pub smoothing: f32,
    /// Horizontal + vertical blur pairs; 0 leaves the thresholded image.
    #[schemars(title = "Iterations", range(min = 1, max = 4))]
    pub iterations: u32,
    /// Bloom target size relative to the physical viewport.
    #[schemars(skip)]
    pub resolution_scale: f32,
}

impl Default for BloomOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            strength: 0.01,
            radius: 1.0,
            threshold: 0.0,
            smoothing: 0.1,
            iterations: 2,
            resolution_scale: 0.5,
        }
    }
}

impl BloomOptions {
    /// Largest accepted iteration count.
    pub const MAX_ITERATIONS: u32 = 4;

    pub(crate) fn sanitize(&mut self) {
        self.strength = clamp_option("bloom.strength", self.strength, 0.0, 5.0);
        self.radius = clamp_option("bloom.radius", self.radius, 0.0, 3.0);
        self.threshold =
            clamp_option("bloom.threshold", self.threshold, 0.0, 1.0);
        self.smoothing =
            clamp_option("bloom.smoothing", self.smoothing, 0.0, 0.5);
        self.resolution_scale = clamp_option(
            "bloom.resolution_scale",
            self.resolution_scale,
            0.1,
            1.0,
        );
        if self.iterations > Self::MAX_ITERATIONS {
            log::warn!(
                "bloom.iterations {} clamped to {}",
                self.iterations,
                Self::MAX_ITERATIONS
            );
            self.iterations = Self::MAX_ITERATIONS;
        }
    }
}
