use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::clamp_option;
use crate::error::PipelineError;

/// Glow composite parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Glow", inline)]
#[serde(default)]
pub struct GlowOptions {
    /// Run the glow capture and composite the radial glow.
    #[schemars(title = "Enabled")]
    pub enabled: bool,
    /// Radial taps accumulated towards the glow centre.
    #[schemars(title = "Samples", range(min = 4, max = 64))]
    pub samples: u32,
    /// RGB tint in `[0,1]`.
    #[schemars(title = "Tint")]
    pub tint: [f32; 3],
    /// Glow target size relative to the physical viewport.
    #[schemars(skip)]
    pub resolution_scale: f32,
}

impl Default for GlowOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            samples: 24,
            tint: [242.0 / 255.0, 219.0 / 255.0, 142.0 / 255.0],
            resolution_scale: 0.5,
        }
    }
}

impl GlowOptions {
    /// Set the tint from a `#rrggbb` (or `rrggbb`) string.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidColor`] when the string is not six hex digits.
    pub fn set_tint_hex(&mut self, hex: &str) -> Result<(), PipelineError> {
        self.tint = parse_hex_color(hex)?;
        Ok(())
    }

    pub(crate) fn sanitize(&mut self) {
        let samples = self.samples.clamp(4, 64);
        if samples != self.samples {
            log::warn!("glow.samples {} clamped to {samples}", self.samples);
            self.samples = samples;
        }
        for channel in &mut self.tint {
            *channel = clamp_option("glow.tint", *channel, 0.0, 1.0);
        }
        self.resolution_scale = clamp_option(
            "glow.resolution_scale",
            self.resolution_scale,
            0.1,
            1.0,
        );
    }
}

/// Parse `#rrggbb` into RGB components in `[0,1]`.
///
/// # Errors
///
/// [`PipelineError::InvalidColor`] for anything but six hex digits.
pub fn parse_hex_color(hex: &str) -> Result<[f32; 3], PipelineError> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(PipelineError::InvalidColor(hex.to_owned()));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map(|v| f32::from(v) / 255.0)
            .map_err(|_| PipelineError::InvalidColor(hex.to_owned()))
    };
    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}
