use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How the bloom and glow textures are added onto the screen.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum CompositeMode {
    /// One draw sampling both textures when both effects are enabled.
    #[default]
    Combined,
    /// One draw per enabled effect.
    Separate,
}

/// Composite parameters.
#[derive(
    Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema,
)]
#[schemars(title = "Composite", inline)]
#[serde(default)]
pub struct CompositeOptions {
    /// Combined or per-effect composite draws.
    #[schemars(title = "Mode")]
    pub mode: CompositeMode,
}
