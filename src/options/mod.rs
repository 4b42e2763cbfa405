//! Effect options with TOML preset support.
//!
//! Options serialize to/from TOML for presets stored in `assets/presets/`
//! and describe themselves through a JSON schema for debug panels. All
//! sections use `#[serde(default)]` so partial files work.

mod bloom;
mod composite;
mod glow;

use std::path::Path;

pub use bloom::BloomOptions;
pub use composite::{CompositeMode, CompositeOptions};
pub use glow::{parse_hex_color, GlowOptions};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Top-level options container.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Bloom threshold and blur parameters.
    pub bloom: BloomOptions,
    /// Glow composite parameters.
    pub glow: GlowOptions,
    /// Composite draw layout.
    pub composite: CompositeOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// I/O failures and malformed TOML.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse options from a TOML string. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// [`PipelineError::OptionsParse`] for malformed TOML.
    pub fn from_toml(content: &str) -> Result<Self, PipelineError> {
        toml::from_str(content)
            .map_err(|e| PipelineError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Serialization and I/O failures.
    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PipelineError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }

    /// Copy with every value clamped to its documented range. Each clamp is
    /// logged as a warning.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut opts = self.clone();
        opts.bloom.sanitize();
        opts.glow.sanitize();
        opts
    }
}

/// Clamp `value` into `[min, max]`, mapping non-finite values to `min`.
fn clamp_option(name: &str, value: f32, min: f32, max: f32) -> f32 {
    let clamped = if value.is_finite() {
        value.clamp(min, max)
    } else {
        min
    };
    if clamped != value {
        log::warn!("{name} {value} clamped to {clamped}");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[bloom]
iterations = 3

[composite]
mode = "separate"
"#;
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(opts.bloom.iterations, 3);
        assert_eq!(opts.composite.mode, CompositeMode::Separate);
        // Everything else should be default
        assert_eq!(opts.bloom.strength, 0.01);
        assert_eq!(opts.bloom.smoothing, 0.1);
        assert_eq!(opts.glow.samples, 24);
        assert!(opts.glow.enabled);
    }

    #[test]
    fn bundled_presets_parse() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/presets");
        let names = Options::list_presets(&dir);
        assert!(names.contains(&"default".to_owned()));
        for name in names {
            let opts = Options::load(&dir.join(format!("{name}.toml"))).unwrap();
            assert_eq!(opts, opts.sanitized(), "preset {name} is out of range");
        }
        let default = Options::load(&dir.join("default.toml")).unwrap();
        assert_eq!(default, Options::default());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            Options::from_toml("[bloom]\niterations = \"many\""),
            Err(PipelineError::OptionsParse(_))
        ));
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let mut opts = Options::default();
        opts.bloom.strength = 9.0;
        opts.bloom.threshold = -1.0;
        opts.bloom.smoothing = f32::NAN;
        opts.bloom.iterations = 10;
        opts.bloom.resolution_scale = 0.0;
        opts.glow.samples = 1000;
        opts.glow.tint = [2.0, 0.5, -0.5];

        let clean = opts.sanitized();
        assert_eq!(clean.bloom.strength, 5.0);
        assert_eq!(clean.bloom.threshold, 0.0);
        assert_eq!(clean.bloom.smoothing, 0.0);
        assert_eq!(clean.bloom.iterations, 4);
        assert_eq!(clean.bloom.resolution_scale, 0.1);
        assert_eq!(clean.glow.samples, 64);
        assert_eq!(clean.glow.tint, [1.0, 0.5, 0.0]);

        // Zero iterations is a valid setting.
        opts.bloom.iterations = 0;
        assert_eq!(opts.sanitized().bloom.iterations, 0);
    }

    #[test]
    fn hex_tint_parsing() {
        let mut glow = GlowOptions::default();
        glow.set_tint_hex("#ff8000").unwrap();
        assert_eq!(glow.tint, [1.0, 128.0 / 255.0, 0.0]);
        assert_eq!(parse_hex_color("f2db8e").unwrap(), GlowOptions::default().tint);
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
        assert!(glow.set_tint_hex("#ééé").is_err());
    }

    #[test]
    fn save_load_and_list_presets() {
        let dir = std::env::temp_dir()
            .join(format!("erdtree-fx-presets-{}", std::process::id()));
        let mut opts = Options::default();
        opts.bloom.iterations = 1;
        opts.save(&dir.join("soft.toml")).unwrap();
        Options::default().save(&dir.join("default.toml")).unwrap();

        assert_eq!(Options::load(&dir.join("soft.toml")).unwrap(), opts);
        assert_eq!(Options::list_presets(&dir), vec!["default", "soft"]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();
        assert!(props.contains_key("bloom"));
        assert!(props.contains_key("glow"));
        assert!(props.contains_key("composite"));

        let bloom = &props["bloom"]["properties"];
        assert!(bloom.get("strength").is_some());
        assert!(bloom.get("iterations").is_some());
        assert!(bloom.get("resolution_scale").is_none());
    }
}
