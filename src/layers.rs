//! Render layers and the per-pass layer registry.
//!
//! Every drawable carries a [`LayerMask`]. Each output pass of the pipeline
//! sees only the drawables whose mask intersects the pass mask returned by
//! [`PassConfig::layers_for`]. The glow layer is exclusive: a drawable tagged
//! with it is only visible to passes that include glow, whatever else it is
//! tagged with.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::error::PipelineError;
use crate::scene::{DrawableId, Scene};

/// A single render layer tag.
///
/// Discriminants are the scene-graph layer indices (layer 0 is the default
/// layer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderLayer {
    /// Plain scene geometry with no post-processing.
    Default = 0,
    /// Geometry that only feeds the glow capture target.
    Glow = 1,
    /// Geometry drawn in the main pass and extracted for bloom.
    Bloom = 2,
}

impl RenderLayer {
    /// All layers, in id order.
    pub const ALL: [Self; 3] = [Self::Default, Self::Glow, Self::Bloom];

    /// Integer layer id.
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Single-layer mask.
    #[must_use]
    pub const fn mask(self) -> LayerMask {
        match self {
            Self::Default => LayerMask::DEFAULT,
            Self::Glow => LayerMask::GLOW,
            Self::Bloom => LayerMask::BLOOM,
        }
    }
}

bitflags! {
    /// Set of render layers, used both as object membership and as the
    /// visibility mask of a pass. Comparable and hashable, so it doubles as
    /// the layer-switch cache key.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct LayerMask: u8 {
        /// [`RenderLayer::Default`].
        const DEFAULT = 1 << 0;
        /// [`RenderLayer::Glow`].
        const GLOW = 1 << 1;
        /// [`RenderLayer::Bloom`].
        const BLOOM = 1 << 2;
    }
}

impl LayerMask {
    /// Whether a drawable tagged with `self` is visible through `pass_mask`.
    ///
    /// Glow-tagged drawables are hidden from every pass that does not see
    /// the glow layer, even when another of their layers matches.
    #[must_use]
    pub fn visible_through(self, pass_mask: Self) -> bool {
        if self.contains(Self::GLOW) && !pass_mask.contains(Self::GLOW) {
            return false;
        }
        self.intersects(pass_mask)
    }

    /// Layers contained in this mask, in id order.
    pub fn layers(self) -> impl Iterator<Item = RenderLayer> {
        RenderLayer::ALL
            .into_iter()
            .filter(move |layer| self.contains(layer.mask()))
    }
}

impl From<RenderLayer> for LayerMask {
    fn from(layer: RenderLayer) -> Self {
        layer.mask()
    }
}

impl FromIterator<RenderLayer> for LayerMask {
    fn from_iter<I: IntoIterator<Item = RenderLayer>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |mask, layer| mask | layer.mask())
    }
}

/// The scene-rendering passes of a frame, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Pass 1: glow-tagged objects into the glow target.
    GlowCapture,
    /// Pass 2: bloom-tagged objects into the bloom capture target.
    BloomRender,
    /// Pass 3: everything except glow-only objects onto the screen.
    MainScene,
}

impl Pass {
    /// All passes in frame order.
    pub const ALL: [Self; 3] =
        [Self::GlowCapture, Self::BloomRender, Self::MainScene];

    /// Stable snake_case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GlowCapture => "glow_capture",
            Self::BloomRender => "bloom_render",
            Self::MainScene => "main_scene",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Pass {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "glow_capture" | "GLOW_CAPTURE" => Ok(Self::GlowCapture),
            "bloom_render" | "BLOOM_RENDER" => Ok(Self::BloomRender),
            "main_scene" | "MAIN_SCENE" => Ok(Self::MainScene),
            other => Err(PipelineError::UnknownPass(other.to_owned())),
        }
    }
}

/// Static mapping from pass to visible layer set. Read-only while rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassConfig {
    glow_capture: LayerMask,
    bloom_render: LayerMask,
    main_scene: LayerMask,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            glow_capture: LayerMask::GLOW,
            bloom_render: LayerMask::BLOOM,
            // Glow is excluded: only its post-processed contribution shows.
            main_scene: LayerMask::BLOOM | LayerMask::DEFAULT,
        }
    }
}

impl PassConfig {
    /// Build a custom configuration. Call [`validate`](Self::validate)
    /// before handing it to a pipeline.
    #[must_use]
    pub const fn new(
        glow_capture: LayerMask,
        bloom_render: LayerMask,
        main_scene: LayerMask,
    ) -> Self {
        Self {
            glow_capture,
            bloom_render,
            main_scene,
        }
    }

    /// Layers visible during `pass`.
    #[must_use]
    pub const fn layers_for(&self, pass: Pass) -> LayerMask {
        match pass {
            Pass::GlowCapture => self.glow_capture,
            Pass::BloomRender => self.bloom_render,
            Pass::MainScene => self.main_scene,
        }
    }

    /// Layers for a pass given by name.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownPass`] for a name that is not a pass.
    pub fn layers_for_name(&self, name: &str) -> Result<LayerMask, PipelineError> {
        Ok(self.layers_for(name.parse()?))
    }

    /// Check the partition invariant: the main scene never sees the glow
    /// layer, and no pass is empty.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidPassConfig`] describing the first violation.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.main_scene.contains(LayerMask::GLOW) {
            return Err(PipelineError::InvalidPassConfig(
                "main scene pass must not include the glow layer".to_owned(),
            ));
        }
        for pass in Pass::ALL {
            if self.layers_for(pass).is_empty() {
                return Err(PipelineError::InvalidPassConfig(format!(
                    "pass {pass} has no visible layers"
                )));
            }
        }
        Ok(())
    }
}

/// Cached layer-mask switch.
///
/// Switching masks means rebuilding the list of visible drawables. The list
/// is kept until a different mask is requested or the scene changes
/// structurally (tracked via [`Scene::generation`]).
#[derive(Debug, Default)]
pub struct LayerSwitch {
    current: Option<LayerMask>,
    scene_generation: u64,
    visible: Vec<DrawableId>,
    switches: u64,
}

impl LayerSwitch {
    /// Empty switch with no active mask.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `mask` and return the drawables visible through it.
    pub fn select(&mut self, scene: &Scene, mask: LayerMask) -> &[DrawableId] {
        let mask_changed = self.current != Some(mask);
        if mask_changed || self.scene_generation != scene.generation() {
            if mask_changed {
                self.switches += 1;
                log::trace!("layer mask switch -> {mask:?}");
            }
            self.visible.clear();
            self.visible.extend(
                scene
                    .iter()
                    .filter(|(_, d)| d.layers.visible_through(mask))
                    .map(|(id, _)| id),
            );
            self.current = Some(mask);
            self.scene_generation = scene.generation();
        }
        &self.visible
    }

    /// The currently selected mask, if any.
    #[must_use]
    pub fn current(&self) -> Option<LayerMask> {
        self.current
    }

    /// Number of mask switches performed so far.
    #[must_use]
    pub fn switches(&self) -> u64 {
        self.switches
    }

    /// Forget the cached mask so the next [`select`](Self::select) rebuilds.
    pub fn invalidate(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Drawable, Primitive};
    use glam::Vec3;

    #[test]
    fn main_scene_excludes_glow() {
        let config = PassConfig::default();
        let main = config.layers_for(Pass::MainScene);
        assert!(!main.contains(LayerMask::GLOW));
        assert!(main.contains(LayerMask::BLOOM));
        assert!(main.contains(LayerMask::DEFAULT));
        assert!(!LayerMask::GLOW.visible_through(main));
        config.validate().unwrap();
    }

    #[test]
    fn glow_only_objects_are_partitioned() {
        let config = PassConfig::default();
        let glow = LayerMask::GLOW;
        assert!(glow.visible_through(config.layers_for(Pass::GlowCapture)));
        assert!(!glow.visible_through(config.layers_for(Pass::BloomRender)));
        assert!(!glow.visible_through(config.layers_for(Pass::MainScene)));

        let bloom = LayerMask::BLOOM;
        assert!(bloom.visible_through(config.layers_for(Pass::BloomRender)));
        assert!(bloom.visible_through(config.layers_for(Pass::MainScene)));
        assert!(!bloom.visible_through(config.layers_for(Pass::GlowCapture)));
    }

    #[test]
    fn mixed_glow_tags_only_reach_glow_capture() {
        let config = PassConfig::default();
        for mixed in [
            LayerMask::GLOW | LayerMask::DEFAULT,
            LayerMask::GLOW | LayerMask::BLOOM,
            LayerMask::all(),
        ] {
            assert!(mixed.visible_through(config.layers_for(Pass::GlowCapture)));
            assert!(!mixed.visible_through(config.layers_for(Pass::BloomRender)));
            assert!(!mixed.visible_through(config.layers_for(Pass::MainScene)));
        }
    }

    #[test]
    fn layer_switch_hides_mixed_glow_from_main_scene() {
        let mut scene = Scene::new();
        let mixed = scene.add(Drawable::new(
            "mixed",
            Primitive::sphere(0.5),
            Vec3::ZERO,
            Vec3::ONE,
            LayerMask::GLOW | LayerMask::DEFAULT,
        ));
        let config = PassConfig::default();
        let mut switch = LayerSwitch::new();
        assert!(switch
            .select(&scene, config.layers_for(Pass::MainScene))
            .is_empty());
        assert_eq!(
            switch.select(&scene, config.layers_for(Pass::GlowCapture)),
            &[mixed]
        );
    }

    #[test]
    fn glow_in_main_scene_is_rejected() {
        let config = PassConfig::new(
            LayerMask::GLOW,
            LayerMask::BLOOM,
            LayerMask::all(),
        );
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidPassConfig(_))
        ));
    }

    #[test]
    fn pass_names_round_trip() {
        for pass in Pass::ALL {
            assert_eq!(pass.name().parse::<Pass>().unwrap(), pass);
        }
        assert_eq!("MAIN_SCENE".parse::<Pass>().unwrap(), Pass::MainScene);
        assert!(matches!(
            "godrays".parse::<Pass>(),
            Err(PipelineError::UnknownPass(name)) if name == "godrays"
        ));
        assert!(PassConfig::default().layers_for_name("nope").is_err());
    }

    #[test]
    fn mask_key_is_order_independent() {
        let a: LayerMask =
            [RenderLayer::Bloom, RenderLayer::Default].into_iter().collect();
        let b: LayerMask =
            [RenderLayer::Default, RenderLayer::Bloom].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(
            a.layers().collect::<Vec<_>>(),
            vec![RenderLayer::Default, RenderLayer::Bloom]
        );
    }

    #[test]
    fn layer_switch_skips_redundant_masks() {
        let mut scene = Scene::new();
        let glow = scene.add(Drawable::new(
            "glow",
            Primitive::sphere(0.5),
            Vec3::ZERO,
            Vec3::ONE,
            LayerMask::GLOW,
        ));
        let _plain = scene.add(Drawable::new(
            "plain",
            Primitive::cuboid(Vec3::ONE),
            Vec3::X,
            Vec3::ONE,
            LayerMask::DEFAULT,
        ));

        let mut switch = LayerSwitch::new();
        assert_eq!(switch.select(&scene, LayerMask::GLOW), &[glow]);
        assert_eq!(switch.select(&scene, LayerMask::GLOW), &[glow]);
        assert_eq!(switch.switches(), 1);

        assert_eq!(switch.select(&scene, LayerMask::BLOOM).len(), 0);
        assert_eq!(switch.switches(), 2);
    }

    #[test]
    fn layer_switch_rebuilds_after_scene_change() {
        let mut scene = Scene::new();
        let mut switch = LayerSwitch::new();
        assert!(switch.select(&scene, LayerMask::BLOOM).is_empty());

        let cube = scene.add(Drawable::new(
            "cube",
            Primitive::cuboid(Vec3::ONE),
            Vec3::ZERO,
            Vec3::ONE,
            LayerMask::BLOOM,
        ));
        assert_eq!(switch.select(&scene, LayerMask::BLOOM), &[cube]);
        // Same mask, so the scene change did not count as a switch.
        assert_eq!(switch.switches(), 1);
    }
}
