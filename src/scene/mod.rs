//! Minimal scene graph consumed by the pipeline.
//!
//! The pipeline does not build or own scene content: the host fills a
//! [`Scene`] with [`Drawable`]s tagged with their render layers and shares it
//! through a [`SharedScene`] handle.

pub mod demo;
mod mesh_gen;

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat4, Vec3};
use slotmap::{new_key_type, SlotMap};

pub use mesh_gen::{MeshData, Primitive};

use crate::error::PipelineError;
use crate::layers::LayerMask;

new_key_type! {
    /// Handle to a drawable inside a [`Scene`].
    pub struct DrawableId;
}

/// Single-threaded shared scene handle.
pub type SharedScene = Rc<RefCell<Scene>>;

// ---------------------------------------------------------------------------
// Drawable
// ---------------------------------------------------------------------------

/// A renderable object: a primitive mesh, a transform, a flat emissive
/// color and its layer membership.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    /// Debug name.
    pub name: String,
    /// Mesh shape.
    pub primitive: Primitive,
    /// World-space position.
    pub position: Vec3,
    /// Per-axis scale.
    pub scale: Vec3,
    /// Linear RGB color. Values above 1.0 are allowed (HDR emitters).
    pub color: Vec3,
    /// Render layers this object belongs to.
    pub layers: LayerMask,
}

impl Drawable {
    /// Drawable with unit scale.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        primitive: Primitive,
        position: Vec3,
        color: Vec3,
        layers: LayerMask,
    ) -> Self {
        Self {
            name: name.into(),
            primitive,
            position,
            scale: Vec3::ONE,
            color,
            layers,
        }
    }

    /// Replace the scale.
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Model matrix (scale then translate).
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale,
            glam::Quat::IDENTITY,
            self.position,
        )
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// Flat drawable storage plus the registered glow source.
#[derive(Debug, Default)]
pub struct Scene {
    drawables: SlotMap<DrawableId, Drawable>,
    glow_source: Option<DrawableId>,
    /// Bumped on insertion, removal and mutable access; cached visibility
    /// lists compare against it.
    generation: u64,
}

impl Scene {
    /// Empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap into a shared handle.
    #[must_use]
    pub fn into_shared(self) -> SharedScene {
        Rc::new(RefCell::new(self))
    }

    /// Insert a drawable.
    pub fn add(&mut self, drawable: Drawable) -> DrawableId {
        self.generation += 1;
        self.drawables.insert(drawable)
    }

    /// Remove a drawable. Unregisters it as glow source if it was one.
    pub fn remove(&mut self, id: DrawableId) -> Option<Drawable> {
        let removed = self.drawables.remove(id)?;
        self.generation += 1;
        if self.glow_source == Some(id) {
            self.glow_source = None;
        }
        Some(removed)
    }

    /// Shared access to a drawable.
    #[must_use]
    pub fn get(&self, id: DrawableId) -> Option<&Drawable> {
        self.drawables.get(id)
    }

    /// Mutable access to a drawable. Counts as a change since the layers may
    /// be edited.
    pub fn get_mut(&mut self, id: DrawableId) -> Option<&mut Drawable> {
        let drawable = self.drawables.get_mut(id)?;
        self.generation += 1;
        Some(drawable)
    }

    /// Iterate over all drawables.
    pub fn iter(&self) -> impl Iterator<Item = (DrawableId, &Drawable)> {
        self.drawables.iter()
    }

    /// Number of drawables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    /// Whether the scene has no drawables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    /// Current change counter.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Register the drawable whose position anchors the glow composite.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownGlowSource`] if `id` is not in the scene.
    pub fn register_glow_source(
        &mut self,
        id: DrawableId,
    ) -> Result<(), PipelineError> {
        if !self.drawables.contains_key(id) {
            return Err(PipelineError::UnknownGlowSource);
        }
        self.glow_source = Some(id);
        Ok(())
    }

    /// Forget the registered glow source.
    pub fn clear_glow_source(&mut self) {
        self.glow_source = None;
    }

    /// World position of the registered glow source.
    #[must_use]
    pub fn glow_source_position(&self) -> Option<Vec3> {
        self.glow_source
            .and_then(|id| self.drawables.get(id))
            .map(|d| d.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(layers: LayerMask) -> Drawable {
        Drawable::new("s", Primitive::sphere(0.5), Vec3::Y, Vec3::ONE, layers)
    }

    #[test]
    fn generation_tracks_changes() {
        let mut scene = Scene::new();
        let g0 = scene.generation();
        let id = scene.add(sphere(LayerMask::GLOW));
        assert!(scene.generation() > g0);

        let g1 = scene.generation();
        scene.get_mut(id).unwrap().layers = LayerMask::BLOOM;
        assert!(scene.generation() > g1);

        let g2 = scene.generation();
        let _ = scene.get(id);
        assert_eq!(scene.generation(), g2);
    }

    #[test]
    fn glow_source_registration() {
        let mut scene = Scene::new();
        let id = scene.add(sphere(LayerMask::GLOW));
        assert_eq!(scene.glow_source_position(), None);

        scene.register_glow_source(id).unwrap();
        assert_eq!(scene.glow_source_position(), Some(Vec3::Y));

        let _ = scene.remove(id);
        assert_eq!(scene.glow_source_position(), None);
        assert!(matches!(
            scene.register_glow_source(id),
            Err(PipelineError::UnknownGlowSource)
        ));
    }
}
