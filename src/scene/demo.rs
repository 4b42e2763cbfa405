//! The Erdtree demo scene used by the CLI, the viewer and the end-to-end
//! tests.
//!
//! Geometry is deliberately coarse: a ground plane, a few ruin blocks, a
//! golden trunk and canopy on the bloom layer, and the godray source sphere
//! on the glow layer with a small bloom core at its centre.

use glam::Vec3;

use super::{Drawable, DrawableId, Primitive, Scene};
use crate::camera::Camera;
use crate::layers::LayerMask;

/// World position of the godray source.
pub const GLOW_SOURCE_POSITION: Vec3 = Vec3::new(0.0, 1.12, 0.0);

/// Warm gold used for the tree and the bloom core.
const GOLD: Vec3 = Vec3::new(0.949, 0.859, 0.557);

/// Demo scene plus its camera.
#[derive(Debug)]
pub struct DemoScene {
    /// Scene content with the glow source registered.
    pub scene: Scene,
    /// Cinematic camera.
    pub camera: Camera,
    /// The godray source drawable.
    pub glow_source: DrawableId,
}

/// Cinematic camera framing the tree.
#[must_use]
pub fn erdtree_camera(aspect: f32) -> Camera {
    Camera {
        znear: 0.1,
        zfar: 150.0,
        ..Camera::looking_at(
            Vec3::new(1.5, 0.85, 1.9),
            Vec3::new(0.0, 0.7, 0.0),
            35.0,
            aspect,
        )
    }
}

/// Build the demo scene for a viewport of the given aspect.
#[must_use]
pub fn erdtree_scene(aspect: f32) -> DemoScene {
    let mut scene = Scene::new();

    let _ground = scene.add(Drawable::new(
        "ground",
        Primitive::plane(12.0, 12.0),
        Vec3::ZERO,
        Vec3::new(0.07, 0.075, 0.085),
        LayerMask::DEFAULT,
    ));
    for (i, (x, z, h)) in [(-1.1, -0.6, 0.45), (0.9, -0.9, 0.3), (-0.5, 1.0, 0.2)]
        .into_iter()
        .enumerate()
    {
        let _ruin = scene.add(
            Drawable::new(
                format!("ruin_{i}"),
                Primitive::cuboid(Vec3::ONE),
                Vec3::new(x, h * 0.5, z),
                Vec3::new(0.18, 0.17, 0.16),
                LayerMask::DEFAULT,
            )
            .with_scale(Vec3::new(0.25, h, 0.25)),
        );
    }

    let _trunk = scene.add(
        Drawable::new(
            "trunk",
            Primitive::cuboid(Vec3::ONE),
            Vec3::new(0.0, 0.45, 0.0),
            GOLD * 0.8,
            LayerMask::BLOOM,
        )
        .with_scale(Vec3::new(0.12, 0.9, 0.12)),
    );
    let _canopy = scene.add(
        Drawable::new(
            "canopy",
            Primitive::sphere(0.55),
            Vec3::new(0.0, 1.25, 0.0),
            GOLD,
            LayerMask::BLOOM,
        )
        .with_scale(Vec3::new(1.0, 0.6, 1.0)),
    );

    let glow_source = scene.add(Drawable::new(
        "godray_source",
        Primitive::Sphere {
            radius: 0.5,
            segments: 8,
            rings: 8,
        },
        GLOW_SOURCE_POSITION,
        Vec3::ONE,
        LayerMask::GLOW,
    ));
    let _core = scene.add(Drawable::new(
        "godray_core",
        Primitive::Sphere {
            radius: 0.1,
            segments: 8,
            rings: 8,
        },
        GLOW_SOURCE_POSITION,
        GOLD,
        LayerMask::BLOOM,
    ));

    // The id was just inserted, so registration cannot fail.
    if let Err(err) = scene.register_glow_source(glow_source) {
        log::error!("demo glow source registration failed: {err}");
    }

    DemoScene {
        scene,
        camera: erdtree_camera(aspect),
        glow_source,
    }
}
