//! Triangle meshes for the primitive shapes a [`Drawable`](super::Drawable)
//! can use. Both backends rasterize exactly these triangles.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

/// Indexed triangle list in object space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex positions.
    pub positions: Vec<[f32; 3]>,
    /// Triangle indices, three per face.
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterate over triangles as position triples.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                Vec3::from(self.positions[tri[0] as usize]),
                Vec3::from(self.positions[tri[1] as usize]),
                Vec3::from(self.positions[tri[2] as usize]),
            ]
        })
    }
}

/// Primitive shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    /// UV sphere centred on the origin.
    Sphere {
        /// Radius.
        radius: f32,
        /// Longitudinal subdivisions.
        segments: u32,
        /// Latitudinal subdivisions.
        rings: u32,
    },
    /// Axis-aligned box centred on the origin.
    Cuboid {
        /// Full extents.
        size: Vec3,
    },
    /// Horizontal plane (XZ) centred on the origin.
    Plane {
        /// Extent along X.
        width: f32,
        /// Extent along Z.
        depth: f32,
    },
}

impl Primitive {
    /// Sphere with a default 16x12 tessellation.
    #[must_use]
    pub const fn sphere(radius: f32) -> Self {
        Self::Sphere {
            radius,
            segments: 16,
            rings: 12,
        }
    }

    /// Box with the given full extents.
    #[must_use]
    pub const fn cuboid(size: Vec3) -> Self {
        Self::Cuboid { size }
    }

    /// Ground plane.
    #[must_use]
    pub const fn plane(width: f32, depth: f32) -> Self {
        Self::Plane { width, depth }
    }

    /// Hashable identity of the generated mesh (float fields by bit
    /// pattern), used to share GPU buffers between equal primitives.
    #[must_use]
    pub fn cache_key(&self) -> (u8, [u32; 3]) {
        match *self {
            Self::Sphere {
                radius,
                segments,
                rings,
            } => (0, [radius.to_bits(), segments, rings]),
            Self::Cuboid { size } => {
                (1, [size.x.to_bits(), size.y.to_bits(), size.z.to_bits()])
            }
            Self::Plane { width, depth } => {
                (2, [width.to_bits(), depth.to_bits(), 0])
            }
        }
    }

    /// Generate the triangle mesh.
    #[must_use]
    pub fn mesh(&self) -> MeshData {
        match *self {
            Self::Sphere {
                radius,
                segments,
                rings,
            } => sphere_mesh(radius, segments.max(3), rings.max(2)),
            Self::Cuboid { size } => cuboid_mesh(size * 0.5),
            Self::Plane { width, depth } => plane_mesh(width * 0.5, depth * 0.5),
        }
    }
}

fn sphere_mesh(radius: f32, segments: u32, rings: u32) -> MeshData {
    let mut positions =
        Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
    for ring in 0..=rings {
        let theta = ring as f32 / rings as f32 * PI;
        let (sin_t, cos_t) = theta.sin_cos();
        for seg in 0..=segments {
            let phi = seg as f32 / segments as f32 * TAU;
            let (sin_p, cos_p) = phi.sin_cos();
            positions.push([
                radius * sin_t * cos_p,
                radius * cos_t,
                radius * sin_t * sin_p,
            ]);
        }
    }

    let stride = segments + 1;
    let mut indices = Vec::with_capacity((segments * rings * 6) as usize);
    for ring in 0..rings {
        for seg in 0..segments {
            let a = ring * stride + seg;
            let b = a + stride;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }
    MeshData { positions, indices }
}

fn cuboid_mesh(half: Vec3) -> MeshData {
    let positions = (0..8u32)
        .map(|i| {
            let sx = if i & 1 == 0 { -half.x } else { half.x };
            let sy = if i & 2 == 0 { -half.y } else { half.y };
            let sz = if i & 4 == 0 { -half.z } else { half.z };
            [sx, sy, sz]
        })
        .collect();
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 1, 1, 2, 3, // -z
        4, 5, 6, 5, 7, 6, // +z
        0, 1, 4, 1, 5, 4, // -y
        2, 6, 3, 3, 6, 7, // +y
        0, 4, 2, 2, 4, 6, // -x
        1, 3, 5, 3, 7, 5, // +x
    ];
    MeshData { positions, indices }
}

fn plane_mesh(half_w: f32, half_d: f32) -> MeshData {
    MeshData {
        positions: vec![
            [-half_w, 0.0, -half_d],
            [half_w, 0.0, -half_d],
            [-half_w, 0.0, half_d],
            [half_w, 0.0, half_d],
        ],
        indices: vec![0, 2, 1, 1, 2, 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let mesh = Primitive::sphere(0.5).mesh();
        assert_eq!(mesh.triangle_count(), 16 * 12 * 2);
        for p in &mesh.positions {
            assert!((Vec3::from(*p).length() - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn cuboid_has_twelve_triangles_inside_bounds() {
        let mesh = Primitive::cuboid(Vec3::new(2.0, 1.0, 4.0)).mesh();
        assert_eq!(mesh.triangle_count(), 12);
        for tri in mesh.triangles() {
            for v in tri {
                assert!(v.x.abs() <= 1.0 && v.y.abs() <= 0.5 && v.z.abs() <= 2.0);
            }
        }
    }

    #[test]
    fn cache_keys_distinguish_shapes() {
        let a = Primitive::sphere(0.5).cache_key();
        let b = Primitive::sphere(0.25).cache_key();
        let c = Primitive::plane(1.0, 1.0).cache_key();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, Primitive::sphere(0.5).cache_key());
    }
}
