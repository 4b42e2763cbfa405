//! Uniform layouts of the full-screen shaders. Each struct must match the
//! WGSL struct of the same name.

use glam::Mat4;

use crate::backend::QuadUniforms;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ThresholdParams {
    projection: [[f32; 4]; 4],
    threshold: f32,
    smoothing: f32,
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct BlurParams {
    projection: [[f32; 4]; 4],
    direction: [f32; 2],
    texel: [f32; 2],
    weights_a: [f32; 4],
    weights_b: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct CompositeParams {
    projection: [[f32; 4]; 4],
    tint: [f32; 3],
    time: f32,
    glow_center: [f32; 2],
    glow_samples: u32,
    flags: u32,
}

const FLAG_BLOOM: u32 = 1;
const FLAG_GLOW: u32 = 2;

/// Size of the largest parameter block; material buffers are allocated at
/// this size.
pub const MAX_UNIFORM_SIZE: u64 = std::mem::size_of::<BlurParams>() as u64;

/// Serialize a draw's projection and parameters into the shader layout.
#[must_use]
pub fn quad_uniform_bytes(projection: Mat4, uniforms: &QuadUniforms) -> Vec<u8> {
    let projection = projection.to_cols_array_2d();
    match *uniforms {
        QuadUniforms::Threshold {
            threshold,
            smoothing,
        } => bytemuck::bytes_of(&ThresholdParams {
            projection,
            threshold,
            smoothing,
            _pad: [0.0; 2],
        })
        .to_vec(),
        QuadUniforms::Blur {
            direction,
            texel,
            weights,
        } => bytemuck::bytes_of(&BlurParams {
            projection,
            direction: direction.to_array(),
            texel: texel.to_array(),
            weights_a: [weights[0], weights[1], weights[2], weights[3]],
            weights_b: [weights[4], 0.0, 0.0, 0.0],
        })
        .to_vec(),
        QuadUniforms::Composite(u) => {
            let mut flags = 0;
            if u.bloom_enabled {
                flags |= FLAG_BLOOM;
            }
            if u.glow_enabled {
                flags |= FLAG_GLOW;
            }
            bytemuck::bytes_of(&CompositeParams {
                projection,
                tint: u.tint.to_array(),
                time: u.time,
                glow_center: u.glow_center.to_array(),
                glow_samples: u.glow_samples,
                flags,
            })
            .to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CompositeUniforms;
    use glam::{Vec2, Vec3};

    #[test]
    fn layouts_match_wgsl_sizes() {
        assert_eq!(std::mem::size_of::<ThresholdParams>(), 80);
        assert_eq!(std::mem::size_of::<BlurParams>(), 112);
        assert_eq!(std::mem::size_of::<CompositeParams>(), 96);
        assert_eq!(MAX_UNIFORM_SIZE, 112);
    }

    #[test]
    fn composite_flags_are_packed() {
        let bytes = quad_uniform_bytes(
            Mat4::IDENTITY,
            &QuadUniforms::Composite(CompositeUniforms {
                time: 1.0,
                glow_center: Vec2::new(0.25, 0.75),
                tint: Vec3::ONE,
                glow_samples: 24,
                bloom_enabled: false,
                glow_enabled: true,
            }),
        );
        let params: CompositeParams = bytemuck::pod_read_unaligned(&bytes);
        assert_eq!(params.flags, FLAG_GLOW);
        assert_eq!(params.glow_samples, 24);
        assert_eq!(params.glow_center, [0.25, 0.75]);
    }
}
