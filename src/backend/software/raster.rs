//! Scanline-free triangle rasterization over pixel centres.

use glam::{Vec2, Vec3, Vec4};
use smallvec::SmallVec;

/// A vertex after projection, with one interpolated 2D attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipVertex {
    /// Clip-space position.
    pub clip: Vec4,
    /// Attribute interpolated perspective-correctly (quad UVs).
    pub attr: Vec2,
}

/// A covered pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    /// Column.
    pub x: u32,
    /// Row, 0 at the top.
    pub y: u32,
    /// Depth in `[0,1]`.
    pub depth: f32,
    /// Interpolated attribute.
    pub attr: Vec2,
}

/// Clip a triangle against the near plane (`z >= 0` in clip space, the
/// wgpu depth convention), returning a convex polygon of 0, 3 or 4 vertices.
#[must_use]
pub fn clip_near(tri: [ClipVertex; 3]) -> SmallVec<[ClipVertex; 4]> {
    let mut out = SmallVec::new();
    for i in 0..3 {
        let a = tri[i];
        let b = tri[(i + 1) % 3];
        let a_in = a.clip.z >= 0.0;
        let b_in = b.clip.z >= 0.0;
        if a_in {
            out.push(a);
        }
        if a_in != b_in {
            let t = a.clip.z / (a.clip.z - b.clip.z);
            out.push(ClipVertex {
                clip: a.clip.lerp(b.clip, t),
                attr: a.attr.lerp(b.attr, t),
            });
        }
    }
    out
}

/// Rasterize a convex clip-space polygon as a triangle fan.
pub fn rasterize_polygon(
    width: u32,
    height: u32,
    polygon: &[ClipVertex],
    mut fragment: impl FnMut(Fragment),
) {
    for i in 1..polygon.len().saturating_sub(1) {
        rasterize_triangle(
            width,
            height,
            [polygon[0], polygon[i], polygon[i + 1]],
            &mut fragment,
        );
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Whether pixels exactly on the edge `a -> b` belong to this triangle.
/// A shared edge is walked in opposite directions by its two triangles, so
/// exactly one of them owns it.
fn owns_edge(a: Vec2, b: Vec2) -> bool {
    let d = b - a;
    d.y > 0.0 || (d.y == 0.0 && d.x < 0.0)
}

/// Rasterize one triangle. Vertices must be in front of the near plane.
pub fn rasterize_triangle(
    width: u32,
    height: u32,
    tri: [ClipVertex; 3],
    fragment: &mut impl FnMut(Fragment),
) {
    if tri.iter().any(|v| v.clip.w <= f32::EPSILON) {
        return;
    }
    let size = Vec2::new(width as f32, height as f32);
    let mut screen = [Vec2::ZERO; 3];
    let mut depth = Vec3::ZERO;
    let mut inv_w = Vec3::ZERO;
    for (i, v) in tri.iter().enumerate() {
        let ndc = v.clip.truncate() / v.clip.w;
        screen[i] = Vec2::new((ndc.x + 1.0) * 0.5, (1.0 - ndc.y) * 0.5) * size;
        depth[i] = ndc.z;
        inv_w[i] = 1.0 / v.clip.w;
    }

    let mut order = [0usize, 1, 2];
    let mut area = edge(screen[0], screen[1], screen[2]);
    if area.abs() <= f32::EPSILON {
        return;
    }
    if area < 0.0 {
        order.swap(1, 2);
        area = -area;
    }
    let [i0, i1, i2] = order;
    let (p0, p1, p2) = (screen[i0], screen[i1], screen[i2]);

    let min = p0.min(p1).min(p2).max(Vec2::ZERO);
    let max = p0.max(p1).max(p2).min(size);
    if min.x >= max.x || min.y >= max.y {
        return;
    }
    let (x0, y0) = (min.x.floor() as u32, min.y.floor() as u32);
    let (x1, y1) = (
        (max.x.ceil() as u32).min(width),
        (max.y.ceil() as u32).min(height),
    );

    let owns = [owns_edge(p1, p2), owns_edge(p2, p0), owns_edge(p0, p1)];
    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let e = [edge(p1, p2, p), edge(p2, p0, p), edge(p0, p1, p)];
            let inside = e
                .iter()
                .zip(owns)
                .all(|(&value, own)| value > 0.0 || (value == 0.0 && own));
            if !inside {
                continue;
            }
            let bary = Vec3::new(e[0], e[1], e[2]) / area;
            let b = [bary.x, bary.y, bary.z];
            let z = b[0] * depth[i0] + b[1] * depth[i1] + b[2] * depth[i2];
            if !(0.0..=1.0).contains(&z) {
                continue;
            }
            let pw = Vec3::new(b[0] * inv_w[i0], b[1] * inv_w[i1], b[2] * inv_w[i2]);
            let pw = pw / (pw.x + pw.y + pw.z);
            let attr = tri[i0].attr * pw.x + tri[i1].attr * pw.y + tri[i2].attr * pw.z;
            fragment(Fragment {
                x,
                y,
                depth: z,
                attr,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> ClipVertex {
        ClipVertex {
            clip: Vec4::new(x, y, 0.5, 1.0),
            attr: Vec2::new((x + 1.0) * 0.5, (1.0 - y) * 0.5),
        }
    }

    #[test]
    fn fullscreen_quad_covers_every_pixel_once() {
        let (w, h) = (7, 7);
        let mut hits = vec![0u32; (w * h) as usize];
        let quad = [v(-1.0, 1.0), v(1.0, 1.0), v(-1.0, -1.0), v(1.0, -1.0)];
        for tri in [[quad[0], quad[2], quad[1]], [quad[1], quad[2], quad[3]]] {
            rasterize_polygon(w, h, &tri, |f| hits[(f.y * w + f.x) as usize] += 1);
        }
        assert!(hits.iter().all(|&n| n == 1));
    }

    #[test]
    fn uv_attribute_follows_texture_space() {
        let mut top_left = None;
        let tri = [v(-1.0, 1.0), v(1.0, 1.0), v(-1.0, -1.0)];
        rasterize_polygon(4, 4, &tri, |f| {
            if f.x == 0 && f.y == 0 {
                top_left = Some(f.attr);
            }
        });
        let uv = top_left.unwrap();
        assert!((uv - Vec2::splat(0.125)).abs().max_element() < 1e-5);
    }

    #[test]
    fn near_clipping_keeps_visible_part() {
        let behind = ClipVertex {
            clip: Vec4::new(0.0, 0.0, -1.0, 0.5),
            attr: Vec2::ZERO,
        };
        let front = ClipVertex {
            clip: Vec4::new(0.0, 0.0, 1.0, 2.0),
            attr: Vec2::ONE,
        };
        assert_eq!(clip_near([behind, front, front]).len(), 4);
        assert_eq!(clip_near([behind, behind, behind]).len(), 0);
        assert_eq!(clip_near([front, front, front]).len(), 3);
    }
}
