//! Image-filter math shared by the software backend and mirrored by the WGSL
//! shaders in `assets/shaders/screen/`.

use glam::{Vec2, Vec3};

/// Rec. 709 luma coefficients.
pub const LUMA: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

/// Taps on each side of the centre tap in one blur direction.
pub const BLUR_TAPS_PER_SIDE: usize = 4;

/// Per-tap attenuation of the radial glow accumulation.
pub const GLOW_DECAY: f32 = 0.95;

/// Fraction of the pixel-to-centre distance covered by the glow taps.
pub const GLOW_DENSITY: f32 = 0.9;

/// Overall glow gain.
pub const GLOW_WEIGHT: f32 = 1.0;

/// Perceived brightness of a linear RGB color.
#[must_use]
pub fn luminance(rgb: Vec3) -> f32 {
    rgb.dot(LUMA)
}

/// GLSL-style smoothstep. Degenerate edges act as a step at `edge1`.
#[must_use]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x >= edge1 { 1.0 } else { 0.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Soft-threshold pass-through weight for a pixel of luminance `luma`.
///
/// Zero at or below `threshold - smoothing`, one at or above `threshold`,
/// smooth in between; `smoothing <= 0` is a hard step. Non-decreasing in
/// `luma`, non-increasing in `threshold` and, below `threshold`,
/// non-decreasing in `smoothing`.
#[must_use]
pub fn threshold_weight(luma: f32, threshold: f32, smoothing: f32) -> f32 {
    if smoothing <= 0.0 {
        return if luma >= threshold { 1.0 } else { 0.0 };
    }
    smoothstep(threshold - smoothing, threshold, luma)
}

/// Apply the soft threshold to a color.
#[must_use]
pub fn soft_threshold(rgb: Vec3, threshold: f32, smoothing: f32) -> Vec3 {
    rgb * threshold_weight(luminance(rgb), threshold, smoothing)
}

/// Normalised Gaussian weights for taps `0..=BLUR_TAPS_PER_SIDE`; tap `k > 0`
/// is used on both sides, so `w[0] + 2 * sum(w[1..]) == 1`.
#[must_use]
pub fn blur_weights(strength: f32) -> [f32; BLUR_TAPS_PER_SIDE + 1] {
    let sigma = 1.0 + strength.max(0.0);
    let mut weights = [0.0; BLUR_TAPS_PER_SIDE + 1];
    for (k, w) in weights.iter_mut().enumerate() {
        let k = k as f32;
        *w = (-(k * k) / (2.0 * sigma * sigma)).exp();
    }
    let total = weights[0] + 2.0 * weights[1..].iter().sum::<f32>();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// Tap direction of one blur pass, scaled by the radius.
#[must_use]
pub fn blur_direction(radius: f32, horizontal: bool) -> Vec2 {
    if horizontal {
        Vec2::new(radius, 0.0)
    } else {
        Vec2::new(0.0, radius)
    }
}

/// One separable blur pass at `uv`, sampling through `sample`.
pub fn blur_sample(
    uv: Vec2,
    direction: Vec2,
    texel: Vec2,
    weights: &[f32; BLUR_TAPS_PER_SIDE + 1],
    sample: impl Fn(Vec2) -> Vec3,
) -> Vec3 {
    let step = direction * texel;
    let mut sum = sample(uv) * weights[0];
    for (k, w) in weights.iter().enumerate().skip(1) {
        let offset = step * k as f32;
        sum += (sample(uv + offset) + sample(uv - offset)) * *w;
    }
    sum
}

/// Time shimmer applied to the glow.
#[must_use]
pub fn glow_shimmer(time: f32) -> f32 {
    1.0 + 0.05 * (1.5 * time).sin()
}

/// Convert a v-up screen UV (as produced by
/// [`Camera::project_to_uv`](crate::camera::Camera::project_to_uv)) to
/// texture space where v points down.
#[must_use]
pub fn screen_uv_to_texture(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x, 1.0 - uv.y)
}

/// Radial light-scattering accumulation from `uv` towards `center`, both in
/// texture space. The result is normalised by the total tap weight, so a
/// constant glow texture maps to itself before tint and shimmer.
pub fn radial_glow(
    uv: Vec2,
    center: Vec2,
    samples: u32,
    sample: impl Fn(Vec2) -> Vec3,
) -> Vec3 {
    let samples = samples.max(1);
    let delta = (uv - center) * (GLOW_DENSITY / samples as f32);
    let mut coord = uv;
    let mut decay = 1.0;
    let mut total_weight = 0.0;
    let mut sum = Vec3::ZERO;
    for _ in 0..samples {
        sum += sample(coord) * decay;
        total_weight += decay;
        decay *= GLOW_DECAY;
        coord -= delta;
    }
    sum / total_weight * GLOW_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn blur_weights_are_normalised_and_decreasing() {
        for strength in [0.0, 0.01, 1.0, 5.0] {
            let w = blur_weights(strength);
            let total = w[0] + 2.0 * w[1..].iter().sum::<f32>();
            assert!((total - 1.0).abs() < 1e-5);
            assert!(w.windows(2).all(|pair| pair[0] >= pair[1]));
        }
        // A stronger blur spreads energy away from the centre tap.
        assert!(blur_weights(3.0)[0] < blur_weights(0.0)[0]);
    }

    #[test]
    fn blur_of_constant_is_constant() {
        let w = blur_weights(0.5);
        let out = blur_sample(
            Vec2::splat(0.5),
            Vec2::X,
            Vec2::splat(0.01),
            &w,
            |_| Vec3::splat(0.7),
        );
        assert!((out - Vec3::splat(0.7)).abs().max_element() < 1e-5);
    }

    #[test]
    fn hard_threshold_when_smoothing_is_zero() {
        assert_eq!(threshold_weight(0.49, 0.5, 0.0), 0.0);
        assert_eq!(threshold_weight(0.5, 0.5, 0.0), 1.0);
        assert_eq!(soft_threshold(Vec3::ONE, 0.0, 0.1), Vec3::ONE);
    }

    #[test]
    fn soft_threshold_edges() {
        assert_eq!(threshold_weight(0.19, 0.5, 0.3), 0.0);
        assert!(threshold_weight(0.2, 0.5, 0.3) < 1e-5);
        assert_eq!(threshold_weight(0.5, 0.5, 0.3), 1.0);
        assert_eq!(threshold_weight(0.8, 0.5, 0.3), 1.0);
        let mid = threshold_weight(0.35, 0.5, 0.3);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn radial_glow_of_constant_is_constant() {
        let out = radial_glow(Vec2::new(0.1, 0.9), Vec2::splat(0.5), 24, |_| {
            Vec3::splat(0.25)
        });
        assert!((out - Vec3::splat(0.25)).abs().max_element() < 1e-5);
    }

    #[test]
    fn screen_uv_flip() {
        assert_eq!(screen_uv_to_texture(Vec2::new(0.25, 1.0)), Vec2::new(0.25, 0.0));
    }

    proptest! {
        #[test]
        fn threshold_monotone_in_threshold(
            luma in 0.0f32..2.0,
            t1 in 0.0f32..1.0,
            t2 in 0.0f32..1.0,
            s in 0.0f32..0.5,
        ) {
            let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
            prop_assert!(threshold_weight(luma, hi, s) <= threshold_weight(luma, lo, s) + 1e-6);
        }

        #[test]
        fn threshold_monotone_in_smoothing_below_threshold(
            t in 0.0f32..1.0,
            frac in 0.0f32..1.0,
            s1 in 0.0f32..0.5,
            s2 in 0.0f32..0.5,
        ) {
            let luma = t * frac;
            let (lo, hi) = if s1 <= s2 { (s1, s2) } else { (s2, s1) };
            prop_assert!(threshold_weight(luma, t, lo) <= threshold_weight(luma, t, hi) + 1e-6);
        }

        #[test]
        fn raising_threshold_never_adds_bloom(
            r in 0.0f32..2.0,
            g in 0.0f32..2.0,
            b in 0.0f32..2.0,
            t in 0.0f32..0.9,
            dt in 0.0f32..0.1,
            s in 0.0f32..0.5,
        ) {
            let rgb = Vec3::new(r, g, b);
            let low = luminance(soft_threshold(rgb, t, s));
            let high = luminance(soft_threshold(rgb, t + dt, s));
            prop_assert!(high <= low + 1e-5);
        }

        #[test]
        fn threshold_weight_in_unit_range(
            luma in -1.0f32..3.0,
            t in 0.0f32..1.0,
            s in 0.0f32..0.5,
        ) {
            let w = threshold_weight(luma, t, s);
            prop_assert!((0.0..=1.0).contains(&w));
        }
    }
}
