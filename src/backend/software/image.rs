use glam::{Vec2, Vec3, Vec4};

use crate::backend::{FilterMode, PixelFormat};
use crate::renderer::filter::luminance;

/// Linear RGBA float image, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<Vec4>,
}

impl Image {
    /// Transparent black image. Zero dimensions are allocated as one.
    #[must_use]
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            format,
            pixels: vec![Vec4::ZERO; (width * height) as usize],
        }
    }

    /// Width in texels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size of one texel in UV.
    #[must_use]
    pub fn texel(&self) -> Vec2 {
        Vec2::new(1.0 / self.width as f32, 1.0 / self.height as f32)
    }

    /// Reallocate at a new size, discarding the contents.
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height, self.format);
    }

    /// Fill with `color`.
    pub fn clear(&mut self, color: Vec4) {
        self.pixels.fill(color);
    }

    /// Texel at integer coordinates.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Overwrite a texel, applying the format's storage range.
    pub fn set(&mut self, x: u32, y: u32, color: Vec4) {
        let stored = match self.format {
            PixelFormat::Rgba8Unorm => color.clamp(Vec4::ZERO, Vec4::ONE),
            PixelFormat::Rgba16Float | PixelFormat::Rgba32Float => color,
        };
        let index = (y * self.width + x) as usize;
        self.pixels[index] = stored;
    }

    /// Add `rgb` onto a texel.
    pub fn add(&mut self, x: u32, y: u32, rgb: Vec3) {
        let current = self.get(x, y);
        self.set(x, y, current + rgb.extend(0.0));
    }

    /// Texel rows, top first.
    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    /// Sample at texture-space `uv` with clamp-to-edge addressing.
    #[must_use]
    pub fn sample(&self, uv: Vec2, filter: FilterMode) -> Vec3 {
        let pos = uv * Vec2::new(self.width as f32, self.height as f32);
        match filter {
            FilterMode::Nearest => {
                let x = self.clamp_x(pos.x.floor() as i64);
                let y = self.clamp_y(pos.y.floor() as i64);
                self.get(x, y).truncate()
            }
            FilterMode::Linear => {
                let p = pos - Vec2::splat(0.5);
                let base = p.floor();
                let f = p - base;
                let (x0, y0) = (base.x as i64, base.y as i64);
                let texel = |dx: i64, dy: i64| {
                    self.get(self.clamp_x(x0 + dx), self.clamp_y(y0 + dy))
                        .truncate()
                };
                let top = texel(0, 0).lerp(texel(1, 0), f.x);
                let bottom = texel(0, 1).lerp(texel(1, 1), f.x);
                top.lerp(bottom, f.y)
            }
        }
    }

    fn clamp_x(&self, x: i64) -> u32 {
        x.clamp(0, i64::from(self.width) - 1) as u32
    }

    fn clamp_y(&self, y: i64) -> u32 {
        y.clamp(0, i64::from(self.height) - 1) as u32
    }

    /// Largest luminance over the image.
    #[must_use]
    pub fn peak_luminance(&self) -> f32 {
        self.pixels
            .iter()
            .map(|p| luminance(p.truncate()))
            .fold(0.0, f32::max)
    }

    /// Sum of luminance over the image.
    #[must_use]
    pub fn total_luminance(&self) -> f32 {
        self.pixels
            .iter()
            .map(|p| luminance(p.truncate()))
            .sum()
    }

    /// Sum of luminance over a square window centred on `(cx, cy)`.
    #[must_use]
    pub fn window_luminance(&self, cx: u32, cy: u32, half: u32) -> f32 {
        let x0 = cx.saturating_sub(half);
        let y0 = cy.saturating_sub(half);
        let x1 = (cx + half).min(self.width - 1);
        let y1 = (cy + half).min(self.height - 1);
        let mut sum = 0.0;
        for y in y0..=y1 {
            for x in x0..=x1 {
                sum += luminance(self.get(x, y).truncate());
            }
        }
        sum
    }

    /// Tone-clamped 8-bit RGBA bytes, row-major from the top.
    #[must_use]
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|p| {
                let c = p.clamp(Vec4::ZERO, Vec4::ONE) * 255.0 + Vec4::splat(0.5);
                [c.x as u8, c.y as u8, c.z as u8, 255]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_allocates_one_texel() {
        let image = Image::new(0, 0, PixelFormat::Rgba16Float);
        assert_eq!((image.width(), image.height()), (1, 1));
    }

    #[test]
    fn unorm_storage_clamps() {
        let mut image = Image::new(2, 2, PixelFormat::Rgba8Unorm);
        image.set(0, 0, Vec4::splat(4.0));
        assert_eq!(image.get(0, 0), Vec4::ONE);

        let mut hdr = Image::new(2, 2, PixelFormat::Rgba16Float);
        hdr.set(0, 0, Vec4::splat(4.0));
        assert_eq!(hdr.get(0, 0), Vec4::splat(4.0));
    }

    #[test]
    fn bilinear_sampling_interpolates_between_texel_centres() {
        let mut image = Image::new(2, 1, PixelFormat::Rgba32Float);
        image.set(1, 0, Vec4::ONE);
        let mid = image.sample(Vec2::new(0.5, 0.5), FilterMode::Linear);
        assert!((mid.x - 0.5).abs() < 1e-6);
        let left = image.sample(Vec2::new(0.25, 0.5), FilterMode::Linear);
        assert_eq!(left, Vec3::ZERO);
        let edge = image.sample(Vec2::new(2.0, 0.5), FilterMode::Nearest);
        assert_eq!(edge, Vec3::ONE);
    }
}
