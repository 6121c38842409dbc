use glam::Vec3;

use crate::compositor::shade;
use crate::noise::{NoiseField, Simplex};
use crate::sampler::LayeredFlowSampler;
use crate::store::{FrameSnapshot, RenderLayer};
use crate::viewport::UvWindow;

/// A linear-RGB float image, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Vec3>,
}

impl Frame {
    /// Black frame, the backdrop layers are composited onto.
    pub fn black(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec3::ZERO; width as usize * height as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Vec3 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Tightly packed RGBA8, alpha 255.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for p in &self.pixels {
            let c = p.clamp(Vec3::ZERO, Vec3::ONE) * 255.0 + Vec3::splat(0.5);
            out.extend_from_slice(&[c.x as u8, c.y as u8, c.z as u8, 255]);
        }
        out
    }
}

/// Renders one resolved layer into a new frame.
pub fn render_layer<N: NoiseField>(
    sampler: &LayeredFlowSampler<N>,
    layer: &RenderLayer,
    width: u32,
    height: u32,
) -> Frame {
    let window = UvWindow::for_size(width, height);
    let mut frame = Frame::black(width, height);
    for y in 0..height {
        for x in 0..width {
            let uv = window.pixel_to_uv(x, y, width, height);
            let s = sampler.sample(uv, layer.time, &layer.flow);
            frame.pixels[(y * width + x) as usize] = shade(sampler.noise(), s, uv, &layer.shape);
        }
    }
    frame
}

/// Full stack, bottom layer first, onto black.
pub fn render_snapshot_with<N: NoiseField>(
    sampler: &LayeredFlowSampler<N>,
    snapshot: &FrameSnapshot,
    width: u32,
    height: u32,
) -> Frame {
    let mut acc = Frame::black(width, height);
    for layer in &snapshot.layers {
        let surface = render_layer(sampler, layer, width, height);
        for (dst, src) in acc.pixels.iter_mut().zip(&surface.pixels) {
            *dst = layer.blend_mode.composite(*src, *dst, layer.opacity);
        }
    }
    acc
}

/// [`render_snapshot_with`] using the default [`Simplex`] field.
pub fn render_snapshot(snapshot: &FrameSnapshot, width: u32, height: u32) -> Frame {
    render_snapshot_with(&LayeredFlowSampler::new(Simplex), snapshot, width, height)
}
