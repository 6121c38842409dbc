use gradient_core::store::FrameSnapshot;
use wgpu::{Buffer, Device, Queue, TextureView};

use crate::composite_pipeline::{CompositePass, PingPong};
use crate::context::{CompositeUniforms, GradientUniforms};
use crate::gradient_pipeline::{GradientPass, LayerSurface};

/// Renders a whole [`FrameSnapshot`]: one gradient pass per layer into its
/// own surface, then one composite pass per layer, bottom first, onto black.
pub struct StackRenderer {
    gradient: GradientPass,
    composite: CompositePass,
    surfaces: Vec<LayerSurface>,
    pp: PingPong,
    blank_uniforms: Buffer,
    width: u32,
    height: u32,
}

impl StackRenderer {
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            gradient: GradientPass::new(device),
            composite: CompositePass::new(device),
            surfaces: vec![LayerSurface::new(device, width, height)],
            pp: PingPong::new(device, width, height),
            blank_uniforms: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("blank_composite_uniforms"),
                size: std::mem::size_of::<CompositeUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
            width,
            height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Rebuild size-dependent textures. Pipelines are kept.
    pub fn resize(&mut self, device: &Device, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        let count = self.surfaces.len();
        self.surfaces = (0..count)
            .map(|_| LayerSurface::new(device, width, height))
            .collect();
        self.pp = PingPong::new(device, width, height);
        log::debug!("stack targets resized to {width}×{height}");
    }

    fn ensure_surfaces(&mut self, device: &Device, count: usize) {
        while self.surfaces.len() < count.max(1) {
            self.surfaces
                .push(LayerSurface::new(device, self.width, self.height));
        }
    }

    /// Record every pass for `snapshot` into `encoder`. The composite ends
    /// up in [`StackRenderer::output_view`].
    pub fn encode(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut wgpu::CommandEncoder,
        snapshot: &FrameSnapshot,
    ) {
        self.ensure_surfaces(device, snapshot.layers.len());
        let (width, height) = (self.width, self.height);

        // All layer surfaces first, so every composite step reads the same
        // logical frame.
        for (layer, surface) in snapshot.layers.iter().zip(&self.surfaces) {
            let uniforms = GradientUniforms::new(layer, width, height);
            self.gradient
                .dispatch(device, encoder, queue, surface, &uniforms);
        }

        if snapshot.layers.is_empty() {
            self.composite.dispatch(
                device,
                encoder,
                queue,
                &self.blank_uniforms,
                &CompositeUniforms::BLANK,
                &self.surfaces[0].view,
                &mut self.pp,
                width,
                height,
            );
            return;
        }

        for (i, (layer, surface)) in snapshot.layers.iter().zip(&self.surfaces).enumerate() {
            let uniforms = CompositeUniforms::new(layer, i == 0);
            self.composite.dispatch(
                device,
                encoder,
                queue,
                &surface.composite_uniforms,
                &uniforms,
                &surface.view,
                &mut self.pp,
                width,
                height,
            );
        }
    }

    pub fn output_view(&self) -> &TextureView {
        self.pp.read_view()
    }

    pub fn output_texture(&self) -> &wgpu::Texture {
        self.pp.read_texture()
    }
}
