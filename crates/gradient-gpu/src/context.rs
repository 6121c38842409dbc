use gradient_core::compositor::{GAMMA, VIBRANCE};
use gradient_core::store::RenderLayer;
use gradient_core::viewport::UvWindow;
use wgpu::{Adapter, Device, Instance, Queue, Surface};

use crate::error::GpuError;

pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Adapter,
    pub device: Device,
    pub queue: Queue,
}

impl GpuContext {
    /// Create a headless GPU context (no surface). Used for offscreen export
    /// and testing. The windowed variant is [`GpuContext::for_surface`].
    pub async fn new_headless() -> Result<Self, GpuError> {
        let instance = Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;
        Self::finish(instance, adapter, "gradient-gpu headless device").await
    }

    /// Adapter and device able to present to `surface`.
    pub async fn for_surface(instance: Instance, surface: &Surface<'_>) -> Result<Self, GpuError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;
        Self::finish(instance, adapter, "gradient-app device").await
    }

    async fn finish(instance: Instance, adapter: Adapter, label: &str) -> Result<Self, GpuError> {
        log::info!("GPU adapter: {}", adapter.get_info().name);
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some(label),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;
        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }
}

// ---------------------------------------------------------------------------
// Uniform blocks
// ---------------------------------------------------------------------------

/// Per-layer data for `organic_gradient.wgsl`. Field order and padding must
/// match the `GradientUniforms` struct there (96 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GradientUniforms {
    pub resolution: [f32; 2],
    pub uv_center: [f32; 2],
    pub uv_half_extent: [f32; 2],
    pub time: f32,
    /// Computed on the host: WGSL `round` is half-to-even.
    pub octaves: u32,
    pub noise_scale: f32,
    pub flow_intensity: f32,
    pub threshold_min: f32,
    pub threshold_max: f32,
    pub color1: [f32; 4],
    pub color2: [f32; 4],
    pub grain_amount: f32,
    pub grain_scale: f32,
    pub vibrance: f32,
    pub gamma: f32,
}

impl GradientUniforms {
    pub fn new(layer: &RenderLayer, width: u32, height: u32) -> Self {
        let window = UvWindow::for_size(width, height);
        Self {
            resolution: [width as f32, height as f32],
            uv_center: window.center.to_array(),
            uv_half_extent: window.half_extent.to_array(),
            time: layer.time,
            octaves: layer.flow.octaves,
            noise_scale: layer.flow.noise_scale,
            flow_intensity: layer.flow.flow_intensity,
            threshold_min: layer.shape.threshold_min,
            threshold_max: layer.shape.threshold_max,
            color1: layer.shape.color1.extend(1.0).to_array(),
            color2: layer.shape.color2.extend(1.0).to_array(),
            grain_amount: layer.shape.grain_amount,
            grain_scale: layer.shape.grain_scale,
            vibrance: VIBRANCE,
            gamma: GAMMA,
        }
    }
}

/// Per-layer data for `composite.wgsl` (16 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompositeUniforms {
    pub opacity: f32,
    pub blend_mode: u32,
    /// Non-zero for the bottom layer: the backdrop is black.
    pub first: u32,
    pub _pad: u32,
}

impl CompositeUniforms {
    pub fn new(layer: &RenderLayer, first: bool) -> Self {
        Self {
            opacity: layer.opacity.clamp(0.0, 1.0),
            blend_mode: layer.blend_mode.index(),
            first: first as u32,
            _pad: 0,
        }
    }

    /// Writes plain black: zero opacity over a black backdrop.
    pub const BLANK: Self = Self {
        opacity: 0.0,
        blend_mode: 0,
        first: 1,
        _pad: 0,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradient_core::{FramePolicy, GradientStore, Timeline};

    #[test]
    fn uniform_sizes_match_wgsl_layouts() {
        assert_eq!(std::mem::size_of::<GradientUniforms>(), 96);
        assert_eq!(std::mem::size_of::<CompositeUniforms>(), 16);
    }

    #[test]
    fn color_block_starts_on_a_16_byte_boundary() {
        assert_eq!(std::mem::offset_of!(GradientUniforms, color1), 48);
        assert_eq!(std::mem::offset_of!(GradientUniforms, color2), 64);
        assert_eq!(std::mem::offset_of!(GradientUniforms, grain_amount), 80);
    }

    #[test]
    fn uniforms_carry_resolved_layer() {
        let store = GradientStore::new();
        let snap = store.snapshot(&FramePolicy::default(), &Timeline::new());
        let u = GradientUniforms::new(&snap.layers[0], 800, 400);
        assert_eq!(u.resolution, [800.0, 400.0]);
        assert_eq!(u.octaves, 5);
        assert_eq!(u.uv_center, [0.5, 0.5]);
        assert!((u.uv_half_extent[0] - 2.0 * u.uv_half_extent[1]).abs() < 1e-6);
        assert_eq!(u.color1[3], 1.0);
        assert_eq!(u.gamma, GAMMA);
    }

    #[test]
    fn composite_uniforms_encode_blend_index() {
        let store = GradientStore::new();
        let mut layer = store.snapshot(&FramePolicy::default(), &Timeline::new()).layers[0].clone();
        layer.blend_mode = gradient_core::BlendMode::Exclusion;
        layer.opacity = 3.0;
        let c = CompositeUniforms::new(&layer, true);
        assert_eq!(c.blend_mode, 11);
        assert_eq!(c.opacity, 1.0);
        assert_eq!(c.first, 1);
    }
}
