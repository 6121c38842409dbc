use wgpu::{BindGroupLayout, Buffer, ComputePipeline, Device, Queue, Texture, TextureView};

use crate::context::{CompositeUniforms, GradientUniforms};

pub const WORKGROUP: u32 = 8;

/// Float texture every layer pass writes and the compositor reads.
pub(crate) fn float_target(device: &Device, label: &str, width: u32, height: u32) -> Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba32Float,
        usage: wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn uniform_buffer(device: &Device, label: &str, size: usize) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

// ---------------------------------------------------------------------------
// LayerSurface: one layer's private resources
// ---------------------------------------------------------------------------

/// Output texture plus the two uniform buffers a layer needs per frame.
///
/// Each layer owns its buffers: every `write_buffer` in a frame lands before
/// the single submit, so a shared buffer would leave all layers seeing the
/// last write.
pub struct LayerSurface {
    pub gradient_uniforms: Buffer,
    pub composite_uniforms: Buffer,
    pub texture: Texture,
    pub view: TextureView,
}

impl LayerSurface {
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let texture = float_target(device, "layer_surface", width, height);
        let view = texture.create_view(&Default::default());
        Self {
            gradient_uniforms: uniform_buffer(
                device,
                "layer_gradient_uniforms",
                std::mem::size_of::<GradientUniforms>(),
            ),
            composite_uniforms: uniform_buffer(
                device,
                "layer_composite_uniforms",
                std::mem::size_of::<CompositeUniforms>(),
            ),
            texture,
            view,
        }
    }
}

// ---------------------------------------------------------------------------
// GradientPass: the organic gradient compute pipeline
// ---------------------------------------------------------------------------

pub struct GradientPass {
    pipeline: ComputePipeline,
    bind_group_layout: BindGroupLayout,
}

impl GradientPass {
    pub fn new(device: &Device) -> Self {
        // binding 0 : GradientUniforms
        // binding 1 : rgba32float storage texture (write-only)
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gradient_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba32Float,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("gradient_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("organic_gradient"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/organic_gradient.wgsl").into()),
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("organic_gradient"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: "main",
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
        }
    }

    /// Upload `uniforms` and record the gradient pass into `encoder`.
    /// The result lands in `surface.texture`.
    pub fn dispatch(
        &self,
        device: &Device,
        encoder: &mut wgpu::CommandEncoder,
        queue: &Queue,
        surface: &LayerSurface,
        uniforms: &GradientUniforms,
    ) {
        queue.write_buffer(&surface.gradient_uniforms, 0, bytemuck::bytes_of(uniforms));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("gradient_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: surface.gradient_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&surface.view),
                },
            ],
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("gradient_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);

        let width = uniforms.resolution[0] as u32;
        let height = uniforms.resolution[1] as u32;
        pass.dispatch_workgroups(width.div_ceil(WORKGROUP), height.div_ceil(WORKGROUP), 1);
    }
}
