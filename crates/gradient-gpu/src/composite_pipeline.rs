use wgpu::{BindGroupLayout, Buffer, ComputePipeline, Device, Queue, TextureView};

use crate::context::CompositeUniforms;
use crate::gradient_pipeline::{float_target, WORKGROUP};

/// Ping-pong texture set: two storage textures that swap roles each
/// composite step.
pub struct PingPong {
    pub tex_a: wgpu::Texture,
    pub tex_b: wgpu::Texture,
    pub view_a: TextureView,
    pub view_b: TextureView,
    /// Which texture holds the current output (false = A, true = B).
    pub current: bool,
}

impl PingPong {
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let tex_a = float_target(device, "ping", width, height);
        let tex_b = float_target(device, "pong", width, height);
        let view_a = tex_a.create_view(&Default::default());
        let view_b = tex_b.create_view(&Default::default());
        Self {
            tex_a,
            tex_b,
            view_a,
            view_b,
            current: false,
        }
    }

    pub fn read_view(&self) -> &TextureView {
        if self.current {
            &self.view_b
        } else {
            &self.view_a
        }
    }

    pub fn write_view(&self) -> &TextureView {
        if self.current {
            &self.view_a
        } else {
            &self.view_b
        }
    }

    /// Texture behind [`PingPong::read_view`].
    pub fn read_texture(&self) -> &wgpu::Texture {
        if self.current {
            &self.tex_b
        } else {
            &self.tex_a
        }
    }

    pub fn swap(&mut self) {
        self.current = !self.current;
    }
}

// ---------------------------------------------------------------------------
// CompositePass
// ---------------------------------------------------------------------------

pub struct CompositePass {
    pipeline: ComputePipeline,
    bind_group_layout: BindGroupLayout,
}

impl CompositePass {
    pub fn new(device: &Device) -> Self {
        let sampled = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        // binding 0 : CompositeUniforms
        // binding 1 : layer surface
        // binding 2 : backdrop (ping-pong read side)
        // binding 3 : output (ping-pong write side)
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite_bgl"),
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
                sampled(1),
                sampled(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
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
            label: Some("composite_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("composite"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/composite.wgsl").into()),
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("composite"),
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

    /// Blend `layer_view` onto the ping-pong read side, write the result to
    /// the write side, then swap so the result becomes the read side.
    #[allow(clippy::too_many_arguments)]
    pub fn dispatch(
        &self,
        device: &Device,
        encoder: &mut wgpu::CommandEncoder,
        queue: &Queue,
        uniform_buf: &Buffer,
        uniforms: &CompositeUniforms,
        layer_view: &TextureView,
        pp: &mut PingPong,
        width: u32,
        height: u32,
    ) {
        queue.write_buffer(uniform_buf, 0, bytemuck::bytes_of(uniforms));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(layer_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(pp.read_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(pp.write_view()),
                },
            ],
        });

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("composite_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(width.div_ceil(WORKGROUP), height.div_ceil(WORKGROUP), 1);
        }

        pp.swap();
    }
}
