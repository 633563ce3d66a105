use std::num::NonZeroU64;

use crate::data_structures::{
    instance::{DrawUniform, InstanceRaw},
    mesh::{Vertex, VertexLayout},
    texture::Texture,
};

/// Group 0: the per-draw uniform block, addressed with a dynamic offset.
pub fn uniform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(DrawUniform::SIZE),
            },
            count: None,
        }],
        label: Some("draw_uniform_bind_group_layout"),
    })
}

fn colour_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn sampler_entry(binding: u32, ty: wgpu::SamplerBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(ty),
        count: None,
    }
}

/// Group 1: base texture, second texture and shadow map, each with its sampler.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            colour_texture_entry(0),
            sampler_entry(1, wgpu::SamplerBindingType::Filtering),
            colour_texture_entry(2),
            sampler_entry(3, wgpu::SamplerBindingType::Filtering),
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            sampler_entry(5, wgpu::SamplerBindingType::Comparison),
        ],
        label: Some("material_bind_group_layout"),
    })
}

/// The attachments a pipeline renders into.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PipelineTarget {
    pub colors: Vec<wgpu::TextureFormat>,
    pub depth: bool,
    /// Alpha blending; used for the window surface so the overlay can be translucent.
    pub blend: bool,
}

/**
 * Creates a pipeline for one shader against one attachment layout.
 *
 * Targets without colour attachments get no fragment stage, two colour
 * attachments use the `fs_hdr` entry point that splits off bright pixels.
 */
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    target: &PipelineTarget,
    depth_test: bool,
    label: &str,
) -> wgpu::RenderPipeline {
    let blend = if target.blend {
        wgpu::BlendState::ALPHA_BLENDING
    } else {
        wgpu::BlendState::REPLACE
    };
    let color_targets: Vec<Option<wgpu::ColorTargetState>> = target
        .colors
        .iter()
        .map(|format| {
            Some(wgpu::ColorTargetState {
                format: *format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })
        })
        .collect();
    let fragment_entry = if target.colors.len() > 1 {
        "fs_hdr"
    } else {
        "fs_main"
    };
    let depth_only = target.colors.is_empty();

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex::desc(), InstanceRaw::desc()],
            compilation_options: Default::default(),
        },
        fragment: if depth_only {
            None
        } else {
            Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some(fragment_entry),
                targets: &color_targets,
                compilation_options: Default::default(),
            })
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Quads and the skybox are seen from both sides
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: target.depth.then(|| wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: depth_test,
            depth_compare: if depth_test {
                wgpu::CompareFunction::Less
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            // Shadow acne
            bias: if depth_only {
                wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                }
            } else {
                wgpu::DepthBiasState::default()
            },
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}
