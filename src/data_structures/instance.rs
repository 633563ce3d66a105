//! Per-draw and per-instance data as laid out on the GPU.
//!
//! [`DrawUniform`] is written once per draw into a dynamic uniform buffer,
//! [`InstanceRaw`] is streamed through the second vertex buffer slot so that
//! particle systems can render all of their cubes with a single draw.

use cgmath::{Matrix, One, SquareMatrix};

use crate::{data_structures::mesh, render::PostParams};

/// Position, rotation (as quaternion) and scale of one instance.
#[derive(Clone, Debug)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw::from_matrix(self.to_matrix())
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl InstanceRaw {
    pub const IDENTITY: InstanceRaw = InstanceRaw {
        model: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn from_matrix(model: cgmath::Matrix4<f32>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

/**
 * Stride layout: a 4x4 matrix split into four vec4 attributes, advancing once per instance.
 */
impl mesh::VertexLayout for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // Shaders only move on to the next matrix when a new instance starts
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Uniform block shared by every shader (see `common.wgsl`).
///
/// `params` = (lit, has base texture, time, has shadow map);
/// `post` = (exposure, enabled, horizontal, unused).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub light_pos: [f32; 4],
    pub color: [f32; 4],
    pub params: [f32; 4],
    pub post: [f32; 4],
}

impl DrawUniform {
    pub const SIZE: u64 = std::mem::size_of::<DrawUniform>() as u64;

    pub fn identity() -> Self {
        let id: [[f32; 4]; 4] = cgmath::Matrix4::<f32>::identity().into();
        Self {
            model: id,
            view: id,
            proj: id,
            light_view_proj: id,
            normal: id,
            camera_pos: [0.0, 0.0, 0.0, 1.0],
            light_pos: [0.0, 0.0, 0.0, 1.0],
            color: [1.0; 4],
            params: [0.0; 4],
            post: [0.0; 4],
        }
    }

    /// Sets the model matrix along with the inverse-transpose used for normals.
    pub fn with_model(mut self, model: cgmath::Matrix4<f32>) -> Self {
        self.model = model.into();
        self.normal = model
            .invert()
            .map(|inv| inv.transpose())
            .unwrap_or_else(cgmath::Matrix4::identity)
            .into();
        self
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn for_post(params: &PostParams) -> Self {
        let mut uniform = Self::identity();
        uniform.post = [
            params.exposure,
            if params.enabled { 1.0 } else { 0.0 },
            if params.horizontal { 1.0 } else { 0.0 },
            0.0,
        ];
        uniform
    }

    pub fn model_matrix(&self) -> cgmath::Matrix4<f32> {
        self.model.into()
    }
}
