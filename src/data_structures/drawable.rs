//! Renderable shapes attached to scene graph nodes.

use cgmath::SquareMatrix;

use crate::{
    data_structures::{
        instance::{DrawUniform, InstanceRaw},
        particles::ParticleSystem,
    },
    registry::{Material, MaterialHandle, Shader, Shading},
    render::{DrawCall, MeshHandle, RenderBackend},
};

/// The shape a [`Drawable`] renders, along with its uploaded geometry.
#[derive(Clone, Debug)]
pub enum DrawableKind {
    Cube(MeshHandle),
    Sphere(MeshHandle),
    Quad(MeshHandle),
    Torus(MeshHandle),
    /// An imported file; one mesh per object in the file.
    Mesh {
        path: String,
        meshes: Vec<MeshHandle>,
    },
    Particles {
        system: ParticleSystem,
        mesh: MeshHandle,
    },
    Skybox(MeshHandle),
}

impl DrawableKind {
    pub fn label(&self) -> &'static str {
        match self {
            DrawableKind::Cube(_) => "cube",
            DrawableKind::Sphere(_) => "sphere",
            DrawableKind::Quad(_) => "quad",
            DrawableKind::Torus(_) => "torus",
            DrawableKind::Mesh { .. } => "mesh",
            DrawableKind::Particles { .. } => "particles",
            DrawableKind::Skybox(_) => "skybox",
        }
    }
}

/// Per-pass values shared by every draw of one traversal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameView {
    pub view: cgmath::Matrix4<f32>,
    pub proj: cgmath::Matrix4<f32>,
    pub camera_pos: cgmath::Point3<f32>,
    pub light_pos: cgmath::Point3<f32>,
    pub light_view_proj: cgmath::Matrix4<f32>,
    /// Scene time in seconds.
    pub time: f32,
}

impl FrameView {
    fn uniform(&self, model: cgmath::Matrix4<f32>, material: &Material) -> DrawUniform {
        let mut uniform = DrawUniform::identity().with_model(model);
        uniform.view = self.view.into();
        uniform.proj = self.proj.into();
        uniform.light_view_proj = self.light_view_proj.into();
        uniform.camera_pos = self.camera_pos.to_homogeneous().into();
        uniform.light_pos = self.light_pos.to_homogeneous().into();
        uniform.color = material.color();
        let textures = material.textures();
        uniform.params = [
            if material.shading == Shading::Lit { 1.0 } else { 0.0 },
            if textures.base.is_some() { 1.0 } else { 0.0 },
            self.time,
            if textures.shadow.is_some() { 1.0 } else { 0.0 },
        ];
        uniform
    }
}

#[derive(Clone, Debug)]
pub struct Drawable {
    pub kind: DrawableKind,
    pub material: MaterialHandle,
    /// Applied after the node's world transform.
    pub model: cgmath::Matrix4<f32>,
    pub name: String,
}

impl Drawable {
    pub fn new(kind: DrawableKind, material: MaterialHandle) -> Self {
        let name = kind.label().to_string();
        Self {
            kind,
            material,
            model: cgmath::Matrix4::identity(),
            name,
        }
    }

    pub fn with_model(mut self, model: cgmath::Matrix4<f32>) -> Self {
        self.model = model;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn particles(&self) -> Option<&ParticleSystem> {
        match &self.kind {
            DrawableKind::Particles { system, .. } => Some(system),
            _ => None,
        }
    }

    pub fn particles_mut(&mut self) -> Option<&mut ParticleSystem> {
        match &mut self.kind {
            DrawableKind::Particles { system, .. } => Some(system),
            _ => None,
        }
    }

    /// Submits this drawable with the given world transform and returns the number of draws issued.
    pub fn draw(
        &self,
        world: cgmath::Matrix4<f32>,
        frame: &FrameView,
        material: &Material,
        shader: &Shader,
        backend: &mut dyn RenderBackend,
    ) -> usize {
        let model = world * self.model;
        let uniform = frame.uniform(model, material);
        let single = [InstanceRaw::IDENTITY];
        let mut call = DrawCall {
            label: &self.name,
            mesh: MeshHandle(0),
            program: shader.program,
            textures: material.textures(),
            uniform,
            instances: &single,
        };
        match &self.kind {
            DrawableKind::Cube(mesh)
            | DrawableKind::Sphere(mesh)
            | DrawableKind::Quad(mesh)
            | DrawableKind::Torus(mesh)
            | DrawableKind::Skybox(mesh) => {
                call.mesh = *mesh;
                backend.draw(&call);
                1
            }
            DrawableKind::Mesh { meshes, .. } => {
                for mesh in meshes {
                    call.mesh = *mesh;
                    backend.draw(&call);
                }
                meshes.len()
            }
            DrawableKind::Particles { system, mesh } => {
                let instances = system.instances();
                if instances.is_empty() {
                    return 0;
                }
                call.mesh = *mesh;
                call.instances = &instances;
                backend.draw(&call);
                1
            }
        }
    }
}
