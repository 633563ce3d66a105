#![allow(dead_code)]

use cgmath::{Matrix4, Point3, SquareMatrix};
use image::DynamicImage;
use scene_sandbox::{
    camera::{Camera, Light, Projection},
    config::SandboxConfig,
    data_structures::{
        drawable::{Drawable, DrawableKind},
        instance::DrawUniform,
        mesh::MeshData,
        scene_graph::SceneGraph,
    },
    frame::{FramePipeline, RenderTargets},
    pipelines::BUILTIN_SHADERS,
    registry::{Material, MaterialHandle, Registry},
    render::{
        Clear, DrawCall, FullscreenCall, MaterialTextures, MeshHandle, PassTarget, PostParams,
        ProgramHandle, RenderBackend, RenderTarget, TargetDesc, TargetHandle, TextureHandle,
    },
};

/// Everything a [`RecordingBackend`] was asked to do during a frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    BeginPass {
        label: String,
        target: PassTarget,
        clear: Clear,
    },
    DepthTest(bool),
    Draw {
        label: String,
        mesh: MeshHandle,
        program: ProgramHandle,
        textures: MaterialTextures,
        uniform: DrawUniform,
        depth_test: bool,
        instances: usize,
    },
    Fullscreen {
        label: String,
        program: ProgramHandle,
        inputs: [Option<TextureHandle>; 2],
        params: PostParams,
    },
    EndPass,
}

/// A [`RenderBackend`] that hands out sequential handles and records every frame command.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub commands: Vec<Command>,
    pub shaders: Vec<String>,
    pub meshes: Vec<MeshData>,
    pub textures: Vec<String>,
    pub targets: Vec<TargetDesc>,
    depth_test: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            depth_test: true,
            ..Default::default()
        }
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn program_named(&self, name: &str) -> ProgramHandle {
        ProgramHandle(
            self.shaders
                .iter()
                .position(|s| s == name)
                .unwrap_or_else(|| panic!("no shader named {}", name)),
        )
    }

    /// Labels of the passes in the order they were begun.
    pub fn pass_labels(&self) -> Vec<String> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::BeginPass { label, .. } => Some(label.clone()),
                _ => None,
            })
            .collect()
    }

    /// The commands between the `n`th `BeginPass` and its `EndPass`.
    pub fn pass(&self, n: usize) -> &[Command] {
        let starts: Vec<usize> = self
            .commands
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, Command::BeginPass { .. }))
            .map(|(i, _)| i)
            .collect();
        let start = starts[n];
        let end = self.commands[start..]
            .iter()
            .position(|c| *c == Command::EndPass)
            .map(|p| start + p)
            .expect("pass was never ended");
        &self.commands[start..=end]
    }

    pub fn draws(&self) -> Vec<&Command> {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::Draw { .. }))
            .collect()
    }

    pub fn fullscreen_draws(&self) -> Vec<&Command> {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::Fullscreen { .. }))
            .collect()
    }
}

impl RenderBackend for RecordingBackend {
    fn compile_shader(&mut self, name: &str, source: &str) -> anyhow::Result<ProgramHandle> {
        anyhow::ensure!(source.contains("fn vs_main"), "{} has no vertex entry point", name);
        self.shaders.push(name.to_string());
        Ok(ProgramHandle(self.shaders.len() - 1))
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle {
        self.meshes.push(mesh.clone());
        MeshHandle(self.meshes.len() - 1)
    }

    fn create_texture(&mut self, _image: &DynamicImage, label: &str) -> anyhow::Result<TextureHandle> {
        self.textures.push(label.to_string());
        Ok(TextureHandle(self.textures.len() - 1))
    }

    fn create_target(&mut self, desc: &TargetDesc) -> anyhow::Result<RenderTarget> {
        desc.validate(8192)?;
        let mut color = Vec::new();
        for idx in 0..desc.color.len() {
            self.textures.push(format!("{} colour {}", desc.label, idx));
            color.push(TextureHandle(self.textures.len() - 1));
        }
        let depth = if desc.depth {
            self.textures.push(format!("{} depth", desc.label));
            Some(TextureHandle(self.textures.len() - 1))
        } else {
            None
        };
        self.targets.push(desc.clone());
        Ok(RenderTarget {
            handle: TargetHandle(self.targets.len() - 1),
            size: desc.size,
            color,
            depth,
        })
    }

    fn begin_pass(&mut self, label: &str, target: PassTarget, clear: Clear) {
        self.commands.push(Command::BeginPass {
            label: label.to_string(),
            target,
            clear,
        });
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
        self.commands.push(Command::DepthTest(enabled));
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        self.commands.push(Command::Draw {
            label: call.label.to_string(),
            mesh: call.mesh,
            program: call.program,
            textures: call.textures,
            uniform: call.uniform,
            depth_test: self.depth_test,
            instances: call.instances.len(),
        });
    }

    fn draw_fullscreen(&mut self, call: &FullscreenCall<'_>) {
        self.commands.push(Command::Fullscreen {
            label: call.label.to_string(),
            program: call.program,
            inputs: call.inputs,
            params: call.params,
        });
    }

    fn end_pass(&mut self) {
        self.commands.push(Command::EndPass);
    }
}

pub fn test_camera() -> Camera {
    Camera::new(
        Point3::new(0.0, 0.0, -5.0),
        Point3::new(0.0, 0.0, 0.0),
        Projection::perspective(60.0, 800, 600, 0.01, 1000.0),
    )
}

pub fn test_light() -> Light {
    Light::new(
        Point3::new(-4.0, 2.0, 0.0),
        Point3::new(0.0, 0.0, 0.0),
        Projection::perspective(60.0, 1, 1, 1.0, 1000.0),
    )
}

pub fn empty_scene() -> SceneGraph {
    SceneGraph::new(test_camera(), test_light())
}

/// A small config so tests do not allocate full-size targets.
pub fn test_config() -> SandboxConfig {
    SandboxConfig {
        width: 64,
        height: 48,
        shadow_size: 32,
        asset_dir: "tests/does-not-exist".to_string(),
        ..Default::default()
    }
}

/// Built-in shaders, targets and the materials the pass sequence needs.
pub struct Fixture {
    pub backend: RecordingBackend,
    pub registry: Registry,
    pub pipeline: FramePipeline,
    pub white: MaterialHandle,
    pub lit: MaterialHandle,
    pub cube: MeshHandle,
}

pub fn fixture(config: &SandboxConfig) -> Fixture {
    let mut backend = RecordingBackend::new();
    let mut registry = Registry::new();
    for (name, source) in BUILTIN_SHADERS {
        let program = backend.compile_shader(name, source).unwrap();
        registry.register_shader(name, program).unwrap();
    }
    let targets = RenderTargets::create(
        &mut backend,
        [config.width, config.height],
        config.shadow_size,
    )
    .unwrap();
    let base = registry.shaders.lookup("base").unwrap();
    let depth = registry.shaders.lookup("Depth").unwrap();
    let lit_shader = registry.shaders.lookup("PhongShadowed").unwrap();
    let white = registry
        .register_material("white", Material::flat(base, [1.0; 4]))
        .unwrap();
    let lit = registry
        .register_material("litMaterial", Material::lit(lit_shader, targets.shadow_map()))
        .unwrap();
    registry
        .register_material("depthMaterial", Material::flat(depth, [1.0; 4]))
        .unwrap();
    let pipeline = FramePipeline::new(targets, &registry, config).unwrap();
    let cube = backend.upload_mesh(&scene_sandbox::data_structures::primitives::cube());
    Fixture {
        backend,
        registry,
        pipeline,
        white,
        lit,
        cube,
    }
}

pub fn cube(mesh: MeshHandle, material: MaterialHandle) -> Drawable {
    Drawable::new(DrawableKind::Cube(mesh), material)
}

pub fn translation(x: f32, y: f32, z: f32) -> Matrix4<f32> {
    Matrix4::from_translation(cgmath::Vector3::new(x, y, z))
}

pub fn identity() -> Matrix4<f32> {
    Matrix4::identity()
}

/// Compares matrices element-wise with a small tolerance.
pub fn assert_matrix_eq(actual: Matrix4<f32>, expected: Matrix4<f32>) {
    let a: [[f32; 4]; 4] = actual.into();
    let e: [[f32; 4]; 4] = expected.into();
    for c in 0..4 {
        for r in 0..4 {
            assert!(
                (a[c][r] - e[c][r]).abs() < 1e-4,
                "matrices differ at column {} row {}: {:?} != {:?}",
                c,
                r,
                a,
                e
            );
        }
    }
}
