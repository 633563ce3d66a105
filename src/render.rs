//! The render backend seam.
//!
//! Everything the scene graph and the pass sequencer need from the GPU goes
//! through [`RenderBackend`]. Resources are created once during setup and
//! handed back as small copyable handles; per-frame work is expressed as a
//! sequence of passes, each holding draws against one [`PassTarget`].
//!
//! # Key types
//!
//! - [`RenderBackend`] is the trait implemented by [`crate::backend::WgpuBackend`]
//! - [`DrawCall`] is a single mesh draw with its uniforms and material textures
//! - [`FullscreenCall`] is a post-processing quad covering the whole target
//! - [`TargetDesc`] / [`RenderTarget`] describe and identify framebuffers
//!

use image::DynamicImage;

use crate::data_structures::{
    instance::{DrawUniform, InstanceRaw},
    mesh::MeshData,
};

/// Compiled shader program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub usize);

/// Uploaded vertex and index buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub usize);

/// Sampled texture, either loaded from an image or owned by a render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub usize);

/// Framebuffer created by [`RenderBackend::create_target`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetHandle(pub usize);

/// Colour attachment formats a target may use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorFormat {
    Rgba8,
    Rgba16Float,
}

/// Description of a framebuffer with fixed resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetDesc {
    pub label: String,
    pub size: [u32; 2],
    pub color: Vec<ColorFormat>,
    pub depth: bool,
}

impl TargetDesc {
    pub fn new(label: &str, size: [u32; 2]) -> Self {
        Self {
            label: label.to_string(),
            size,
            color: Vec::new(),
            depth: false,
        }
    }

    pub fn with_color(mut self, format: ColorFormat) -> Self {
        self.color.push(format);
        self
    }

    pub fn with_depth(mut self) -> Self {
        self.depth = true;
        self
    }

    /// Checks that the attachments form a usable framebuffer.
    pub fn validate(&self, max_dimension: u32) -> anyhow::Result<()> {
        let [width, height] = self.size;
        if width == 0 || height == 0 {
            anyhow::bail!("render target '{}' has an empty size {}x{}", self.label, width, height);
        }
        if width > max_dimension || height > max_dimension {
            anyhow::bail!(
                "render target '{}' is {}x{} but the device allows at most {}",
                self.label,
                width,
                height,
                max_dimension
            );
        }
        if self.color.is_empty() && !self.depth {
            anyhow::bail!("render target '{}' has no attachments", self.label);
        }
        if self.color.len() > MAX_COLOR_ATTACHMENTS {
            anyhow::bail!(
                "render target '{}' requests {} colour attachments, at most {} are supported",
                self.label,
                self.color.len(),
                MAX_COLOR_ATTACHMENTS
            );
        }
        Ok(())
    }
}

pub const MAX_COLOR_ATTACHMENTS: usize = 4;

/// A created framebuffer and the textures its attachments write into.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderTarget {
    pub handle: TargetHandle,
    pub size: [u32; 2],
    pub color: Vec<TextureHandle>,
    pub depth: Option<TextureHandle>,
}

impl RenderTarget {
    pub fn color(&self, idx: usize) -> Option<TextureHandle> {
        self.color.get(idx).copied()
    }
}

/// Where a pass writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassTarget {
    /// The window surface (default framebuffer).
    Screen,
    Texture(TargetHandle),
}

/// Which attachments are cleared when a pass begins; everything else is loaded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Clear {
    pub color: Option<[f64; 4]>,
    pub depth: bool,
}

impl Clear {
    pub fn all(colour: [f64; 4]) -> Self {
        Self {
            color: Some(colour),
            depth: true,
        }
    }

    pub fn color(colour: [f64; 4]) -> Self {
        Self {
            color: Some(colour),
            depth: false,
        }
    }

    pub fn depth_only() -> Self {
        Self {
            color: None,
            depth: true,
        }
    }

    pub fn none() -> Self {
        Self {
            color: None,
            depth: false,
        }
    }
}

/// Textures bound alongside a draw. Missing slots are filled with neutral defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MaterialTextures {
    pub base: Option<TextureHandle>,
    pub second: Option<TextureHandle>,
    pub shadow: Option<TextureHandle>,
}

/// One mesh draw.
///
/// `instances` holds at least one model matrix; regular drawables pass
/// [`InstanceRaw::IDENTITY`], particle systems pass one entry per particle.
#[derive(Clone, Debug)]
pub struct DrawCall<'a> {
    pub label: &'a str,
    pub mesh: MeshHandle,
    pub program: ProgramHandle,
    pub textures: MaterialTextures,
    pub uniform: DrawUniform,
    pub instances: &'a [InstanceRaw],
}

/// Parameters of the post-processing shaders.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PostParams {
    pub exposure: f32,
    pub enabled: bool,
    pub horizontal: bool,
}

/// A full-screen quad sampling up to two input textures.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FullscreenCall<'a> {
    pub label: &'a str,
    pub program: ProgramHandle,
    pub inputs: [Option<TextureHandle>; 2],
    pub params: PostParams,
}

/// GPU services used by the scene graph and the pass sequencer.
///
/// Resource creation may happen at any time outside a pass. The frame
/// commands must follow `begin_pass`, draws, `end_pass`; passes execute in
/// the order they were begun.
pub trait RenderBackend {
    /// Compiles a WGSL module that exposes `vs_main` and, for colour passes, `fs_main`/`fs_hdr`.
    fn compile_shader(&mut self, name: &str, source: &str) -> anyhow::Result<ProgramHandle>;

    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle;

    fn create_texture(&mut self, image: &DynamicImage, label: &str) -> anyhow::Result<TextureHandle>;

    /// Creates a framebuffer; incomplete descriptions are rejected here instead of at draw time.
    fn create_target(&mut self, desc: &TargetDesc) -> anyhow::Result<RenderTarget>;

    fn begin_pass(&mut self, label: &str, target: PassTarget, clear: Clear);

    fn set_depth_test(&mut self, enabled: bool);

    fn draw(&mut self, call: &DrawCall<'_>);

    fn draw_fullscreen(&mut self, call: &FullscreenCall<'_>);

    fn end_pass(&mut self);
}
