//! The per-frame pass sequence.
//!
//! Every frame runs the same fixed order of passes:
//!
//! 1. shadow: scene depth from the light into the shadow map
//! 2. colour: skybox and scene from the camera into the offscreen or HDR target
//! 3. post: blit, tone map, or blur and bloom composite onto the screen
//! 4. overlay: debug indicators on top of everything
//!
//! Passes only communicate through the textures of the [`RenderTargets`].

use cgmath::SquareMatrix;

use crate::{
    config::{PostProcessSettings, SandboxConfig},
    data_structures::{
        drawable::Drawable,
        scene_graph::{RenderOptions, SceneError, SceneGraph},
    },
    registry::{MaterialHandle, Registry, RegistryError},
    render::{
        Clear, ColorFormat, FullscreenCall, PassTarget, PostParams, ProgramHandle, RenderBackend,
        RenderTarget, TargetDesc, TextureHandle,
    },
};

/// All offscreen framebuffers. Sized once at start-up.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderTargets {
    pub shadow: RenderTarget,
    pub offscreen: RenderTarget,
    /// Colour 0 is the scene, colour 1 the bright pass.
    pub hdr: RenderTarget,
    pub ping_pong: [RenderTarget; 2],
}

impl RenderTargets {
    pub fn create(
        backend: &mut dyn RenderBackend,
        size: [u32; 2],
        shadow_size: u32,
    ) -> anyhow::Result<Self> {
        let shadow = backend.create_target(
            &TargetDesc::new("shadow map", [shadow_size, shadow_size]).with_depth(),
        )?;
        let offscreen = backend.create_target(
            &TargetDesc::new("offscreen", size)
                .with_color(ColorFormat::Rgba8)
                .with_depth(),
        )?;
        let hdr = backend.create_target(
            &TargetDesc::new("hdr", size)
                .with_color(ColorFormat::Rgba16Float)
                .with_color(ColorFormat::Rgba16Float)
                .with_depth(),
        )?;
        let ping = backend
            .create_target(&TargetDesc::new("ping", size).with_color(ColorFormat::Rgba16Float))?;
        let pong = backend
            .create_target(&TargetDesc::new("pong", size).with_color(ColorFormat::Rgba16Float))?;
        Ok(Self {
            shadow,
            offscreen,
            hdr,
            ping_pong: [ping, pong],
        })
    }

    /// The depth texture lit materials sample.
    pub fn shadow_map(&self) -> Option<TextureHandle> {
        self.shadow.depth
    }
}

/// Something drawn on top of the finished frame.
pub trait Overlay {
    /// Issues the overlay draws into the current pass and returns how many there were.
    fn draw(&self, backend: &mut dyn RenderBackend, settings: &PostProcessSettings) -> usize;
}

/// An overlay that draws nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOverlay;

impl Overlay for NoOverlay {
    fn draw(&self, _backend: &mut dyn RenderBackend, _settings: &PostProcessSettings) -> usize {
        0
    }
}

/// What one frame did, per pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub passes: usize,
    pub shadow_draws: usize,
    pub skybox_draws: usize,
    pub color_draws: usize,
    pub blur_draws: usize,
    pub composite_draws: usize,
    pub overlay_draws: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct PostPrograms {
    blit: ProgramHandle,
    hdr: ProgramHandle,
    blur: ProgramHandle,
    bloom: ProgramHandle,
}

#[derive(Debug)]
pub struct FramePipeline {
    pub targets: RenderTargets,
    depth_material: MaterialHandle,
    post: PostPrograms,
    skybox: Option<Drawable>,
    blur_iterations: u32,
    clear_colour: [f64; 4],
}

impl FramePipeline {
    /// Resolves the post-processing shaders and the shadow material by name.
    pub fn new(
        targets: RenderTargets,
        registry: &Registry,
        config: &SandboxConfig,
    ) -> Result<Self, RegistryError> {
        let program = |name: &str| -> Result<ProgramHandle, RegistryError> {
            let handle = registry.shaders.lookup(name)?;
            Ok(registry.shaders.get(handle)?.program)
        };
        let post = PostPrograms {
            blit: program("PostProcessing")?,
            hdr: program("Hdr")?,
            blur: program("Blur")?,
            bloom: program("Bloom")?,
        };
        Ok(Self {
            targets,
            depth_material: registry.materials.lookup("depthMaterial")?,
            post,
            skybox: None,
            blur_iterations: config.blur_iterations,
            clear_colour: config.clear_colour,
        })
    }

    /// The skybox is drawn separately from the scene, before it and without depth testing.
    pub fn set_skybox(&mut self, skybox: Drawable) {
        self.skybox = Some(skybox);
    }

    pub fn skybox(&self) -> Option<&Drawable> {
        self.skybox.as_ref()
    }

    pub fn render_frame(
        &self,
        scene: &SceneGraph,
        backend: &mut dyn RenderBackend,
        registry: &Registry,
        settings: &PostProcessSettings,
        overlay: &dyn Overlay,
    ) -> Result<FrameStats, SceneError> {
        let mut stats = FrameStats::default();

        // 1. shadow map from the light
        backend.begin_pass(
            "shadow",
            PassTarget::Texture(self.targets.shadow.handle),
            Clear::depth_only(),
        );
        backend.set_depth_test(true);
        stats.shadow_draws = scene.render_from(
            &scene.light,
            backend,
            registry,
            &RenderOptions {
                material_override: Some(self.depth_material),
            },
        )?;
        backend.end_pass();
        stats.passes += 1;

        // 2. colour
        let color_target = if settings.uses_hdr_target() {
            &self.targets.hdr
        } else {
            &self.targets.offscreen
        };
        backend.begin_pass(
            "color",
            PassTarget::Texture(color_target.handle),
            Clear::all(self.clear_colour),
        );
        if let Some(skybox) = &self.skybox {
            backend.set_depth_test(false);
            let mut frame = scene.frame_view(&scene.camera);
            frame.view = scene.camera.rotation_only_view();
            let material = registry.material(skybox.material)?;
            let shader = registry.shader_of(material)?;
            stats.skybox_draws =
                skybox.draw(cgmath::Matrix4::identity(), &frame, material, shader, backend);
        }
        backend.set_depth_test(true);
        stats.color_draws =
            scene.render_from(&scene.camera, backend, registry, &RenderOptions::default())?;
        backend.end_pass();
        stats.passes += 1;

        // 3. post-processing onto the screen
        if settings.bloom {
            stats.blur_draws = self.blur(backend);
            stats.passes += stats.blur_draws;
            let last_blurred = if self.blur_iterations == 0 {
                self.targets.hdr.color(1)
            } else {
                // the last iteration wrote ping_pong[(iterations - 1) % 2]
                self.targets.ping_pong[((self.blur_iterations - 1) % 2) as usize].color(0)
            };
            self.composite(
                backend,
                self.post.bloom,
                "bloom",
                [self.targets.hdr.color(0), last_blurred],
                settings.bloom_exposure,
            );
        } else if settings.hdr {
            self.composite(
                backend,
                self.post.hdr,
                "hdr",
                [self.targets.hdr.color(0), None],
                settings.hdr_exposure,
            );
        } else {
            backend.begin_pass("post", PassTarget::Screen, Clear::color(self.clear_colour));
            backend.draw_fullscreen(&FullscreenCall {
                label: "blit",
                program: self.post.blit,
                inputs: [self.targets.offscreen.color(0), None],
                params: PostParams::default(),
            });
            backend.end_pass();
        }
        stats.composite_draws = 1;
        stats.passes += 1;

        // 4. overlay, always last
        backend.begin_pass("overlay", PassTarget::Screen, Clear::none());
        backend.set_depth_test(false);
        stats.overlay_draws = overlay.draw(backend, settings);
        backend.end_pass();
        stats.passes += 1;

        log::trace!("frame: {:?}", stats);
        Ok(stats)
    }

    /**
     * Ping-pong gaussian blur of the bright pass.
     *
     * Starting horizontally, iteration `i` writes `ping_pong[i % 2]`. The
     * first iteration reads the bright buffer, every later one reads the
     * buffer the previous iteration wrote.
     */
    fn blur(&self, backend: &mut dyn RenderBackend) -> usize {
        let mut horizontal = true;
        let mut input = self.targets.hdr.color(1);
        for _ in 0..self.blur_iterations {
            let target = &self.targets.ping_pong[if horizontal { 0 } else { 1 }];
            backend.begin_pass("blur", PassTarget::Texture(target.handle), Clear::none());
            backend.draw_fullscreen(&FullscreenCall {
                label: "blur",
                program: self.post.blur,
                inputs: [input, None],
                params: PostParams {
                    exposure: 1.0,
                    enabled: true,
                    horizontal,
                },
            });
            backend.end_pass();
            input = target.color(0);
            horizontal = !horizontal;
        }
        self.blur_iterations as usize
    }

    fn composite(
        &self,
        backend: &mut dyn RenderBackend,
        program: ProgramHandle,
        label: &str,
        inputs: [Option<TextureHandle>; 2],
        exposure: f32,
    ) {
        backend.begin_pass(label, PassTarget::Screen, Clear::color(self.clear_colour));
        backend.draw_fullscreen(&FullscreenCall {
            label,
            program,
            inputs,
            params: PostParams {
                exposure,
                enabled: true,
                horizontal: false,
            },
        });
        backend.end_pass();
    }
}
