//! Application event loop.
//!
//! Each frame follows the same pattern:
//! 1. Collect window events (resize, keys, dropped files)
//! 2. Advance the scene clock and particles, animate the demo nodes and light
//! 3. Apply the files dropped since the last frame
//! 4. Record the pass sequence through the backend
//! 5. Encode, submit and present

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use instant::Instant;
use tokio::runtime::Runtime;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::Window,
};

use crate::{
    backend::WgpuBackend,
    config::{PostProcessSettings, SandboxConfig},
    context::Context,
    demo::{self, DemoScene},
    dropped_files::{self, DropPlan},
    overlay::{DebugOverlay, OverlayCommand},
};

/// Everything that exists once the window is up.
#[derive(Debug)]
struct Session {
    ctx: Context,
    backend: WgpuBackend,
    demo: DemoScene,
    overlay: DebugOverlay,
}

impl Session {
    fn new(async_runtime: &Runtime, window: Arc<Window>, config: &SandboxConfig) -> anyhow::Result<Self> {
        let mut ctx = async_runtime.block_on(Context::new(window))?;
        let [width, height] = ctx.size();
        ctx.resize(width, height);

        let mut backend = WgpuBackend::new(ctx.device.clone(), ctx.queue.clone(), ctx.config.format);
        // targets are sized to the window once and kept for the whole run
        let mut config = config.clone();
        config.width = width;
        config.height = height;
        let demo = async_runtime.block_on(demo::build_scene(&mut backend, &config))?;
        let overlay = DebugOverlay::new(&mut backend, &demo.registry)?;
        Ok(Self {
            ctx,
            backend,
            demo,
            overlay,
        })
    }

    fn update(&mut self, async_runtime: &Runtime, dt: f32, dropped: Vec<PathBuf>) {
        self.demo.scene.update(dt);
        if let Err(e) = self.demo.animate() {
            log::error!("animation failed: {}", e);
        }
        if dropped.is_empty() {
            return;
        }
        let plan = DropPlan::from_paths(&dropped);
        let DemoScene {
            scene, registry, ..
        } = &mut self.demo;
        if let Err(e) = async_runtime.block_on(dropped_files::apply(
            &plan,
            scene,
            registry,
            &mut self.backend,
        )) {
            log::error!("could not load the dropped files: {:#}", e);
        }
    }

    fn render(&mut self, settings: &PostProcessSettings) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.ctx.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.backend.begin_frame();
        if let Err(e) = self.demo.pipeline.render_frame(
            &self.demo.scene,
            &mut self.backend,
            &self.demo.registry,
            settings,
            &self.overlay,
        ) {
            log::error!("Unable to render {}", e);
        }
        self.backend.end_frame(&view);
        output.present();
        Ok(())
    }
}

pub struct App {
    async_runtime: Runtime,
    config: SandboxConfig,
    settings: PostProcessSettings,
    session: Option<Session>,
    // paths from DroppedFile events, applied on the next redraw
    dropped: Vec<PathBuf>,
    last_time: Instant,
}

impl App {
    pub fn new(config: SandboxConfig) -> anyhow::Result<Self> {
        let async_runtime = Runtime::new().context("could not start the async runtime")?;
        Ok(Self {
            async_runtime,
            settings: config.post,
            config,
            session: None,
            dropped: Vec::new(),
            last_time: Instant::now(),
        })
    }

    pub fn settings(&self) -> &PostProcessSettings {
        &self.settings
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let (Some(session), PhysicalKey::Code(code)) = (&mut self.session, event.physical_key) else {
            return;
        };
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        match session.overlay.handle_key(code, &mut self.settings) {
            OverlayCommand::PauseParticles(paused) => session.demo.scene.set_particles_paused(paused),
            OverlayCommand::Quit => event_loop.exit(),
            OverlayCommand::None => (),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("could not create the window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match Session::new(&self.async_runtime, window, &self.config) {
            Ok(session) => {
                session.ctx.window.request_redraw();
                self.session = Some(session);
                self.last_time = Instant::now();
            }
            Err(e) => {
                log::error!("App initialization failed: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(session) = &mut self.session {
                    // only the aspect ratio follows the window, the offscreen targets keep their size
                    if session.ctx.resize(size.width, size.height) {
                        session
                            .demo
                            .scene
                            .camera
                            .projection
                            .resize(size.width, size.height);
                    }
                }
            }
            WindowEvent::DroppedFile(path) => {
                log::debug!("dropped {}", path.display());
                self.dropped.push(path);
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::RedrawRequested => {
                let Some(session) = &mut self.session else {
                    return;
                };
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                let dropped = std::mem::take(&mut self.dropped);
                session.update(&self.async_runtime, dt.as_secs_f32(), dropped);

                match session.render(&self.settings) {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = session.ctx.window.inner_size();
                        session.ctx.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Opens the window and runs the sandbox until it is closed.
pub fn run(config: SandboxConfig) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config)?;
    event_loop.run_app(&mut app)?;
    Ok(())
}
