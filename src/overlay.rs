//! Keyboard-driven debug overlay.
//!
//! | key        | effect                                  |
//! |------------|-----------------------------------------|
//! | `H`        | toggle HDR                              |
//! | `B`        | toggle bloom                            |
//! | `Up`/`Down`| raise/lower the exposure of the active mode |
//! | `P`        | pause or resume the particle systems    |
//! | `Esc`      | quit                                    |
//!
//! The current state is shown as a row of coloured quads in the top left
//! corner: HDR, bloom, particles, and a bar whose length is the exposure.

use winit::keyboard::KeyCode;

use crate::{
    config::PostProcessSettings,
    data_structures::{
        instance::{DrawUniform, InstanceRaw},
        primitives,
    },
    frame::Overlay,
    registry::{Registry, RegistryError},
    render::{DrawCall, MaterialTextures, MeshHandle, ProgramHandle, RenderBackend},
};

const ON: [f32; 4] = [0.2, 0.85, 0.3, 0.85];
const OFF: [f32; 4] = [0.85, 0.2, 0.2, 0.85];
const EXPOSURE: [f32; 4] = [0.95, 0.8, 0.2, 0.85];

/// What the application should do after a key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayCommand {
    None,
    PauseParticles(bool),
    Quit,
}

#[derive(Debug)]
pub struct DebugOverlay {
    quad: MeshHandle,
    program: ProgramHandle,
    particles_paused: bool,
    /// Exposure change per key press.
    pub exposure_step: f32,
}

impl DebugOverlay {
    pub fn new(backend: &mut dyn RenderBackend, registry: &Registry) -> Result<Self, RegistryError> {
        let shader = registry.shaders.lookup("Overlay")?;
        let program = registry.shaders.get(shader)?.program;
        Ok(Self {
            quad: backend.upload_mesh(&primitives::quad()),
            program,
            particles_paused: false,
            exposure_step: 0.1,
        })
    }

    pub fn particles_paused(&self) -> bool {
        self.particles_paused
    }

    pub fn handle_key(&mut self, key: KeyCode, settings: &mut PostProcessSettings) -> OverlayCommand {
        match key {
            KeyCode::KeyH => {
                settings.hdr = !settings.hdr;
                log::info!("hdr {}", if settings.hdr { "on" } else { "off" });
            }
            KeyCode::KeyB => {
                settings.bloom = !settings.bloom;
                log::info!("bloom {}", if settings.bloom { "on" } else { "off" });
            }
            KeyCode::ArrowUp => settings.adjust_exposure(self.exposure_step),
            KeyCode::ArrowDown => settings.adjust_exposure(-self.exposure_step),
            KeyCode::KeyP => {
                self.particles_paused = !self.particles_paused;
                return OverlayCommand::PauseParticles(self.particles_paused);
            }
            KeyCode::Escape => return OverlayCommand::Quit,
            _ => (),
        }
        OverlayCommand::None
    }

    fn indicator(
        &self,
        backend: &mut dyn RenderBackend,
        slot: usize,
        width: f32,
        color: [f32; 4],
    ) {
        // quads are 0.05 NDC high, stacked from the top left corner
        let height = 0.05;
        let x = -0.95 + width / 2.0;
        let y = 0.95 - height / 2.0 - slot as f32 * (height + 0.02);
        let model = cgmath::Matrix4::from_translation(cgmath::Vector3::new(x, y, 0.0))
            * cgmath::Matrix4::from_nonuniform_scale(width, height, 1.0);
        backend.draw(&DrawCall {
            label: "overlay",
            mesh: self.quad,
            program: self.program,
            textures: MaterialTextures::default(),
            uniform: DrawUniform::identity().with_model(model).with_color(color),
            instances: &[InstanceRaw::IDENTITY],
        });
    }
}

impl Overlay for DebugOverlay {
    fn draw(&self, backend: &mut dyn RenderBackend, settings: &PostProcessSettings) -> usize {
        let flag = |on: bool| if on { ON } else { OFF };
        self.indicator(backend, 0, 0.05, flag(settings.hdr));
        self.indicator(backend, 1, 0.05, flag(settings.bloom));
        self.indicator(backend, 2, 0.05, flag(!self.particles_paused));
        let exposure = if settings.bloom {
            settings.bloom_exposure
        } else {
            settings.hdr_exposure
        };
        self.indicator(backend, 3, (exposure * 0.1).clamp(0.01, 1.8), EXPOSURE);
        4
    }
}
