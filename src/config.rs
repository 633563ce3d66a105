//! Start-up configuration and the runtime post-processing toggles.

use cgmath::Point3;

use crate::camera::{Camera, Light, Projection};

/// Everything fixed at start-up. Adjust the fields before calling [`crate::flow::run`].
#[derive(Clone, Debug, PartialEq)]
pub struct SandboxConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Edge length of the square shadow map.
    pub shadow_size: u32,
    /// Number of ping-pong blur draws per frame when bloom is on.
    pub blur_iterations: u32,
    pub clear_colour: [f64; 4],
    /// Directory (relative to the working directory) that textures and meshes load from.
    pub asset_dir: String,
    pub camera_position: Point3<f32>,
    pub camera_target: Point3<f32>,
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    pub light_position: Point3<f32>,
    pub post: PostProcessSettings,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            title: "scene sandbox".to_string(),
            width: 1280,
            height: 720,
            shadow_size: 1024,
            blur_iterations: 10,
            clear_colour: [0.2, 0.3, 0.3, 1.0],
            asset_dir: "assets".to_string(),
            camera_position: Point3::new(0.0, 0.0, -5.0),
            camera_target: Point3::new(0.0, 0.0, 0.0),
            fovy: 60.0,
            znear: 0.01,
            zfar: 1000.0,
            light_position: Point3::new(-4.0, 2.0, 0.0),
            post: PostProcessSettings::default(),
        }
    }
}

impl SandboxConfig {
    pub fn camera(&self) -> Camera {
        Camera::new(
            self.camera_position,
            self.camera_target,
            Projection::perspective(self.fovy, self.width, self.height, self.znear, self.zfar),
        )
    }

    /// The light uses a square perspective frustum so the shadow map fills its texture.
    pub fn light(&self) -> Light {
        Light::new(
            self.light_position,
            Point3::new(0.0, 0.0, 0.0),
            Projection::perspective(60.0, 1, 1, 1.0, 1000.0),
        )
    }
}

/// Post-processing toggles, read once per frame and changed from the overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PostProcessSettings {
    pub hdr: bool,
    pub hdr_exposure: f32,
    pub bloom: bool,
    pub bloom_exposure: f32,
}

impl Default for PostProcessSettings {
    fn default() -> Self {
        Self {
            hdr: false,
            hdr_exposure: 1.0,
            bloom: false,
            bloom_exposure: 1.0,
        }
    }
}

impl PostProcessSettings {
    /// Whether the colour pass renders into the HDR target.
    pub fn uses_hdr_target(&self) -> bool {
        self.hdr || self.bloom
    }

    /// Changes the exposure of whichever mode currently decides the output.
    pub fn adjust_exposure(&mut self, delta: f32) {
        let exposure = if self.bloom {
            &mut self.bloom_exposure
        } else {
            &mut self.hdr_exposure
        };
        *exposure = (*exposure + delta).clamp(0.05, 20.0);
    }
}
