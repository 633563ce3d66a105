//! Viewpoints the scene can be rendered from.
//!
//! Both the [`Camera`] and the [`Light`] look from a position towards a
//! target and carry their own [`Projection`]. The scene graph only sees them
//! through the [`Viewpoint`] trait so the same traversal serves the shadow
//! pass and the colour pass.

use cgmath::{Matrix3, Matrix4, Point3, Vector3};

/// cgmath produces OpenGL clip space (z in [-1, 1]); wgpu expects z in [0, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Perspective {
        fovy: cgmath::Deg<f32>,
        aspect: f32,
        znear: f32,
        zfar: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        znear: f32,
        zfar: f32,
    },
}

impl Projection {
    pub fn perspective(fovy: f32, width: u32, height: u32, znear: f32, zfar: f32) -> Self {
        Self::Perspective {
            fovy: cgmath::Deg(fovy),
            aspect: aspect_ratio(width, height),
            znear,
            zfar,
        }
    }

    /// Projection matrix in wgpu clip space.
    pub fn matrix(&self) -> Matrix4<f32> {
        let proj = match *self {
            Projection::Perspective {
                fovy,
                aspect,
                znear,
                zfar,
            } => cgmath::perspective(fovy, aspect, znear, zfar),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                znear,
                zfar,
            } => cgmath::ortho(left, right, bottom, top, znear, zfar),
        };
        OPENGL_TO_WGPU_MATRIX * proj
    }

    /// Only perspective projections depend on the window shape.
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Projection::Perspective { aspect, .. } = self {
            *aspect = aspect_ratio(width, height);
        }
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

/// Anything the scene can be rendered from.
pub trait Viewpoint {
    fn position(&self) -> Point3<f32>;
    fn view_matrix(&self) -> Matrix4<f32>;
    fn projection_matrix(&self) -> Matrix4<f32>;

    fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub projection: Projection,
}

impl Camera {
    pub fn new(position: Point3<f32>, target: Point3<f32>, projection: Projection) -> Self {
        Self {
            position,
            target,
            up: Vector3::unit_y(),
            projection,
        }
    }

    /// The view matrix without its translation, used for the skybox so it
    /// stays centred on the camera.
    pub fn rotation_only_view(&self) -> Matrix4<f32> {
        let view = self.view_matrix();
        let rotation = Matrix3::from_cols(view.x.truncate(), view.y.truncate(), view.z.truncate());
        Matrix4::from(rotation)
    }
}

impl Viewpoint for Camera {
    fn position(&self) -> Point3<f32> {
        self.position
    }

    fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection.matrix()
    }
}

/// A point light that also acts as the shadow-casting viewpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub projection: Projection,
    pub color: [f32; 3],
}

impl Light {
    pub fn new(position: Point3<f32>, target: Point3<f32>, projection: Projection) -> Self {
        Self {
            position,
            target,
            up: Vector3::unit_y(),
            projection,
            color: [1.0, 1.0, 1.0],
        }
    }
}

impl Viewpoint for Light {
    fn position(&self) -> Point3<f32> {
        self.position
    }

    fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection.matrix()
    }
}
