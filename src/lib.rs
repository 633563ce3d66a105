//! scene-sandbox
//!
//! An educational rendering sandbox on top of wgpu. Drawables hang off a
//! transform tree, reference materials from an explicit registry and are
//! rendered every frame through a fixed pass sequence: a shadow map from
//! the light, the scene into an offscreen or HDR target, an optional
//! ping-pong bloom blur, a composite onto the screen and a debug overlay.
//!
//! High-level modules
//! - `render`: the [`render::RenderBackend`] seam and the handle types it hands out
//! - `backend`: the wgpu implementation of that seam
//! - `data_structures`: transform tree, scene graph, drawables, meshes, particles
//! - `registry`: named shaders and materials
//! - `frame`: render targets and the per-frame pass sequence
//! - `pipelines`: built-in WGSL programs and pipeline construction
//! - `resources`: loading meshes and images from disk
//! - `demo`, `overlay`, `dropped_files`, `flow`: the interactive application
//!

pub mod backend;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod demo;
pub mod dropped_files;
pub mod flow;
pub mod frame;
pub mod overlay;
pub mod pipelines;
pub mod registry;
pub mod render;
pub mod resources;
