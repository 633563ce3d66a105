//! Sandbox data structures: meshes, drawables, textures, scene graphs, and instances.
//!
//! This module contains the core data types for scene representation:
//!
//! - `mesh` contains CPU vertex data and its uploaded GPU buffers
//! - `primitives` generates cubes, spheres, quads, tori and the skybox
//! - `drawable` is the renderable shape attached to a scene node
//! - `particles` is the CPU particle system behind instanced particle draws
//! - `texture` contains GPU texture wrapper and creation utilities
//! - `instance` holds per-instance and per-draw data as laid out on the GPU
//! - `scene_graph` enables hierarchical scene organization

pub mod drawable;
pub mod instance;
pub mod mesh;
pub mod particles;
pub mod primitives;
pub mod scene_graph;
pub mod texture;
