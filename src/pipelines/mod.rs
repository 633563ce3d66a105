//! Built-in WGSL programs and render pipeline construction.
//!
//! Every program is prefixed with `common.wgsl`, which declares the shared
//! uniform block, the material bindings and the vertex layout, so all of them
//! fit the single pipeline layout built in [`basic`].

pub mod basic;

macro_rules! program {
    ($file:literal) => {
        concat!(include_str!("common.wgsl"), include_str!($file))
    };
}

pub const BASE: &str = program!("base.wgsl");
pub const COLORED: &str = program!("colored.wgsl");
pub const TEXTURED: &str = program!("textured.wgsl");
pub const PARTICLE: &str = program!("particle.wgsl");
pub const SKYBOX: &str = program!("sky.wgsl");
pub const DEPTH: &str = program!("depth.wgsl");
pub const POST_PROCESSING: &str = program!("post.wgsl");
pub const PHONG_SHADOWED: &str = program!("lit.wgsl");
pub const BLOOM: &str = program!("bloom.wgsl");
pub const BLUR: &str = program!("blur.wgsl");
pub const HDR: &str = program!("hdr.wgsl");
pub const OVERLAY: &str = program!("overlay.wgsl");

/// Registry names and sources of all built-in programs.
pub const BUILTIN_SHADERS: &[(&str, &str)] = &[
    ("base", BASE),
    ("colored", COLORED),
    ("textured", TEXTURED),
    ("Particle", PARTICLE),
    ("SkyBox", SKYBOX),
    ("Depth", DEPTH),
    ("PostProcessing", POST_PROCESSING),
    ("PhongShadowed", PHONG_SHADOWED),
    ("Bloom", BLOOM),
    ("Blur", BLUR),
    ("Hdr", HDR),
    ("Overlay", OVERLAY),
];
