use std::path::Path;

use anyhow::Context as _;
use image::{DynamicImage, Rgba, RgbaImage};

use crate::resources::load_binary;

/// File extensions the texture loader accepts.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub async fn load_image(root: &Path, file_name: &str) -> anyhow::Result<DynamicImage> {
    let data = load_binary(root, file_name).await?;
    image::load_from_memory(&data).with_context(|| format!("could not decode {}", file_name))
}

/// A checkerboard of `cells` x `cells` squares.
pub fn checkerboard(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> DynamicImage {
    let cell = (size / cells.max(1)).max(1);
    DynamicImage::ImageRgba8(RgbaImage::from_fn(size, size, |x, y| {
        if (x / cell + y / cell) % 2 == 0 {
            Rgba(a)
        } else {
            Rgba(b)
        }
    }))
}

/// Rows of offset bricks separated by mortar lines.
pub fn bricks(size: u32) -> DynamicImage {
    let brick_h = (size / 8).max(2);
    let brick_w = brick_h * 2;
    DynamicImage::ImageRgba8(RgbaImage::from_fn(size, size, |x, y| {
        let row = y / brick_h;
        let shifted = x + if row % 2 == 0 { 0 } else { brick_w / 2 };
        if y % brick_h == 0 || shifted % brick_w == 0 {
            Rgba([200, 200, 190, 255])
        } else {
            Rgba([150, 60, 40, 255])
        }
    }))
}

/// A vertical gradient from horizon to zenith used when no sky image is present.
pub fn sky_gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |_, y| {
        let t = y as f32 / height.max(1) as f32;
        let lerp = |top: f32, bottom: f32| ((top + (bottom - top) * t) * 255.0) as u8;
        Rgba([lerp(0.25, 0.8), lerp(0.45, 0.85), lerp(0.85, 0.9), 255])
    }))
}
