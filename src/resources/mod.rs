//! Loading meshes and images from disk.
//!
//! Paths are resolved against an asset root. Absolute paths, such as files
//! dropped onto the window, are used as they are.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

pub mod mesh;
pub mod texture;

pub fn asset_path(root: &Path, file_name: &str) -> PathBuf {
    root.join(file_name)
}

pub async fn load_string(root: &Path, file_name: &str) -> anyhow::Result<String> {
    let path = asset_path(root, file_name);
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("could not read {}", path.display()))
}

pub async fn load_binary(root: &Path, file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(root, file_name);
    tokio::fs::read(&path)
        .await
        .with_context(|| format!("could not read {}", path.display()))
}
