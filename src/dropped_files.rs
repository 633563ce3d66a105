//! Files dropped onto the window.
//!
//! A drop is a batch of paths. The first `.obj` becomes a new drawable at the
//! root of the scene; if the batch also holds an image, the mesh is textured
//! with it and moved below the scene, otherwise it gets the lit material.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    data_structures::{
        drawable::{Drawable, DrawableKind},
        scene_graph::{DrawableId, SceneGraph},
    },
    registry::{Material, MaterialHandle, Registry},
    render::RenderBackend,
    resources::{
        mesh::{MESH_EXTENSIONS, load_mesh_obj},
        texture::{IMAGE_EXTENSIONS, load_image},
    },
};

/// Where textured drops are placed relative to the root.
pub const TEXTURED_OFFSET: cgmath::Vector3<f32> = cgmath::Vector3::new(0.0, -3.0, 0.0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Mesh,
    Texture,
    Unknown,
}

/// Classifies a path by its (case-insensitive) extension.
pub fn classify(path: &Path) -> AssetKind {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return AssetKind::Unknown;
    };
    let ext = ext.to_ascii_lowercase();
    if MESH_EXTENSIONS.contains(&ext.as_str()) {
        AssetKind::Mesh
    } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        AssetKind::Texture
    } else {
        AssetKind::Unknown
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropPlan {
    MeshWithTexture { mesh: PathBuf, texture: PathBuf },
    MeshOnly { mesh: PathBuf },
    Ignored,
}

impl DropPlan {
    /// Picks the first mesh and the first texture of a batch.
    pub fn from_paths(paths: &[PathBuf]) -> Self {
        let first = |kind: AssetKind| paths.iter().find(|p| classify(p) == kind).cloned();
        match (first(AssetKind::Mesh), first(AssetKind::Texture)) {
            (Some(mesh), Some(texture)) => DropPlan::MeshWithTexture { mesh, texture },
            (Some(mesh), None) => DropPlan::MeshOnly { mesh },
            (None, _) => {
                log::debug!("ignoring drop without a mesh: {:?}", paths);
                DropPlan::Ignored
            }
        }
    }
}

fn split(path: &Path) -> anyhow::Result<(&Path, &str)> {
    let file_name = path
        .file_name()
        .and_then(|f| f.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    Ok((path.parent().unwrap_or_else(|| Path::new("")), file_name))
}

/// The "textured" material for `texture`, loading the image on first use.
async fn textured_material(
    texture: &Path,
    registry: &mut Registry,
    backend: &mut dyn RenderBackend,
) -> anyhow::Result<MaterialHandle> {
    let key = texture.to_string_lossy();
    if let Ok(handle) = registry.materials.lookup(&key) {
        log::debug!("reusing material {}", key);
        return Ok(handle);
    }
    let (root, file_name) = split(texture)?;
    let image = load_image(root, file_name).await?;
    let texture_handle = backend.create_texture(&image, file_name)?;
    let shader = registry.shaders.lookup("textured")?;
    Ok(registry.register_material(&key, Material::textured(shader, texture_handle))?)
}

/**
 * Adds the dropped mesh to the scene.
 *
 * The cursor is reset to the root first, so the new drawable never ends up
 * inside whatever hierarchy was built last. Returns `None` for ignored drops.
 */
pub async fn apply(
    plan: &DropPlan,
    scene: &mut SceneGraph,
    registry: &mut Registry,
    backend: &mut dyn RenderBackend,
) -> anyhow::Result<Option<DrawableId>> {
    let mesh_path = match plan {
        DropPlan::Ignored => return Ok(None),
        DropPlan::MeshWithTexture { mesh, .. } | DropPlan::MeshOnly { mesh } => mesh,
    };
    // load the mesh before creating any material
    let (root, file_name) = split(mesh_path)?;
    let data = load_mesh_obj(root, file_name).await?;
    anyhow::ensure!(!data.is_empty(), "{} contains no meshes", mesh_path.display());

    let (material, model) = match plan {
        DropPlan::MeshWithTexture { texture, .. } => (
            textured_material(texture, registry, backend).await?,
            cgmath::Matrix4::from_translation(TEXTURED_OFFSET),
        ),
        _ => (
            registry.materials.lookup("litMaterial")?,
            cgmath::Matrix4::from_scale(1.0),
        ),
    };
    let meshes = data.iter().map(|m| backend.upload_mesh(m)).collect();

    scene.reset_cursor();
    let drawable = Drawable::new(
        DrawableKind::Mesh {
            path: mesh_path.to_string_lossy().into_owned(),
            meshes,
        },
        material,
    )
    .with_model(model)
    .with_name(file_name);
    let id = scene.add_drawable(drawable);
    log::info!("added {} to the scene", mesh_path.display());
    Ok(Some(id))
}
