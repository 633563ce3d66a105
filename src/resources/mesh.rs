use std::{
    io::{BufReader, Cursor},
    path::Path,
};

use crate::{
    data_structures::mesh::{MeshData, Vertex},
    resources::load_string,
};

/// File extensions the mesh loader accepts.
pub const MESH_EXTENSIONS: &[&str] = &["obj"];

/**
 * Loads every object of an .obj file as its own mesh.
 *
 * Materials referenced by the file are not needed for geometry, so a missing
 * .mtl only produces a warning. Objects without faces are skipped and objects
 * without normals get smooth normals.
 */
pub async fn load_mesh_obj(root: &Path, file_name: &str) -> anyhow::Result<Vec<MeshData>> {
    let obj_text = load_string(root, file_name).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let mtl_root = root.to_path_buf();
    let (models, _materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| {
            let mtl_root = mtl_root.clone();
            async move {
                let mat_text = match load_string(&mtl_root, &p).await {
                    Ok(text) => text,
                    Err(e) => {
                        log::warn!("{:#}", e);
                        String::new()
                    }
                };
                tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text)))
            }
        },
    )
    .await?;

    let meshes: Vec<MeshData> = models
        .iter()
        .filter(|model| {
            // points and lines come back without triangles
            let has_faces = !model.mesh.indices.is_empty();
            if !has_faces {
                log::warn!("skipping object {} of {}: no faces", model.name, file_name);
            }
            has_faces
        })
        .map(to_mesh_data)
        .collect();
    log::info!("loaded {} meshes from {}", meshes.len(), file_name);
    Ok(meshes)
}

fn to_mesh_data(model: &tobj::Model) -> MeshData {
    let m = &model.mesh;
    let mut data = MeshData::new(&model.name);
    data.vertices = (0..m.positions.len() / 3)
        .map(|i| {
            let color = if m.vertex_color.len() >= (i + 1) * 3 {
                [
                    m.vertex_color[i * 3],
                    m.vertex_color[i * 3 + 1],
                    m.vertex_color[i * 3 + 2],
                    1.0,
                ]
            } else {
                [1.0; 4]
            };
            Vertex::new(
                [
                    m.positions[i * 3],
                    m.positions[i * 3 + 1],
                    m.positions[i * 3 + 2],
                ],
                [
                    m.normals.get(i * 3).map_or(0.0, |f| *f),
                    m.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                    m.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
                ],
                [
                    m.texcoords.get(i * 2).map_or(0.0, |f| *f),
                    // obj has v pointing up, wgpu down
                    1.0 - m.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
                ],
            )
            .with_color(color)
        })
        .collect();
    data.indices = m.indices.clone();
    if m.normals.is_empty() {
        data.compute_smooth_normals();
    }
    data
}
