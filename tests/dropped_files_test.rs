use std::path::{Path, PathBuf};

use scene_sandbox::{
    data_structures::drawable::DrawableKind,
    dropped_files::{self, AssetKind, DropPlan, TEXTURED_OFFSET},
};
use tokio::runtime::Runtime;

use crate::common::test_utils::{assert_matrix_eq, empty_scene, fixture, test_config};

mod common;

const TRIANGLE_OBJ: &str = "o triangle
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
f 1/1 2/2 3/3
";

const TRIANGLE_AND_POINTS_OBJ: &str = "o tri
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f 1 2 3
o pts
v 5.0 5.0 5.0
p 4
";

/// A fresh directory under the system temp dir for one test.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("scene-sandbox-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn classifies_by_extension() {
    assert_eq!(dropped_files::classify(Path::new("ship.obj")), AssetKind::Mesh);
    assert_eq!(dropped_files::classify(Path::new("SHIP.OBJ")), AssetKind::Mesh);
    assert_eq!(dropped_files::classify(Path::new("a/b/hull.png")), AssetKind::Texture);
    assert_eq!(dropped_files::classify(Path::new("hull.jpeg")), AssetKind::Texture);
    assert_eq!(dropped_files::classify(Path::new("hull.jpg")), AssetKind::Texture);
    assert_eq!(dropped_files::classify(Path::new("notes.txt")), AssetKind::Unknown);
    assert_eq!(dropped_files::classify(Path::new("Makefile")), AssetKind::Unknown);
}

#[test]
fn plans_mesh_with_texture() {
    let paths = vec![
        PathBuf::from("readme.md"),
        PathBuf::from("hull.png"),
        PathBuf::from("ship.obj"),
        PathBuf::from("other.obj"),
    ];
    assert_eq!(
        DropPlan::from_paths(&paths),
        DropPlan::MeshWithTexture {
            mesh: PathBuf::from("ship.obj"),
            texture: PathBuf::from("hull.png"),
        }
    );
}

#[test]
fn plans_mesh_only_and_ignores_the_rest() {
    let mesh_only = vec![PathBuf::from("ship.obj"), PathBuf::from("notes.txt")];
    assert_eq!(
        DropPlan::from_paths(&mesh_only),
        DropPlan::MeshOnly {
            mesh: PathBuf::from("ship.obj")
        }
    );
    let no_mesh = vec![PathBuf::from("hull.png")];
    assert_eq!(DropPlan::from_paths(&no_mesh), DropPlan::Ignored);
    assert_eq!(DropPlan::from_paths(&[]), DropPlan::Ignored);
}

#[test]
fn ignored_drop_changes_nothing() {
    let mut f = fixture(&test_config());
    let mut scene = empty_scene();
    let node = scene.add_child(crate::common::test_utils::identity());
    let result = Runtime::new()
        .unwrap()
        .block_on(dropped_files::apply(
            &DropPlan::Ignored,
            &mut scene,
            &mut f.registry,
            &mut f.backend,
        ))
        .unwrap();
    assert_eq!(result, None);
    assert_eq!(scene.drawable_count(), 0);
    assert_eq!(scene.cursor(), node);
}

#[test]
fn mesh_only_uses_the_lit_material_at_the_root() {
    let dir = scratch_dir("mesh-only");
    let mesh = dir.join("triangle.obj");
    std::fs::write(&mesh, TRIANGLE_OBJ).unwrap();

    let mut f = fixture(&test_config());
    let mut scene = empty_scene();
    scene.add_child(crate::common::test_utils::translation(0.0, 9.0, 0.0));
    let id = Runtime::new()
        .unwrap()
        .block_on(dropped_files::apply(
            &DropPlan::MeshOnly { mesh },
            &mut scene,
            &mut f.registry,
            &mut f.backend,
        ))
        .unwrap()
        .expect("mesh drops add a drawable");

    assert_eq!(scene.cursor(), scene.root());
    assert_eq!(scene.node_of(id).unwrap(), scene.root());
    let drawable = scene.drawable(id).unwrap();
    assert_eq!(drawable.material, f.lit);
    assert_matrix_eq(drawable.model, crate::common::test_utils::identity());
    let DrawableKind::Mesh { meshes, .. } = &drawable.kind else {
        panic!("expected a mesh drawable, got {:?}", drawable.kind);
    };
    assert_eq!(meshes.len(), 1);
    let uploaded = f.backend.meshes.last().unwrap();
    assert_eq!(uploaded.vertices.len(), 3);
    assert_eq!(uploaded.triangle_count(), 1);
}

#[test]
fn mesh_with_texture_creates_then_reuses_a_material() {
    let dir = scratch_dir("textured");
    let mesh = dir.join("triangle.obj");
    std::fs::write(&mesh, TRIANGLE_OBJ).unwrap();
    let texture = dir.join("hull.png");
    image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]))
        .save(&texture)
        .unwrap();

    let mut f = fixture(&test_config());
    let mut scene = empty_scene();
    let plan = DropPlan::from_paths(&[texture.clone(), mesh.clone()]);
    let runtime = Runtime::new().unwrap();

    let first = runtime
        .block_on(dropped_files::apply(&plan, &mut scene, &mut f.registry, &mut f.backend))
        .unwrap()
        .unwrap();
    let textures_after_first = f.backend.textures.len();
    let second = runtime
        .block_on(dropped_files::apply(&plan, &mut scene, &mut f.registry, &mut f.backend))
        .unwrap()
        .unwrap();

    let key = texture.to_string_lossy();
    let material = f.registry.materials.lookup(&key).unwrap();
    let a = scene.drawable(first).unwrap();
    let b = scene.drawable(second).unwrap();
    assert_eq!(a.material, material);
    assert_eq!(b.material, material);
    // the image is only uploaded once
    assert_eq!(f.backend.textures.len(), textures_after_first);
    assert_matrix_eq(a.model, cgmath::Matrix4::from_translation(TEXTURED_OFFSET));

    let textured = f.registry.shaders.lookup("textured").unwrap();
    assert_eq!(f.registry.material(material).unwrap().shader, textured);
}

#[test]
fn missing_mesh_file_is_an_error_and_adds_nothing() {
    let mut f = fixture(&test_config());
    let mut scene = empty_scene();
    let plan = DropPlan::MeshOnly {
        mesh: scratch_dir("missing").join("nothing-here.obj"),
    };
    let result = Runtime::new().unwrap().block_on(dropped_files::apply(
        &plan,
        &mut scene,
        &mut f.registry,
        &mut f.backend,
    ));
    assert!(result.is_err());
    assert_eq!(scene.drawable_count(), 0);
}

#[test]
fn objects_without_faces_are_skipped() {
    let dir = scratch_dir("points");
    let mesh = dir.join("mixed.obj");
    std::fs::write(&mesh, TRIANGLE_AND_POINTS_OBJ).unwrap();

    let mut f = fixture(&test_config());
    let mut scene = empty_scene();
    let meshes_before = f.backend.meshes.len();
    let id = Runtime::new()
        .unwrap()
        .block_on(dropped_files::apply(
            &DropPlan::MeshOnly { mesh },
            &mut scene,
            &mut f.registry,
            &mut f.backend,
        ))
        .unwrap()
        .expect("the triangle is still added");

    let DrawableKind::Mesh { meshes, .. } = &scene.drawable(id).unwrap().kind else {
        panic!("expected a mesh drawable");
    };
    assert_eq!(meshes.len(), 1);
    assert_eq!(f.backend.meshes.len(), meshes_before + 1);
    assert!(f.backend.meshes.iter().all(|m| !m.indices.is_empty()));
}

#[test]
fn missing_mesh_with_texture_leaves_no_material_behind() {
    let dir = scratch_dir("missing-textured");
    let texture = dir.join("hull.png");
    image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]))
        .save(&texture)
        .unwrap();

    let mut f = fixture(&test_config());
    let mut scene = empty_scene();
    let materials = f.registry.materials.len();
    let textures = f.backend.textures.len();
    let plan = DropPlan::MeshWithTexture {
        mesh: dir.join("nothing-here.obj"),
        texture: texture.clone(),
    };
    let result = Runtime::new().unwrap().block_on(dropped_files::apply(
        &plan,
        &mut scene,
        &mut f.registry,
        &mut f.backend,
    ));

    assert!(result.is_err());
    assert_eq!(scene.drawable_count(), 0);
    assert_eq!(f.registry.materials.len(), materials);
    assert_eq!(f.backend.textures.len(), textures);
    assert!(f.registry.materials.lookup(&texture.to_string_lossy()).is_err());
}
