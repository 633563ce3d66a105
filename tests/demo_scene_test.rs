use std::f32::consts::FRAC_PI_2;

use scene_sandbox::{
    config::PostProcessSettings,
    demo::{self, DemoScene},
    frame::NoOverlay,
};
use tokio::runtime::Runtime;

use crate::common::test_utils::{RecordingBackend, test_config};

mod common;

fn build() -> (RecordingBackend, DemoScene) {
    let mut backend = RecordingBackend::new();
    let demo = Runtime::new()
        .unwrap()
        .block_on(demo::build_scene(&mut backend, &test_config()))
        .unwrap();
    (backend, demo)
}

#[test]
fn builds_without_assets_on_disk() {
    let (backend, demo) = build();
    assert_eq!(backend.shaders.len(), 12);
    for name in [
        "white",
        "green",
        "coloredVerts",
        "background",
        "depthMaterial",
        "offScreenMaterial",
        "litMaterial",
        "checkers",
        "brick",
        "pMaterial",
    ] {
        assert!(demo.registry.materials.contains(name), "missing {}", name);
    }
    assert_eq!(demo.registry.validate(), Ok(()));
    assert!(demo.pipeline.skybox().is_some());
    // every image fell back to a generated texture
    assert!(backend.textures.iter().any(|t| t == "sky.jpg"));
}

#[test]
fn scene_has_the_expected_hierarchy() {
    let (_, demo) = build();
    let scene = &demo.scene;
    assert_eq!(scene.tree().len(), 5);
    assert_eq!(scene.cursor(), scene.root());
    assert_eq!(scene.tree().parent(demo.nodes.stage).unwrap(), Some(scene.root()));
    assert_eq!(scene.tree().parent(demo.nodes.spinner).unwrap(), Some(demo.nodes.stage));
    assert_eq!(scene.tree().parent(demo.nodes.orbiter).unwrap(), Some(demo.nodes.spinner));
    assert_eq!(scene.tree().parent(demo.nodes.wobbler).unwrap(), Some(demo.nodes.spinner));

    // 5 at the root, the floor, particles and two quads, the torus and 27 sub-cubes
    assert_eq!(scene.drawable_count(), 5 + 1 + 3 + 1 + 27);
    let sub_cubes = scene
        .drawables()
        .filter(|(node, d)| *node == demo.nodes.wobbler && d.name.starts_with("subCube"))
        .count();
    assert_eq!(sub_cubes, 27);
}

#[test]
fn light_follows_the_light_cube() {
    let (_, mut demo) = build();
    let start = demo.scene.light.position;
    assert!((start.x + 4.0).abs() < 1e-5 && (start.y - 2.0).abs() < 1e-5);

    demo.scene.update(FRAC_PI_2);
    demo.animate().unwrap();
    let moved = demo.scene.light.position;
    assert!((moved.x + 4.0).abs() < 1e-4);
    assert!(moved.y.abs() < 1e-4);
    assert!((moved.z - 2.0).abs() < 1e-4);

    let cube = demo.scene.drawable(demo.light_cube).unwrap();
    let centre = cube.model * cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0);
    assert!((centre.z - moved.z).abs() < 1e-4);
}

#[test]
fn animation_updates_the_node_transforms() {
    let (_, mut demo) = build();
    let before = demo.scene.tree().transform(demo.nodes.orbiter).unwrap();
    demo.scene.update(0.5);
    demo.animate().unwrap();
    let after = demo.scene.tree().transform(demo.nodes.orbiter).unwrap();
    assert_ne!(before, after);
}

#[test]
fn renders_a_full_frame() {
    let (mut backend, demo) = build();
    backend.clear();
    let settings = PostProcessSettings {
        bloom: true,
        ..Default::default()
    };
    let stats = demo
        .pipeline
        .render_frame(&demo.scene, &mut backend, &demo.registry, &settings, &NoOverlay)
        .unwrap();
    assert_eq!(stats.shadow_draws, demo.scene.drawable_count());
    assert_eq!(stats.skybox_draws, 1);
    assert_eq!(stats.color_draws, demo.scene.drawable_count());
    assert_eq!(stats.blur_draws, 10);
    assert_eq!(backend.pass_labels().last().map(String::as_str), Some("overlay"));
}
