use cgmath::{Matrix4, Rad};
use scene_sandbox::data_structures::scene_graph::{SceneError, TransformTree};

use crate::common::test_utils::{
    assert_matrix_eq, cube, empty_scene, fixture, identity, test_config, translation,
};

mod common;

#[test]
fn world_transform_multiplies_parent_first() {
    let mut tree = TransformTree::new();
    let rotate = Matrix4::from_angle_y(Rad(std::f32::consts::FRAC_PI_2));
    let parent = tree.add_child(tree.root(), rotate).unwrap();
    let child = tree.add_child(parent, translation(1.0, 0.0, 0.0)).unwrap();

    assert_matrix_eq(
        tree.world_transform(child).unwrap(),
        rotate * translation(1.0, 0.0, 0.0),
    );
    // parent rotation swings the child's offset from +X onto -Z
    let origin = tree.world_transform(child).unwrap() * cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0);
    assert!((origin.x - 0.0).abs() < 1e-5);
    assert!((origin.z + 1.0).abs() < 1e-5);
}

#[test]
fn set_transform_is_seen_by_descendants() {
    let mut tree = TransformTree::new();
    let a = tree.add_child(tree.root(), identity()).unwrap();
    let b = tree.add_child(a, translation(0.0, 1.0, 0.0)).unwrap();

    tree.set_transform(a, translation(5.0, 0.0, 0.0)).unwrap();
    assert_matrix_eq(tree.world_transform(b).unwrap(), translation(5.0, 1.0, 0.0));
    assert_matrix_eq(tree.transform(a).unwrap(), translation(5.0, 0.0, 0.0));
}

#[test]
fn disabled_ancestor_hides_the_whole_subtree() {
    let mut tree = TransformTree::new();
    let a = tree.add_child(tree.root(), identity()).unwrap();
    let b = tree.add_child(a, identity()).unwrap();
    let c = tree.add_child(b, identity()).unwrap();
    let sibling = tree.add_child(tree.root(), identity()).unwrap();

    tree.set_enabled(a, false).unwrap();
    assert!(!tree.is_visible(a).unwrap());
    assert!(!tree.is_visible(c).unwrap());
    assert!(tree.is_enabled(c).unwrap());
    assert!(tree.is_visible(sibling).unwrap());

    let worlds = tree.visible_world_transforms();
    assert!(worlds[a.index()].is_none());
    assert!(worlds[b.index()].is_none());
    assert!(worlds[c.index()].is_none());
    assert!(worlds[sibling.index()].is_some());

    tree.set_enabled(a, true).unwrap();
    assert!(tree.is_visible(c).unwrap());
}

#[test]
fn unknown_nodes_are_rejected() {
    let mut small = TransformTree::new();
    let mut big = TransformTree::new();
    let mut last = big.root();
    for _ in 0..3 {
        last = big.add_child(last, identity()).unwrap();
    }

    assert_eq!(
        small.world_transform(last),
        Err(SceneError::UnknownNode(last.index()))
    );
    assert_eq!(
        small.add_child(last, identity()),
        Err(SceneError::UnknownNode(last.index()))
    );
    assert_eq!(small.len(), 1);
}

#[test]
fn add_child_moves_the_cursor() {
    let mut scene = empty_scene();
    let root = scene.root();
    assert_eq!(scene.cursor(), root);

    let a = scene.add_child(translation(1.0, 0.0, 0.0));
    assert_eq!(scene.cursor(), a);
    let b = scene.add_child(translation(0.0, 1.0, 0.0));
    assert_eq!(scene.cursor(), b);
    assert_eq!(scene.tree().parent(b).unwrap(), Some(a));
    assert_matrix_eq(scene.world_transform(b).unwrap(), translation(1.0, 1.0, 0.0));

    assert_eq!(scene.ascend(), Ok(a));
    let c = scene.add_child(identity());
    assert_eq!(scene.tree().parent(c).unwrap(), Some(a));
    assert_eq!(scene.tree().node(a).unwrap().children(), &[b, c]);
}

#[test]
fn add_child_then_ascend_restores_the_cursor_and_keeps_the_tree() {
    let mut scene = empty_scene();
    let parent = scene.add_child(translation(1.0, 0.0, 0.0));
    let sibling = scene.add_child(identity());
    scene.ascend().unwrap();

    let nodes = scene.tree().len();
    let children = scene.tree().node(parent).unwrap().children().to_vec();
    let child = scene.add_child(identity());
    assert_eq!(scene.ascend(), Ok(parent));
    assert_eq!(scene.cursor(), parent);

    // ascending only moves the cursor, the new node stays in place
    assert_eq!(scene.tree().len(), nodes + 1);
    assert_eq!(children, vec![sibling]);
    assert_eq!(scene.tree().node(parent).unwrap().children(), &[sibling, child]);
    assert_eq!(scene.ascend(), Ok(scene.root()));
    assert_eq!(scene.tree().len(), nodes + 1);
    assert_eq!(scene.tree().node(parent).unwrap().children(), &[sibling, child]);
}

#[test]
fn ascend_at_root_fails_and_keeps_the_cursor() {
    let mut scene = empty_scene();
    let child = scene.add_child(identity());
    assert_eq!(scene.ascend(), Ok(scene.root()));
    assert_eq!(scene.ascend(), Err(SceneError::AscendPastRoot));
    assert_eq!(scene.cursor(), scene.root());

    scene.set_cursor(child).unwrap();
    scene.reset_cursor();
    assert_eq!(scene.cursor(), scene.root());
}

#[test]
fn drawables_attach_to_the_cursor() {
    let fixture = fixture(&test_config());
    let mut scene = empty_scene();
    let at_root = scene.add_drawable(cube(fixture.cube, fixture.white));
    let node = scene.add_child(identity());
    let below = scene.add_drawable(cube(fixture.cube, fixture.white));

    assert_eq!(scene.node_of(at_root).unwrap(), scene.root());
    assert_eq!(scene.node_of(below).unwrap(), node);
    assert_eq!(scene.drawable_count(), 2);
}
