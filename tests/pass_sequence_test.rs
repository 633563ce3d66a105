use scene_sandbox::{
    config::PostProcessSettings,
    data_structures::{
        drawable::{Drawable, DrawableKind},
        primitives,
    },
    frame::{FrameStats, NoOverlay, Overlay},
    registry::Material,
    render::{Clear, PassTarget, RenderBackend},
};

use crate::common::test_utils::{Command, Fixture, cube, empty_scene, fixture, test_config};

mod common;

fn settings(hdr: bool, bloom: bool) -> PostProcessSettings {
    PostProcessSettings {
        hdr,
        bloom,
        hdr_exposure: 1.5,
        bloom_exposure: 0.7,
    }
}

/// Renders one frame of a scene with two cubes and returns the fixture for inspection.
fn render_frame(settings: &PostProcessSettings, overlay: &dyn Overlay) -> (Fixture, FrameStats) {
    let mut f = fixture(&test_config());
    let mut scene = empty_scene();
    scene.add_drawable(cube(f.cube, f.lit));
    scene.add_child(cgmath::Matrix4::from_scale(2.0));
    scene.add_drawable(cube(f.cube, f.white));
    let stats = f
        .pipeline
        .render_frame(&scene, &mut f.backend, &f.registry, settings, overlay)
        .unwrap();
    (f, stats)
}

struct CountingOverlay;

impl Overlay for CountingOverlay {
    fn draw(&self, backend: &mut dyn RenderBackend, _settings: &PostProcessSettings) -> usize {
        backend.draw_fullscreen(&scene_sandbox::render::FullscreenCall {
            label: "overlay marker",
            program: scene_sandbox::render::ProgramHandle(0),
            inputs: [None, None],
            params: Default::default(),
        });
        1
    }
}

#[test]
fn shadow_pass_comes_first_with_the_depth_material() {
    let (f, stats) = render_frame(&settings(false, false), &NoOverlay);
    let shadow = f.backend.pass(0);
    assert_eq!(
        shadow[0],
        Command::BeginPass {
            label: "shadow".to_string(),
            target: PassTarget::Texture(f.pipeline.targets.shadow.handle),
            clear: Clear::depth_only(),
        }
    );
    assert_eq!(shadow[1], Command::DepthTest(true));
    let depth_program = f.backend.program_named("Depth");
    let draws: Vec<_> = shadow
        .iter()
        .filter_map(|c| match c {
            Command::Draw { program, depth_test, .. } => Some((*program, *depth_test)),
            _ => None,
        })
        .collect();
    assert_eq!(draws, [(depth_program, true), (depth_program, true)]);
    assert_eq!(stats.shadow_draws, 2);
}

#[test]
fn plain_frame_blits_the_offscreen_target() {
    let (f, stats) = render_frame(&settings(false, false), &NoOverlay);
    assert_eq!(f.backend.pass_labels(), ["shadow", "color", "post", "overlay"]);

    let color = f.backend.pass(1);
    let Command::BeginPass { target, clear, .. } = &color[0] else {
        unreachable!()
    };
    assert_eq!(*target, PassTarget::Texture(f.pipeline.targets.offscreen.handle));
    assert!(clear.depth && clear.color.is_some());

    let fullscreen = f.backend.fullscreen_draws();
    assert_eq!(fullscreen.len(), 1);
    let Command::Fullscreen { program, inputs, .. } = fullscreen[0] else {
        unreachable!()
    };
    assert_eq!(*program, f.backend.program_named("PostProcessing"));
    assert_eq!(inputs[0], f.pipeline.targets.offscreen.color(0));
    assert_eq!(
        stats,
        FrameStats {
            passes: 4,
            shadow_draws: 2,
            skybox_draws: 0,
            color_draws: 2,
            blur_draws: 0,
            composite_draws: 1,
            overlay_draws: 0,
        }
    );
}

#[test]
fn hdr_only_tone_maps_the_first_hdr_buffer() {
    let (f, stats) = render_frame(&settings(true, false), &NoOverlay);
    assert_eq!(f.backend.pass_labels(), ["shadow", "color", "hdr", "overlay"]);

    let Command::BeginPass { target, .. } = &f.backend.pass(1)[0] else {
        unreachable!()
    };
    assert_eq!(*target, PassTarget::Texture(f.pipeline.targets.hdr.handle));

    let fullscreen = f.backend.fullscreen_draws();
    assert_eq!(fullscreen.len(), 1);
    let Command::Fullscreen { program, inputs, params, .. } = fullscreen[0] else {
        unreachable!()
    };
    assert_eq!(*program, f.backend.program_named("Hdr"));
    assert_eq!(inputs[0], f.pipeline.targets.hdr.color(0));
    assert_eq!(params.exposure, 1.5);
    assert_eq!(stats.blur_draws, 0);
}

#[test]
fn bloom_blurs_ten_times_then_composites() {
    let (f, stats) = render_frame(&settings(false, true), &NoOverlay);
    let targets = &f.pipeline.targets;
    let mut expected = vec!["shadow", "color"];
    expected.extend(std::iter::repeat_n("blur", 10));
    expected.extend(["bloom", "overlay"]);
    assert_eq!(f.backend.pass_labels(), expected);
    assert_eq!(stats.blur_draws, 10);
    assert_eq!(stats.passes, 14);

    let fullscreen = f.backend.fullscreen_draws();
    let blur_program = f.backend.program_named("Blur");
    for (i, call) in fullscreen[..10].iter().enumerate() {
        let Command::Fullscreen { program, inputs, params, .. } = call else {
            unreachable!()
        };
        assert_eq!(*program, blur_program);
        assert_eq!(params.horizontal, i % 2 == 0, "iteration {}", i);
        let expected_input = if i == 0 {
            targets.hdr.color(1)
        } else {
            targets.ping_pong[(i - 1) % 2].color(0)
        };
        assert_eq!(inputs[0], expected_input, "iteration {}", i);
    }
    // iteration i writes ping_pong[i % 2]
    for i in 0..10 {
        let Command::BeginPass { target, .. } = &f.backend.pass(2 + i)[0] else {
            unreachable!()
        };
        assert_eq!(*target, PassTarget::Texture(targets.ping_pong[i % 2].handle));
    }

    let Command::Fullscreen { program, inputs, params, .. } = fullscreen[10] else {
        unreachable!()
    };
    assert_eq!(*program, f.backend.program_named("Bloom"));
    assert_eq!(inputs, &[targets.hdr.color(0), targets.ping_pong[1].color(0)]);
    assert_eq!(params.exposure, 0.7);
}

#[test]
fn bloom_with_hdr_still_uses_the_bloom_composite() {
    let (f, _) = render_frame(&settings(true, true), &NoOverlay);
    assert!(f.backend.pass_labels().contains(&"bloom".to_string()));
    assert!(!f.backend.pass_labels().contains(&"hdr".to_string()));
}

#[test]
fn zero_blur_iterations_composite_the_bright_buffer() {
    let mut config = test_config();
    config.blur_iterations = 0;
    let mut f = fixture(&config);
    let scene = empty_scene();
    let stats = f
        .pipeline
        .render_frame(&scene, &mut f.backend, &f.registry, &settings(false, true), &NoOverlay)
        .unwrap();
    assert_eq!(stats.blur_draws, 0);
    let fullscreen = f.backend.fullscreen_draws();
    let Command::Fullscreen { inputs, .. } = fullscreen[0] else {
        unreachable!()
    };
    assert_eq!(inputs[1], f.pipeline.targets.hdr.color(1));
}

#[test]
fn overlay_is_always_the_last_pass() {
    for (hdr, bloom) in [(false, false), (true, false), (false, true), (true, true)] {
        let (f, stats) = render_frame(&settings(hdr, bloom), &CountingOverlay);
        let labels = f.backend.pass_labels();
        assert_eq!(labels.last().map(String::as_str), Some("overlay"));
        let last = f.backend.pass(labels.len() - 1);
        assert_eq!(
            last[0],
            Command::BeginPass {
                label: "overlay".to_string(),
                target: PassTarget::Screen,
                clear: Clear::none(),
            }
        );
        assert!(matches!(
            &last[last.len() - 2],
            Command::Fullscreen { label, .. } if label == "overlay marker"
        ));
        assert_eq!(f.backend.commands.last(), Some(&Command::EndPass));
        assert_eq!(stats.overlay_draws, 1);
    }
}

#[test]
fn skybox_draws_without_depth_test_before_the_scene() {
    let mut f = fixture(&test_config());
    let sky_shader = f.registry.shaders.lookup("SkyBox").unwrap();
    let background = f
        .registry
        .register_material("background", Material::flat(sky_shader, [1.0; 4]))
        .unwrap();
    let sky_mesh = f.backend.upload_mesh(&primitives::skybox());
    f.pipeline
        .set_skybox(Drawable::new(DrawableKind::Skybox(sky_mesh), background));

    let mut scene = empty_scene();
    scene.add_drawable(cube(f.cube, f.white));
    let stats = f
        .pipeline
        .render_frame(&scene, &mut f.backend, &f.registry, &settings(false, false), &NoOverlay)
        .unwrap();
    assert_eq!(stats.skybox_draws, 1);

    let color_draws: Vec<(String, bool)> = f
        .backend
        .pass(1)
        .iter()
        .filter_map(|c| match c {
            Command::Draw { label, depth_test, .. } => Some((label.clone(), *depth_test)),
            _ => None,
        })
        .collect();
    assert_eq!(
        color_draws,
        [("skybox".to_string(), false), ("cube".to_string(), true)]
    );

    // the skybox never shows up in the shadow map
    assert!(f.backend.pass(0).iter().all(|c| match c {
        Command::Draw { mesh, .. } => *mesh != sky_mesh,
        _ => true,
    }));
}

#[test]
fn targets_are_created_once_and_reused() {
    let mut f = fixture(&test_config());
    let created = f.backend.targets.len();
    assert_eq!(created, 5);
    let scene = empty_scene();
    for s in [settings(false, false), settings(true, true)] {
        f.pipeline
            .render_frame(&scene, &mut f.backend, &f.registry, &s, &NoOverlay)
            .unwrap();
    }
    assert_eq!(f.backend.targets.len(), created);
}

#[test]
fn invalid_target_description_fails_setup() {
    let mut config = test_config();
    config.shadow_size = 0;
    let mut backend = crate::common::test_utils::RecordingBackend::new();
    let result = scene_sandbox::frame::RenderTargets::create(
        &mut backend,
        [config.width, config.height],
        config.shadow_size,
    );
    assert!(result.is_err());
}
