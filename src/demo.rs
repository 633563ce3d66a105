//! The demo scene shown by the `sandbox` binary.
//!
//! Builds every built-in shader and material, the offscreen targets and a
//! scene with a small animated hierarchy:
//!
//! ```text
//! root ── lit cube, lit sphere, green sphere, lit cube, light cube
//!  └─ stage ── floor, shuttle
//!      └─ spinner ── particles, front quad, back quad
//!          ├─ orbiter ── torus
//!          └─ wobbler ── cube of cubes
//! ```

use std::path::Path;

use cgmath::{Deg, InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Transform, Vector3};
use futures::future::join_all;
use image::DynamicImage;

use crate::{
    config::SandboxConfig,
    data_structures::{
        drawable::{Drawable, DrawableKind},
        particles::{EmitterConfig, ParticleSystem},
        primitives,
        scene_graph::{DrawableId, NodeHandle, SceneError, SceneGraph},
    },
    frame::{FramePipeline, RenderTargets},
    pipelines::BUILTIN_SHADERS,
    registry::{Material, Registry},
    render::{MeshHandle, RenderBackend, TextureHandle},
    resources::{
        mesh::load_mesh_obj,
        texture::{bricks, checkerboard, load_image, sky_gradient},
    },
};

const CHECKER_FILE: &str = "checker.png";
const SKY_FILE: &str = "sky.jpg";
const BRICK_FILE: &str = "brick1.jpg";
const SHUTTLE_TEXTURE_FILE: &str = "spstob_1.jpg";
const SHUTTLE_FILE: &str = "shuttle.obj";

/// Nodes whose transforms change every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DemoNodes {
    pub stage: NodeHandle,
    pub spinner: NodeHandle,
    pub orbiter: NodeHandle,
    pub wobbler: NodeHandle,
}

#[derive(Debug)]
pub struct DemoScene {
    pub scene: SceneGraph,
    pub registry: Registry,
    pub pipeline: FramePipeline,
    pub nodes: DemoNodes,
    pub light_cube: DrawableId,
    /// Where the light sits before it is rotated.
    pub light_origin: Point3<f32>,
}

struct Meshes {
    cube: MeshHandle,
    sphere: MeshHandle,
    quad: MeshHandle,
    colored_quad: MeshHandle,
    torus: MeshHandle,
    skybox: MeshHandle,
}

struct Textures {
    checker: TextureHandle,
    sky: TextureHandle,
    brick: TextureHandle,
    shuttle: TextureHandle,
}

async fn load_textures(
    backend: &mut dyn RenderBackend,
    root: &Path,
) -> anyhow::Result<Textures> {
    let files = [CHECKER_FILE, SKY_FILE, BRICK_FILE, SHUTTLE_TEXTURE_FILE];
    let fallbacks: [fn() -> DynamicImage; 4] = [
        || checkerboard(256, 8, [255, 255, 255, 255], [40, 40, 40, 255]),
        || sky_gradient(512, 256),
        || bricks(256),
        || checkerboard(64, 4, [200, 200, 210, 255], [90, 90, 110, 255]),
    ];
    let loaded = join_all(files.iter().map(|file| load_image(root, file))).await;

    let mut handles = Vec::with_capacity(files.len());
    for ((file, result), fallback) in files.iter().zip(loaded).zip(fallbacks) {
        let image = result.unwrap_or_else(|e| {
            log::warn!("{:#}; using a generated texture instead", e);
            fallback()
        });
        handles.push(backend.create_texture(&image, file)?);
    }
    Ok(Textures {
        checker: handles[0],
        sky: handles[1],
        brick: handles[2],
        shuttle: handles[3],
    })
}

fn register_materials(
    registry: &mut Registry,
    targets: &RenderTargets,
    textures: &Textures,
) -> anyhow::Result<()> {
    let shader = |name: &str| registry.shaders.lookup(name);
    let base = shader("base")?;
    let colored = shader("colored")?;
    let textured = shader("textured")?;
    let particle = shader("Particle")?;
    let sky = shader("SkyBox")?;
    let depth = shader("Depth")?;
    let post = shader("PostProcessing")?;
    let lit = shader("PhongShadowed")?;

    let materials = [
        ("white", Material::flat(base, [1.0, 1.0, 1.0, 1.0])),
        ("green", Material::flat(base, [0.8, 0.8, 0.0, 1.0])),
        ("coloredVerts", Material::flat(colored, [1.0, 1.0, 0.0, 1.0])),
        ("background", Material::textured(sky, textures.sky)),
        ("depthMaterial", Material::flat(depth, [1.0, 1.0, 0.0, 1.0])),
        (
            "offScreenMaterial",
            Material::textured(post, targets.offscreen.color(0).unwrap_or(textures.checker)),
        ),
        ("litMaterial", Material::lit(lit, targets.shadow_map())),
        (
            "checkers",
            Material::textured(textured, textures.checker).with_second_texture(textures.sky),
        ),
        (
            "brick",
            Material::textured(textured, textures.brick).with_second_texture(textures.sky),
        ),
        (
            "shuttle",
            Material::textured(textured, textures.shuttle).with_second_texture(textures.sky),
        ),
        ("pMaterial", Material::flat(particle, [1.0, 0.0, 0.0, 1.0])),
    ];
    for (name, material) in materials {
        registry.register_material(name, material)?;
    }
    Ok(())
}

/// A 3x3x3 block of small rotated cubes with a sphere in the centre.
fn cube_of_cubes(scene: &mut SceneGraph, registry: &Registry, meshes: &Meshes) -> anyhow::Result<()> {
    let lit = registry.materials.lookup("litMaterial")?;
    let checkers = registry.materials.lookup("checkers")?;
    let brick = registry.materials.lookup("brick")?;
    for i in -1..2 {
        for j in -1..2 {
            for k in -1..2 {
                let model = Matrix4::from_translation(Vector3::new(i as f32, j as f32, k as f32) * 0.33)
                    * Matrix4::from_scale(0.2)
                    * Matrix4::from_axis_angle(Vector3::new(1.0, 1.0, 0.0).normalize(), Rad(0.8));
                let drawable = if i == 0 && j == 0 && k == 0 {
                    Drawable::new(DrawableKind::Sphere(meshes.sphere), checkers)
                } else if j == k || i == j {
                    Drawable::new(DrawableKind::Cube(meshes.cube), brick)
                } else {
                    Drawable::new(DrawableKind::Cube(meshes.cube), lit)
                };
                scene.add_drawable(
                    drawable
                        .with_model(model)
                        .with_name(&format!("subCube {}:{}:{}", i, j, k)),
                );
            }
        }
    }
    Ok(())
}

/**
 * Compiles the built-in shaders, creates the offscreen targets and fills a
 * scene graph with the demo content.
 *
 * Missing image files are replaced by generated textures and a missing
 * shuttle mesh is skipped, so the demo runs without any assets on disk.
 */
pub async fn build_scene(
    backend: &mut dyn RenderBackend,
    config: &SandboxConfig,
) -> anyhow::Result<DemoScene> {
    let root = Path::new(&config.asset_dir);
    let mut registry = Registry::new();
    for (name, source) in BUILTIN_SHADERS {
        let program = backend.compile_shader(name, source)?;
        registry.register_shader(name, program)?;
    }

    let targets = RenderTargets::create(
        backend,
        [config.width.max(1), config.height.max(1)],
        config.shadow_size,
    )?;
    let textures = load_textures(backend, root).await?;
    register_materials(&mut registry, &targets, &textures)?;
    registry.validate()?;

    let meshes = Meshes {
        cube: backend.upload_mesh(&primitives::cube()),
        sphere: backend.upload_mesh(&primitives::sphere(32, 16)),
        quad: backend.upload_mesh(&primitives::quad()),
        colored_quad: backend.upload_mesh(&primitives::colored_quad()),
        torus: backend.upload_mesh(&primitives::torus(0.5, 1.0, 48)),
        skybox: backend.upload_mesh(&primitives::skybox()),
    };
    let material = |name: &str| registry.materials.lookup(name);

    let mut pipeline = FramePipeline::new(targets, &registry, config)?;
    pipeline.set_skybox(Drawable::new(
        DrawableKind::Skybox(meshes.skybox),
        material("background")?,
    ));

    let mut scene = SceneGraph::new(config.camera(), config.light());
    let lit = material("litMaterial")?;
    scene.add_drawable(
        Drawable::new(DrawableKind::Cube(meshes.cube), lit)
            .with_model(Matrix4::from_translation(Vector3::new(2.0, 0.0, 0.0))),
    );
    // half-size spheres below the origin
    let low_sphere = Matrix4::from_scale(0.5) * Matrix4::from_translation(Vector3::new(0.0, -2.0, 0.0));
    scene.add_drawable(Drawable::new(DrawableKind::Sphere(meshes.sphere), lit).with_model(low_sphere));
    scene.add_drawable(
        Drawable::new(DrawableKind::Sphere(meshes.sphere), material("green")?).with_model(low_sphere),
    );
    scene.add_drawable(
        Drawable::new(DrawableKind::Cube(meshes.cube), lit)
            .with_model(Matrix4::from_translation(Vector3::new(0.0, 0.0, -2.0))),
    );
    let light_origin = config.light_position;
    let light_cube = scene.add_drawable(
        Drawable::new(DrawableKind::Cube(meshes.cube), material("white")?)
            .with_model(light_cube_model(light_origin, 0.0))
            .with_name("light cube"),
    );

    let stage = scene.add_child(Matrix4::identity());
    let floor = Matrix4::from_translation(Vector3::new(0.0, -1.0, 0.0))
        * Matrix4::from_scale(10.0)
        * Matrix4::from_angle_x(Deg(-90.0));
    scene.add_drawable(
        Drawable::new(DrawableKind::Quad(meshes.quad), material("brick")?)
            .with_model(floor)
            .with_name("floor"),
    );
    match load_mesh_obj(root, SHUTTLE_FILE).await {
        Ok(data) if !data.is_empty() => {
            let handles = data.iter().map(|m| backend.upload_mesh(m)).collect();
            scene.add_drawable(
                Drawable::new(
                    DrawableKind::Mesh {
                        path: SHUTTLE_FILE.to_string(),
                        meshes: handles,
                    },
                    material("shuttle")?,
                )
                .with_model(
                    Matrix4::from_translation(Vector3::new(-2.0, 0.0, 0.0)) * Matrix4::from_scale(2.0),
                ),
            );
        }
        Ok(_) => log::warn!("{} holds no meshes, skipping it", SHUTTLE_FILE),
        Err(e) => log::warn!("{:#}; the shuttle is left out", e),
    }

    let spinner = scene.add_child(Matrix4::identity());
    scene.add_drawable(Drawable::new(
        DrawableKind::Particles {
            system: ParticleSystem::new(EmitterConfig::default()),
            mesh: meshes.cube,
        },
        material("pMaterial")?,
    )
    .with_model(Matrix4::from_scale(0.025)));
    scene.add_drawable(
        Drawable::new(DrawableKind::Quad(meshes.quad), material("checkers")?).with_name("front quad"),
    );
    scene.add_drawable(
        Drawable::new(DrawableKind::Quad(meshes.colored_quad), material("coloredVerts")?)
            .with_model(Matrix4::from_angle_x(Rad(std::f32::consts::PI)))
            .with_name("back quad"),
    );

    let orbiter = scene.add_child(Matrix4::identity());
    scene.add_drawable(Drawable::new(DrawableKind::Torus(meshes.torus), lit));
    scene.ascend()?;
    let wobbler = scene.add_child(Matrix4::identity());
    cube_of_cubes(&mut scene, &registry, &meshes)?;
    scene.reset_cursor();

    log::info!(
        "demo scene has {} nodes and {} drawables",
        scene.tree().len(),
        scene.drawable_count()
    );
    Ok(DemoScene {
        scene,
        registry,
        pipeline,
        nodes: DemoNodes {
            stage,
            spinner,
            orbiter,
            wobbler,
        },
        light_cube,
        light_origin,
    })
}

fn light_cube_model(origin: Point3<f32>, time: f32) -> Matrix4<f32> {
    Matrix4::from_angle_x(Rad(time))
        * Matrix4::from_translation(Vector3::new(origin.x, origin.y, origin.z))
        * Matrix4::from_scale(0.25)
}

/// Spins the three animated levels of the hierarchy.
pub fn animate_nodes(scene: &mut SceneGraph, nodes: &DemoNodes, time: f32) -> Result<(), SceneError> {
    scene.set_transform(nodes.spinner, Matrix4::from_angle_x(Rad(time)))?;
    scene.set_transform(
        nodes.orbiter,
        Matrix4::from_angle_y(Rad(time * 2.0)) * Matrix4::from_translation(Vector3::new(0.0, 1.0, 0.0)),
    )?;
    scene.set_transform(
        nodes.wobbler,
        Matrix4::from_angle_z(Rad(time * -2.0)) * Matrix4::from_translation(Vector3::new(0.0, 0.0, -1.0)),
    )?;
    Ok(())
}

/// Rotates the light cube about the X axis and puts the light at its centre.
pub fn move_light(
    scene: &mut SceneGraph,
    light_cube: DrawableId,
    origin: Point3<f32>,
    time: f32,
) -> Result<(), SceneError> {
    let model = light_cube_model(origin, time);
    scene.drawable_mut(light_cube)?.model = model;
    scene.light.position = model.transform_point(Point3::new(0.0, 0.0, 0.0));
    Ok(())
}

impl DemoScene {
    /// Applies the per-frame animation at the current scene time.
    pub fn animate(&mut self) -> Result<(), SceneError> {
        let time = self.scene.time();
        animate_nodes(&mut self.scene, &self.nodes, time)?;
        move_light(&mut self.scene, self.light_cube, self.light_origin, time)
    }
}
