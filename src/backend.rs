//! The wgpu implementation of [`RenderBackend`].
//!
//! wgpu render passes borrow everything they touch until they end, so the
//! backend does not encode while the scene issues commands. Instead every
//! pass and draw of a frame is recorded, together with its uniform block and
//! instance matrices, and [`WgpuBackend::end_frame`] uploads the data and
//! encodes the whole frame in one command buffer.
//!
//! Pipelines are created lazily per (program, attachment layout, depth test)
//! and bind groups per distinct set of material textures; both are cached for
//! the lifetime of the backend.

use std::{collections::HashMap, iter, num::NonZeroU64, ops::Range};

use anyhow::Context as _;
use image::DynamicImage;

use crate::{
    data_structures::{
        instance::{DrawUniform, InstanceRaw},
        mesh::{GpuMesh, MeshData},
        primitives,
        texture::{self, Texture},
    },
    pipelines::basic::{self, PipelineTarget},
    render::{
        Clear, DrawCall, FullscreenCall, MaterialTextures, MeshHandle, PassTarget, ProgramHandle,
        RenderBackend, RenderTarget, TargetDesc, TargetHandle, TextureHandle,
    },
};

/// Distance between two uniform blocks in the dynamic uniform buffer.
const UNIFORM_SLOT: u64 = 512;

#[derive(Debug)]
struct Program {
    name: String,
    module: wgpu::ShaderModule,
}

#[derive(Debug)]
struct TargetResources {
    color: Vec<TextureHandle>,
    formats: Vec<wgpu::TextureFormat>,
    depth: Option<TextureHandle>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramHandle,
    target: PipelineTarget,
    depth_test: bool,
}

#[derive(Debug)]
struct RecordedDraw {
    mesh: MeshHandle,
    pipeline: PipelineKey,
    textures: MaterialTextures,
    uniform_slot: u32,
    instances: Range<u32>,
}

#[derive(Debug)]
struct RecordedPass {
    label: String,
    target: PassTarget,
    clear: Clear,
    draws: Vec<RecordedDraw>,
}

#[derive(Debug)]
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    programs: Vec<Program>,
    meshes: Vec<GpuMesh>,
    textures: Vec<Texture>,
    targets: Vec<TargetResources>,
    uniform_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    bind_groups: HashMap<MaterialTextures, wgpu::BindGroup>,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_capacity: u64,
    instance_buffer: wgpu::Buffer,
    instance_capacity: u64,
    white: TextureHandle,
    empty_shadow: TextureHandle,
    fullscreen: MeshHandle,
    depth_test: bool,
    passes: Vec<RecordedPass>,
    uniforms: Vec<u8>,
    instances: Vec<InstanceRaw>,
}

impl WgpuBackend {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let uniform_layout = basic::uniform_layout(&device);
        let material_layout = basic::material_layout(&device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sandbox Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let uniform_capacity = 64;
        let (uniform_buffer, uniform_bind_group) =
            mk_uniform_buffer(&device, &uniform_layout, uniform_capacity);
        let instance_capacity = 256;
        let instance_buffer = mk_instance_buffer(&device, instance_capacity);

        let mut backend = Self {
            textures: vec![
                Texture::create_solid(&device, &queue, [255, 255, 255, 255], "default white"),
                Texture::create_depth_texture(&device, [1, 1], "default shadow map"),
            ],
            white: TextureHandle(0),
            empty_shadow: TextureHandle(1),
            device,
            queue,
            surface_format,
            programs: Vec::new(),
            meshes: Vec::new(),
            targets: Vec::new(),
            uniform_layout,
            material_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            bind_groups: HashMap::new(),
            uniform_buffer,
            uniform_bind_group,
            uniform_capacity,
            instance_buffer,
            instance_capacity,
            fullscreen: MeshHandle(0),
            depth_test: true,
            passes: Vec::new(),
            uniforms: Vec::new(),
            instances: Vec::new(),
        };
        backend.fullscreen = backend.upload_mesh(&primitives::fullscreen_quad());
        backend
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Drops anything recorded but not yet encoded.
    pub fn begin_frame(&mut self) {
        self.passes.clear();
        self.uniforms.clear();
        self.instances.clear();
        self.depth_test = true;
    }

    /// Uploads the recorded frame data and encodes all passes, drawing screen passes into `screen`.
    pub fn end_frame(&mut self, screen: &wgpu::TextureView) {
        if self.passes.iter().any(|pass| !pass.draws.is_empty()) {
            self.prepare();
        }
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        for pass in self.passes.iter() {
            self.encode_pass(&mut encoder, pass, screen);
        }
        self.queue.submit(iter::once(encoder.finish()));
        self.passes.clear();
    }

    /// Grows the buffers, writes the frame data and fills the caches the passes need.
    fn prepare(&mut self) {
        let slots = (self.uniforms.len() as u64 / UNIFORM_SLOT).max(1);
        if slots > self.uniform_capacity {
            let capacity = slots.next_power_of_two();
            log::debug!("growing uniform buffer to {} slots", capacity);
            let (buffer, bind_group) = mk_uniform_buffer(&self.device, &self.uniform_layout, capacity);
            self.uniform_buffer = buffer;
            self.uniform_bind_group = bind_group;
            self.uniform_capacity = capacity;
        }
        let instances = (self.instances.len() as u64).max(1);
        if instances > self.instance_capacity {
            let capacity = instances.next_power_of_two();
            log::debug!("growing instance buffer to {} instances", capacity);
            self.instance_buffer = mk_instance_buffer(&self.device, capacity);
            self.instance_capacity = capacity;
        }
        if !self.uniforms.is_empty() {
            self.queue.write_buffer(&self.uniform_buffer, 0, &self.uniforms);
        }
        if !self.instances.is_empty() {
            self.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&self.instances));
        }

        let mut pipelines = Vec::new();
        let mut texture_sets = Vec::new();
        for draw in self.passes.iter().flat_map(|pass| pass.draws.iter()) {
            if !self.pipelines.contains_key(&draw.pipeline) {
                pipelines.push(draw.pipeline.clone());
            }
            if !self.bind_groups.contains_key(&draw.textures) {
                texture_sets.push(draw.textures);
            }
        }
        for key in pipelines {
            if self.pipelines.contains_key(&key) {
                continue;
            }
            let program = &self.programs[key.program.0];
            log::debug!(
                "creating pipeline for {} ({} colour attachments, depth test {})",
                program.name,
                key.target.colors.len(),
                key.depth_test
            );
            let pipeline = basic::mk_render_pipeline(
                &self.device,
                &self.pipeline_layout,
                &program.module,
                &key.target,
                key.depth_test,
                &program.name,
            );
            self.pipelines.insert(key, pipeline);
        }
        for textures in texture_sets {
            if self.bind_groups.contains_key(&textures) {
                continue;
            }
            let bind_group = self.mk_material_bind_group(&textures);
            self.bind_groups.insert(textures, bind_group);
        }
    }

    fn colour_texture(&self, handle: Option<TextureHandle>) -> &Texture {
        match handle.and_then(|handle| self.textures.get(handle.0)) {
            Some(texture) if texture.format != Texture::DEPTH_FORMAT => texture,
            Some(_) => {
                log::warn!("a depth texture can't be sampled as colour, using the default");
                &self.textures[self.white.0]
            }
            None => &self.textures[self.white.0],
        }
    }

    fn shadow_texture(&self, handle: Option<TextureHandle>) -> &Texture {
        match handle.and_then(|handle| self.textures.get(handle.0)) {
            Some(texture) if texture.format == Texture::DEPTH_FORMAT => texture,
            Some(_) => {
                log::warn!("shadow maps must be depth textures, using the default");
                &self.textures[self.empty_shadow.0]
            }
            None => &self.textures[self.empty_shadow.0],
        }
    }

    fn mk_material_bind_group(&self, textures: &MaterialTextures) -> wgpu::BindGroup {
        let base = self.colour_texture(textures.base);
        let second = self.colour_texture(textures.second);
        let shadow = self.shadow_texture(textures.shadow);
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&base.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&base.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&second.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&second.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&shadow.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&shadow.sampler),
                },
            ],
            label: Some("material_bind_group"),
        })
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pass: &RecordedPass,
        screen: &wgpu::TextureView,
    ) {
        let colour_ops = wgpu::Operations {
            load: match pass.clear.color {
                Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                None => wgpu::LoadOp::Load,
            },
            store: wgpu::StoreOp::Store,
        };
        let (views, depth): (Vec<&wgpu::TextureView>, Option<&wgpu::TextureView>) =
            match pass.target {
                PassTarget::Screen => (vec![screen], None),
                PassTarget::Texture(handle) => {
                    let target = &self.targets[handle.0];
                    (
                        target
                            .color
                            .iter()
                            .map(|texture| &self.textures[texture.0].view)
                            .collect(),
                        target.depth.map(|texture| &self.textures[texture.0].view),
                    )
                }
            };
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = views
            .into_iter()
            .map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: colour_ops,
                    depth_slice: None,
                })
            })
            .collect();

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.label.as_str()),
            color_attachments: &color_attachments,
            depth_stencil_attachment: depth.map(|view| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: if pass.clear.depth {
                        wgpu::LoadOp::Clear(1.0)
                    } else {
                        wgpu::LoadOp::Load
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        for draw in pass.draws.iter() {
            let (Some(pipeline), Some(material)) = (
                self.pipelines.get(&draw.pipeline),
                self.bind_groups.get(&draw.textures),
            ) else {
                log::error!("draw in pass '{}' was not prepared", pass.label);
                continue;
            };
            let mesh = &self.meshes[draw.mesh.0];
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(
                0,
                &self.uniform_bind_group,
                &[draw.uniform_slot * UNIFORM_SLOT as u32],
            );
            render_pass.set_bind_group(1, material, &[]);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.num_elements, 0, draw.instances.clone());
        }
    }

    fn pipeline_target(&self, target: PassTarget) -> PipelineTarget {
        match target {
            PassTarget::Screen => PipelineTarget {
                colors: vec![self.surface_format],
                depth: false,
                blend: true,
            },
            PassTarget::Texture(handle) => {
                let target = &self.targets[handle.0];
                PipelineTarget {
                    colors: target.formats.clone(),
                    depth: target.depth.is_some(),
                    blend: false,
                }
            }
        }
    }

    fn record(
        &mut self,
        mesh: MeshHandle,
        program: ProgramHandle,
        textures: MaterialTextures,
        uniform: &DrawUniform,
        instances: &[InstanceRaw],
    ) {
        let Some(pass) = self.passes.last() else {
            log::error!("draw issued outside of a pass");
            return;
        };
        if mesh.0 >= self.meshes.len() || program.0 >= self.programs.len() {
            log::error!("draw in pass '{}' uses an unknown mesh or program", pass.label);
            return;
        }
        let target = self.pipeline_target(pass.target);
        let depth_test = self.depth_test && target.depth;

        let uniform_slot = (self.uniforms.len() as u64 / UNIFORM_SLOT) as u32;
        self.uniforms.extend_from_slice(bytemuck::bytes_of(uniform));
        self.uniforms
            .resize(self.uniforms.len() + (UNIFORM_SLOT - DrawUniform::SIZE) as usize, 0);

        let first = self.instances.len() as u32;
        if instances.is_empty() {
            self.instances.push(InstanceRaw::IDENTITY);
        } else {
            self.instances.extend_from_slice(instances);
        }
        let last = self.instances.len() as u32;

        if let Some(pass) = self.passes.last_mut() {
            pass.draws.push(RecordedDraw {
                mesh,
                pipeline: PipelineKey {
                    program,
                    target,
                    depth_test,
                },
                textures,
                uniform_slot,
                instances: first..last,
            });
        }
    }
}

fn mk_uniform_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    slots: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Draw Uniform Buffer"),
        size: slots * UNIFORM_SLOT,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(DrawUniform::SIZE),
            }),
        }],
        label: Some("draw_uniform_bind_group"),
    });
    (buffer, bind_group)
}

fn mk_instance_buffer(device: &wgpu::Device, instances: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: instances * std::mem::size_of::<InstanceRaw>() as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl RenderBackend for WgpuBackend {
    fn compile_shader(&mut self, name: &str, source: &str) -> anyhow::Result<ProgramHandle> {
        // Pipelines are built lazily, so a missing entry point would otherwise only show up mid-frame
        if !source.contains("fn vs_main") {
            anyhow::bail!("shader '{}' has no vs_main entry point", name);
        }
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(name),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        let handle = ProgramHandle(self.programs.len());
        self.programs.push(Program {
            name: name.to_string(),
            module,
        });
        log::info!("compiled shader {}", name);
        Ok(handle)
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle {
        let handle = MeshHandle(self.meshes.len());
        self.meshes.push(GpuMesh::upload(&self.device, mesh));
        handle
    }

    fn create_texture(&mut self, image: &DynamicImage, label: &str) -> anyhow::Result<TextureHandle> {
        let texture = Texture::from_image(&self.device, &self.queue, image, label)
            .with_context(|| format!("could not create texture '{}'", label))?;
        let handle = TextureHandle(self.textures.len());
        self.textures.push(texture);
        Ok(handle)
    }

    fn create_target(&mut self, desc: &TargetDesc) -> anyhow::Result<RenderTarget> {
        desc.validate(self.device.limits().max_texture_dimension_2d)?;
        let mut color = Vec::with_capacity(desc.color.len());
        let mut formats = Vec::with_capacity(desc.color.len());
        for (idx, format) in desc.color.iter().enumerate() {
            let texture = Texture::create_render_texture(
                &self.device,
                desc.size,
                *format,
                &format!("{} colour {}", desc.label, idx),
            );
            formats.push(texture::wgpu_format(*format));
            color.push(TextureHandle(self.textures.len()));
            self.textures.push(texture);
        }
        let depth = if desc.depth {
            let texture = Texture::create_depth_texture(
                &self.device,
                desc.size,
                &format!("{} depth", desc.label),
            );
            let handle = TextureHandle(self.textures.len());
            self.textures.push(texture);
            Some(handle)
        } else {
            None
        };
        let handle = TargetHandle(self.targets.len());
        self.targets.push(TargetResources {
            color: color.clone(),
            formats,
            depth,
        });
        log::info!(
            "created render target {} ({}x{})",
            desc.label,
            desc.size[0],
            desc.size[1]
        );
        Ok(RenderTarget {
            handle,
            size: desc.size,
            color,
            depth,
        })
    }

    fn begin_pass(&mut self, label: &str, target: PassTarget, clear: Clear) {
        if let PassTarget::Texture(handle) = target {
            if handle.0 >= self.targets.len() {
                log::error!("pass '{}' targets unknown render target {}", label, handle.0);
            }
        }
        self.passes.push(RecordedPass {
            label: label.to_string(),
            target,
            clear,
            draws: Vec::new(),
        });
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        self.record(
            call.mesh,
            call.program,
            call.textures,
            &call.uniform,
            call.instances,
        );
    }

    fn draw_fullscreen(&mut self, call: &FullscreenCall<'_>) {
        let textures = MaterialTextures {
            base: call.inputs[0],
            second: call.inputs[1],
            shadow: None,
        };
        let depth_test = self.depth_test;
        self.depth_test = false;
        self.record(
            self.fullscreen,
            call.program,
            textures,
            &DrawUniform::for_post(&call.params),
            &[],
        );
        self.depth_test = depth_test;
    }

    fn end_pass(&mut self) {
        if let Some(pass) = self.passes.last() {
            log::trace!("pass '{}' recorded {} draws", pass.label, pass.draws.len());
        }
    }
}
