//! Replays a recorded command list into a wgpu command encoder
//!
//! One bind group layout serves every material: source texture, two
//! samplers, a dynamic-offset slice of the shared globals buffer, and
//! four aux texture slots. Globals are packed per pass into a 1 KiB
//! slice so each pass reads the table state at its record point, not the
//! frame's final state. Pipelines compile lazily per (material, subpass,
//! target format) and are cached for the executor's lifetime.

use std::collections::HashMap;

use crate::binding::{BindingTable, ParamValue, TextureBinding};
use crate::command::{CommandList, ImageRef, MaterialId, PassStage};
use crate::core::error::Error;
use crate::gpu::backing::WgpuBacking;
use crate::gpu::material::{MaterialDesc, MaterialSet, AUX_TEXTURES, GLOBAL_SLOTS};
use crate::material::MaterialProvider;
use crate::target::pool::ScratchPool;

/// Bytes per globals slice, one per pass
pub const GLOBALS_SLICE_BYTES: u64 = (GLOBAL_SLOTS * 16) as u64;

/// Upper bound on material passes per submitted frame
pub const MAX_PASSES_PER_FRAME: u64 = 64;

/// Host-provided inputs for one execution
pub struct ExecuteInputs<'a> {
    /// The camera color target; stages address it as the source image
    pub source: &'a wgpu::TextureView,
    pub source_format: wgpu::TextureFormat,
    /// Linearized depth copy in a filterable format, bound under
    /// [`crate::frame::DEPTH_TEXTURE`]
    pub depth: Option<&'a wgpu::TextureView>,
    /// View-space normals, bound under [`crate::frame::NORMALS_TEXTURE`]
    pub normals: Option<&'a wgpu::TextureView>,
}

/// Pack a material's named globals into its uniform slice
///
/// Scalars land in `.x` of their slot; vectors fill the slot; arrays
/// occupy consecutive slots from theirs. Unset names leave zeroes, which
/// every built-in shader treats as the parameter's neutral value.
pub(crate) fn pack_globals(
    table: &BindingTable,
    params: &[(&str, u32)],
) -> [[f32; 4]; GLOBAL_SLOTS] {
    let mut out = [[0.0f32; 4]; GLOBAL_SLOTS];
    for &(name, slot) in params {
        let Some(value) = table.get(name) else {
            continue;
        };
        let slot = slot as usize;
        match value {
            ParamValue::Float(v) => out[slot][0] = *v,
            ParamValue::Int(v) => out[slot][0] = *v as f32,
            ParamValue::Bool(v) => out[slot][0] = if *v { 1.0 } else { 0.0 },
            ParamValue::Vec2(v) => out[slot][..2].copy_from_slice(&v.to_array()),
            ParamValue::Vec3(v) => out[slot][..3].copy_from_slice(&v.to_array()),
            ParamValue::Vec4(v) | ParamValue::Color(v) => out[slot] = v.to_array(),
            ParamValue::FloatArray(vs) => {
                for (i, v) in vs.iter().enumerate().take(GLOBAL_SLOTS - slot) {
                    out[slot + i][0] = *v;
                }
            }
            ParamValue::Vec4Array(vs) => {
                for (i, v) in vs.iter().enumerate().take(GLOBAL_SLOTS - slot) {
                    out[slot + i] = v.to_array();
                }
            }
        }
    }
    out
}

struct CompiledMaterial {
    desc: MaterialDesc,
    module: wgpu::ShaderModule,
}

/// wgpu executor for recorded command lists
///
/// Also the [`MaterialProvider`] the pipeline records against, so
/// resolution and execution agree on what exists.
pub struct WgpuExecutor {
    device: wgpu::Device,
    queue: wgpu::Queue,
    materials: MaterialSet,
    compiled: Vec<CompiledMaterial>,
    layout: wgpu::BindGroupLayout,
    pipelines: HashMap<(MaterialId, u32, wgpu::TextureFormat), wgpu::RenderPipeline>,
    sampler_linear: wgpu::Sampler,
    sampler_nearest: wgpu::Sampler,
    globals_buffer: wgpu::Buffer,
    neutral_black: wgpu::TextureView,
    blit: MaterialId,
}

impl WgpuExecutor {
    /// Build an executor with the built-in material set
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Result<Self, Error> {
        Self::with_materials(device, queue, MaterialSet::builtin())
    }

    pub fn with_materials(
        device: wgpu::Device,
        queue: wgpu::Queue,
        materials: MaterialSet,
    ) -> Result<Self, Error> {
        let mut compiled = Vec::with_capacity(materials.len());
        for index in 0..materials.len() {
            let desc = *materials
                .desc(MaterialId(index as u32))
                .ok_or_else(|| Error::MissingResource("material table hole".into()))?;
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.name),
                source: wgpu::ShaderSource::Wgsl(desc.source.into()),
            });
            compiled.push(CompiledMaterial { desc, module });
        }

        let blit = materials
            .resolve(crate::effects::fullscreen::DEFAULT_MATERIAL)
            .ok_or_else(|| Error::MissingResource("blit material".into()))?;

        let layout = create_shared_layout(&device);

        let sampler_linear = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("haze_linear"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let sampler_nearest = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("haze_nearest"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("haze_globals"),
            size: GLOBALS_SLICE_BYTES * MAX_PASSES_PER_FRAME,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let neutral_black = create_neutral_black(&device, &queue);

        Ok(Self {
            device,
            queue,
            materials,
            compiled,
            layout,
            pipelines: HashMap::new(),
            sampler_linear,
            sampler_nearest,
            globals_buffer,
            neutral_black,
            blit,
        })
    }

    pub fn materials(&self) -> &MaterialSet {
        &self.materials
    }

    /// Execute a recorded list against the pool's live backings
    ///
    /// Encodes every stage into one command buffer and submits it.
    pub fn execute(
        &mut self,
        cmds: &CommandList,
        pool: &ScratchPool,
        backing: &WgpuBacking,
        inputs: &ExecuteInputs<'_>,
    ) -> Result<(), Error> {
        let mut table = BindingTable::new();
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("haze_frame"),
            });
        let mut pass_index: u64 = 0;

        for stage in cmds.stages() {
            match stage {
                PassStage::SetGlobal { name, value } => {
                    table.set(name, value.clone());
                }
                PassStage::SetGlobalTexture { name, binding } => {
                    table.set_texture(name, *binding);
                }
                PassStage::Clear { dst, color } => {
                    let (view, _) = self.resolve_target(*dst, pool, backing, inputs)?;
                    clear_pass(&mut encoder, view, *color);
                }
                PassStage::Blit { src, dst, material } => {
                    let (material, subpass) = material.unwrap_or((self.blit, 0));
                    let src_view = self.resolve_source(*src, pool, backing, inputs)?;
                    self.encode_pass(
                        &mut encoder,
                        &table,
                        pool,
                        backing,
                        inputs,
                        src_view,
                        *dst,
                        material,
                        subpass,
                        &mut pass_index,
                    )?;
                }
                PassStage::Draw {
                    dst,
                    material,
                    subpass,
                } => {
                    // headless geometry stand-in: the surface material
                    // runs as a fullscreen pass reading the neutral source
                    let src_view = self.neutral_black.clone();
                    self.encode_pass(
                        &mut encoder,
                        &table,
                        pool,
                        backing,
                        inputs,
                        src_view,
                        *dst,
                        *material,
                        *subpass,
                        &mut pass_index,
                    )?;
                }
            }
        }

        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn resolve_source(
        &self,
        image: ImageRef,
        pool: &ScratchPool,
        backing: &WgpuBacking,
        inputs: &ExecuteInputs<'_>,
    ) -> Result<wgpu::TextureView, Error> {
        match image {
            ImageRef::SourceColor => Ok(inputs.source.clone()),
            ImageRef::Scratch(handle) => {
                let id = pool
                    .backing_of(handle)
                    .ok_or_else(|| Error::MissingResource(format!("stale handle {:?}", handle)))?;
                backing
                    .view(id)
                    .cloned()
                    .ok_or_else(|| Error::MissingResource(format!("backing {:?}", id)))
            }
        }
    }

    fn resolve_target(
        &self,
        image: ImageRef,
        pool: &ScratchPool,
        backing: &WgpuBacking,
        inputs: &ExecuteInputs<'_>,
    ) -> Result<(wgpu::TextureView, wgpu::TextureFormat), Error> {
        match image {
            ImageRef::SourceColor => Ok((inputs.source.clone(), inputs.source_format)),
            ImageRef::Scratch(handle) => {
                let id = pool
                    .backing_of(handle)
                    .ok_or_else(|| Error::MissingResource(format!("stale handle {:?}", handle)))?;
                let view = backing
                    .view(id)
                    .cloned()
                    .ok_or_else(|| Error::MissingResource(format!("backing {:?}", id)))?;
                let format = backing
                    .format(id)
                    .ok_or_else(|| Error::MissingResource(format!("backing {:?}", id)))?;
                Ok((view, format))
            }
        }
    }

    fn resolve_aux(
        &self,
        table: &BindingTable,
        name: &str,
        pool: &ScratchPool,
        backing: &WgpuBacking,
        inputs: &ExecuteInputs<'_>,
    ) -> wgpu::TextureView {
        if name == crate::frame::DEPTH_TEXTURE {
            if let Some(depth) = inputs.depth {
                return depth.clone();
            }
        }
        if name == crate::frame::NORMALS_TEXTURE {
            if let Some(normals) = inputs.normals {
                return normals.clone();
            }
        }
        match table.texture(name) {
            Some(TextureBinding::Scratch(handle)) => pool
                .backing_of(handle)
                .and_then(|id| backing.view(id).cloned())
                .unwrap_or_else(|| self.neutral_black.clone()),
            Some(TextureBinding::NeutralBlack) | None => self.neutral_black.clone(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn encode_pass(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        table: &BindingTable,
        pool: &ScratchPool,
        backing: &WgpuBacking,
        inputs: &ExecuteInputs<'_>,
        src_view: wgpu::TextureView,
        dst: ImageRef,
        material: MaterialId,
        subpass: u32,
        pass_index: &mut u64,
    ) -> Result<(), Error> {
        if *pass_index >= MAX_PASSES_PER_FRAME {
            return Err(Error::Gpu(format!(
                "more than {} material passes in one frame",
                MAX_PASSES_PER_FRAME
            )));
        }
        let (dst_view, dst_format) = self.resolve_target(dst, pool, backing, inputs)?;
        let desc = self
            .compiled
            .get(material.0 as usize)
            .map(|c| c.desc)
            .ok_or_else(|| Error::MissingResource(format!("material {:?}", material)))?;

        let offset = *pass_index * GLOBALS_SLICE_BYTES;
        let packed = pack_globals(table, desc.params);
        self.queue
            .write_buffer(&self.globals_buffer, offset, bytemuck::cast_slice(&packed));

        let aux: Vec<wgpu::TextureView> = (0..AUX_TEXTURES)
            .map(|i| match desc.textures.get(i) {
                Some(name) => self.resolve_aux(table, name, pool, backing, inputs),
                None => self.neutral_black.clone(),
            })
            .collect();

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(desc.name),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&src_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler_linear),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &self.globals_buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(GLOBALS_SLICE_BYTES),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&aux[0]),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&aux[1]),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(&aux[2]),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::TextureView(&aux[3]),
                },
                wgpu::BindGroupEntry {
                    binding: 7,
                    resource: wgpu::BindingResource::TextureView(&aux[4]),
                },
                wgpu::BindGroupEntry {
                    binding: 8,
                    resource: wgpu::BindingResource::TextureView(&aux[5]),
                },
                wgpu::BindGroupEntry {
                    binding: 9,
                    resource: wgpu::BindingResource::Sampler(&self.sampler_nearest),
                },
            ],
        });

        let pipeline = self.pipeline_for(material, subpass, dst_format)?;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(desc.name),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &dst_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[offset as u32]);
        pass.draw(0..3, 0..1);
        drop(pass);

        *pass_index += 1;
        Ok(())
    }

    fn pipeline_for(
        &mut self,
        material: MaterialId,
        subpass: u32,
        format: wgpu::TextureFormat,
    ) -> Result<&wgpu::RenderPipeline, Error> {
        let key = (material, subpass, format);
        if !self.pipelines.contains_key(&key) {
            let compiled = self
                .compiled
                .get(material.0 as usize)
                .ok_or_else(|| Error::MissingResource(format!("material {:?}", material)))?;
            let entry = compiled
                .desc
                .entry_points
                .get(subpass as usize)
                .ok_or_else(|| {
                    Error::MissingResource(format!(
                        "material '{}' has no subpass {}",
                        compiled.desc.name, subpass
                    ))
                })?;

            let layout = self
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(compiled.desc.name),
                    bind_group_layouts: &[&self.layout],
                    immediate_size: 0,
                });

            let pipeline = self
                .device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(compiled.desc.name),
                    layout: Some(&layout),
                    vertex: wgpu::VertexState {
                        module: &compiled.module,
                        entry_point: Some("vs_main"),
                        buffers: &[],
                        compilation_options: Default::default(),
                    },
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        ..Default::default()
                    },
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    fragment: Some(wgpu::FragmentState {
                        module: &compiled.module,
                        entry_point: Some(entry),
                        targets: &[Some(wgpu::ColorTargetState {
                            format,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    multiview_mask: None,
                    cache: None,
                });
            self.pipelines.insert(key, pipeline);
        }
        Ok(&self.pipelines[&key])
    }
}

impl MaterialProvider for WgpuExecutor {
    fn resolve(&self, name: &str) -> Option<MaterialId> {
        self.materials.resolve(name)
    }
}

fn create_shared_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("haze_shared_layout"),
        entries: &[
            texture_entry(0),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(GLOBALS_SLICE_BYTES),
                },
                count: None,
            },
            texture_entry(3),
            texture_entry(4),
            texture_entry(5),
            texture_entry(6),
            texture_entry(7),
            texture_entry(8),
            wgpu::BindGroupLayoutEntry {
                binding: 9,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

fn clear_pass(encoder: &mut wgpu::CommandEncoder, view: wgpu::TextureView, color: [f32; 4]) {
    // an empty pass whose load op does the clear
    let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("haze_clear"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color {
                    r: color[0] as f64,
                    g: color[1] as f64,
                    b: color[2] as f64,
                    a: color[3] as f64,
                }),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
}

fn create_neutral_black(device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("haze_neutral_black"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &[0u8, 0, 0, 255],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: None,
        },
        wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
