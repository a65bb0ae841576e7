use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::coords::IVec2;
use crate::paint::Rgba;
use crate::render::{
    BufferHandle, BufferInit, BufferKind, CompiledShader, GraphicsApi, ProgramHandle,
    RenderError, RenderResult, ResourceKind, ShaderSource, ShaderStage, TextureHandle,
    TextureSampling, UniformLocation, UniformValue, VertexArrayHandle,
};

use super::reflect::{scan_bindings, Binding, BindingKind};

/// Pixel format of every texture created here. Image data is sRGB-encoded.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

struct BufferEntry {
    buffer: wgpu::Buffer,
    kind: BufferKind,
}

struct VertexArrayEntry {
    array_stride: u64,
    step_mode: wgpu::VertexStepMode,
    attributes: Vec<wgpu::VertexAttribute>,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    index_format: wgpu::IndexFormat,
}

/// Reflected binding plus the state the caller attached to it.
struct Slot {
    binding: Binding,
    /// Last value set on a plain uniform; texture unit for textures.
    value: Option<UniformValue>,
    /// Buffer attached to a uniform block.
    block_buffer: Option<BufferHandle>,
    /// Slot index of the texture a sampler samples.
    sampled_texture: Option<usize>,
}

struct ProgramEntry {
    label: String,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    slots: Vec<Slot>,
    /// Indexed by bind group number; gaps hold empty layouts.
    group_layouts: Vec<wgpu::BindGroupLayout>,
    pipeline_layout: wgpu::PipelineLayout,
}

struct TextureEntry {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

/// Frame currently being recorded.
struct FrameTarget {
    view: wgpu::TextureView,
    size: IVec2,
    encoder: wgpu::CommandEncoder,
}

/// [`GraphicsApi`] backed by a wgpu device.
///
/// Emulates a bind-to-draw context on top of wgpu: bindings and uniform values
/// are remembered here and resolved into bind groups when a draw is issued.
/// Every draw records its own render pass into the current frame's encoder and
/// allocates fresh uniform buffers, so a draw never observes a later uniform
/// update. Buffer updates made while a frame is open (the camera block in
/// `begin_scene`) are recorded as copies between passes with the same effect.
///
/// Draws outside `begin_frame`/`finish_frame` are dropped with a warning.
pub struct WgpuApi {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target_format: wgpu::TextureFormat,

    next_handle: u32,
    buffers: HashMap<BufferHandle, BufferEntry>,
    vertex_arrays: HashMap<VertexArrayHandle, VertexArrayEntry>,
    programs: HashMap<ProgramHandle, ProgramEntry>,
    textures: HashMap<TextureHandle, TextureEntry>,
    pipelines: HashMap<(ProgramHandle, VertexArrayHandle), wgpu::RenderPipeline>,

    bound_program: ProgramHandle,
    bound_vertex_array: VertexArrayHandle,
    texture_units: HashMap<u32, TextureHandle>,

    clear_color: wgpu::Color,
    /// Viewport as (size, bottom-left anchor) in target pixels.
    viewport: Option<(IVec2, IVec2)>,
    frame: Option<FrameTarget>,
}

impl WgpuApi {
    /// Creates a command surface drawing into targets of `target_format`.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, target_format: wgpu::TextureFormat) -> Self {
        Self {
            device,
            queue,
            target_format,
            next_handle: 1,
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            pipelines: HashMap::new(),
            bound_program: ProgramHandle::NONE,
            bound_vertex_array: VertexArrayHandle::NONE,
            texture_units: HashMap::new(),
            clear_color: wgpu::Color::BLACK,
            viewport: None,
            frame: None,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Starts recording a frame that draws into `view` (`size` pixels).
    ///
    /// An unfinished previous frame is discarded.
    pub fn begin_frame(&mut self, view: wgpu::TextureView, size: IVec2) {
        if self.frame.is_some() {
            log::warn!("begin_frame while a frame is being recorded; previous frame discarded");
        }
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tessel frame encoder"),
            });
        self.frame = Some(FrameTarget { view, size, encoder });
    }

    /// Ends the current frame and returns its commands for submission.
    pub fn finish_frame(&mut self) -> Option<wgpu::CommandBuffer> {
        self.frame.take().map(|frame| frame.encoder.finish())
    }

    /// Number of live GPU objects.
    pub fn live_count(&self) -> usize {
        self.buffers.len() + self.vertex_arrays.len() + self.programs.len() + self.textures.len()
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    fn sampler(&self, sampling: TextureSampling) -> wgpu::Sampler {
        self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tessel texture sampler"),
            address_mode_u: sampling.address_mode,
            address_mode_v: sampling.address_mode,
            address_mode_w: sampling.address_mode,
            mag_filter: sampling.filter,
            min_filter: sampling.filter,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        })
    }

    fn compile_module(&self, label: &str, stage: ShaderStage, source: &str) -> RenderResult<wgpu::ShaderModule> {
        let entry_attribute = match stage {
            ShaderStage::Vertex => "@vertex",
            ShaderStage::Fragment => "@fragment",
        };
        if !source.contains(entry_attribute) {
            return Err(RenderError::ShaderCompilation {
                stage,
                message: format!("no `{entry_attribute}` entry point"),
            });
        }

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let info = pollster::block_on(module.get_compilation_info());
        let errors: Vec<String> = info
            .messages
            .iter()
            .filter(|m| matches!(m.message_type, wgpu::CompilationMessageType::Error))
            .map(|m| match &m.location {
                Some(loc) => format!("{}:{}: {}", loc.line_number, loc.line_position, m.message),
                None => m.message.clone(),
            })
            .collect();

        if errors.is_empty() {
            Ok(module)
        } else {
            Err(RenderError::ShaderCompilation {
                stage,
                message: errors.join("\n"),
            })
        }
    }

    fn pipeline(&mut self, program: ProgramHandle, vertex_array: VertexArrayHandle) -> Option<&wgpu::RenderPipeline> {
        if !self.pipelines.contains_key(&(program, vertex_array)) {
            let prog = self.programs.get(&program)?;
            let vao = self.vertex_arrays.get(&vertex_array)?;

            let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(prog.label.as_str()),
                layout: Some(&prog.pipeline_layout),

                vertex: wgpu::VertexState {
                    module: &prog.vertex,
                    entry_point: None,
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: vao.array_stride,
                        step_mode: vao.step_mode,
                        attributes: &vao.attributes,
                    }],
                },

                fragment: Some(wgpu::FragmentState {
                    module: &prog.fragment,
                    entry_point: None,
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.target_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

            log::debug!("pipeline created for program {program:?} / vertex array {vertex_array:?}");
            self.pipelines.insert((program, vertex_array), pipeline);
        }
        self.pipelines.get(&(program, vertex_array))
    }

    /// Resolves the bound program's slots into bind groups.
    ///
    /// Returns `None` (after logging) when a block buffer or texture is missing.
    fn bind_groups(&self, program: &ProgramEntry) -> Option<Vec<wgpu::BindGroup>> {
        // Plain uniforms get a buffer each, created before any entry borrows them.
        let uniform_buffers: Vec<Option<wgpu::Buffer>> = program
            .slots
            .iter()
            .map(|slot| {
                let size = slot.binding.kind.uniform_size()?;
                let mut bytes = vec![0u8; size as usize];
                if let Some(value) = slot.value {
                    let encoded = encode_uniform(value);
                    let n = encoded.len().min(bytes.len());
                    bytes[..n].copy_from_slice(&encoded[..n]);
                }
                Some(
                    self.device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some(slot.binding.name.as_str()),
                            contents: &bytes,
                            usage: wgpu::BufferUsages::UNIFORM,
                        }),
                )
            })
            .collect();

        let mut groups = Vec::with_capacity(program.group_layouts.len());
        for (group, layout) in program.group_layouts.iter().enumerate() {
            let mut entries = Vec::new();
            for (i, slot) in program.slots.iter().enumerate() {
                if slot.binding.group as usize != group {
                    continue;
                }
                let resource = match slot.binding.kind {
                    BindingKind::Block => {
                        let buffer = slot
                            .block_buffer
                            .and_then(|h| self.buffers.get(&h))
                            .map(|e| &e.buffer);
                        let Some(buffer) = buffer else {
                            log::warn!("uniform block `{}` has no buffer; draw skipped", slot.binding.name);
                            return None;
                        };
                        buffer.as_entire_binding()
                    }
                    BindingKind::Texture => {
                        let texture = self.slot_texture(slot)?;
                        wgpu::BindingResource::TextureView(&texture.view)
                    }
                    BindingKind::Sampler => {
                        let texture = slot
                            .sampled_texture
                            .and_then(|t| program.slots.get(t))
                            .and_then(|t| self.slot_texture(t));
                        let Some(texture) = texture else {
                            log::warn!("sampler `{}` has no texture; draw skipped", slot.binding.name);
                            return None;
                        };
                        wgpu::BindingResource::Sampler(&texture.sampler)
                    }
                    _ => uniform_buffers[i].as_ref()?.as_entire_binding(),
                };
                entries.push(wgpu::BindGroupEntry {
                    binding: slot.binding.binding,
                    resource,
                });
            }

            groups.push(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("tessel draw bind group"),
                layout,
                entries: &entries,
            }));
        }
        Some(groups)
    }

    fn slot_texture(&self, slot: &Slot) -> Option<&TextureEntry> {
        let unit = match slot.value {
            Some(UniformValue::Int(unit)) => u32::try_from(unit).ok()?,
            _ => 0,
        };
        let entry = self
            .texture_units
            .get(&unit)
            .and_then(|handle| self.textures.get(handle));
        if entry.is_none() {
            log::warn!("no texture bound to unit {unit} for `{}`; draw skipped", slot.binding.name);
        }
        entry
    }
}

/// Bytes of `value` in uniform-buffer layout.
/// How a buffer update reaches the GPU.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum UploadRoute {
    /// `queue.write_buffer`: applied before the next submission runs.
    Queue,
    /// Staging copy recorded into the frame encoder, ordered between its passes.
    Encoder,
}

/// Updates issued while a frame is recorded go through the encoder so a
/// pass recorded earlier still reads the old contents. `None` when the
/// range breaks copy alignment.
fn upload_route(frame_open: bool, offset: u64, len: u64) -> Option<UploadRoute> {
    if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || len % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
        return None;
    }
    Some(if frame_open { UploadRoute::Encoder } else { UploadRoute::Queue })
}

fn encode_uniform(value: UniformValue) -> Vec<u8> {
    match value {
        UniformValue::Mat3(cols) => bytemuck::cast_slice(&crate::render::uniforms::pad_mat3(&cols)).to_vec(),
        UniformValue::Vec4(v) => bytemuck::cast_slice(&v).to_vec(),
        UniformValue::Float(f) => bytemuck::bytes_of(&f).to_vec(),
        UniformValue::Int(i) => bytemuck::bytes_of(&i).to_vec(),
    }
}

fn layout_entry(binding: &Binding) -> wgpu::BindGroupLayoutEntry {
    let ty = match binding.kind {
        BindingKind::Texture => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        BindingKind::Sampler => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        _ => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
    };
    wgpu::BindGroupLayoutEntry {
        binding: binding.binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty,
        count: None,
    }
}

/// Merges both stages' bindings; a binding declared by both stages appears once.
fn merge_slots(vertex: Vec<Binding>, fragment: Vec<Binding>) -> Vec<Slot> {
    let mut slots: Vec<Slot> = Vec::new();
    for binding in vertex.into_iter().chain(fragment) {
        if slots
            .iter()
            .any(|s| s.binding.group == binding.group && s.binding.binding == binding.binding)
        {
            continue;
        }
        let sampled_texture = match binding.kind {
            BindingKind::Sampler => slots
                .iter()
                .rposition(|s| s.binding.kind == BindingKind::Texture && s.binding.group == binding.group),
            _ => None,
        };
        slots.push(Slot {
            binding,
            value: None,
            block_buffer: None,
            sampled_texture,
        });
    }
    slots
}

impl GraphicsApi for WgpuApi {
    fn create_buffer(&mut self, kind: BufferKind, init: BufferInit<'_>) -> RenderResult<BufferHandle> {
        if init.size() == 0 {
            return Err(RenderError::ResourceCreation {
                kind: kind.resource_kind(),
                reason: "zero-sized buffer".to_string(),
            });
        }

        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
            BufferKind::Uniform => wgpu::BufferUsages::UNIFORM,
        } | wgpu::BufferUsages::COPY_DST;

        let label = kind.resource_kind().to_string();
        let buffer = match init {
            BufferInit::Static(contents) => self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label.as_str()),
                    contents,
                    usage,
                }),
            BufferInit::Dynamic { size } => self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label.as_str()),
                size,
                usage,
                mapped_at_creation: false,
            }),
        };

        let handle = BufferHandle(self.allocate());
        self.buffers.insert(handle, BufferEntry { buffer, kind });
        Ok(handle)
    }

    fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        let Some(entry) = self.buffers.get(&buffer) else {
            log::warn!("update of unknown buffer {buffer:?}");
            return;
        };
        let len = data.len() as u64;

        match upload_route(self.frame.is_some(), offset, len) {
            Some(UploadRoute::Queue) => self.queue.write_buffer(&entry.buffer, offset, data),
            Some(UploadRoute::Encoder) => {
                let Some(frame) = self.frame.as_mut() else { return };
                let staging = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("tessel staging"),
                    contents: data,
                    usage: wgpu::BufferUsages::COPY_SRC,
                });
                frame
                    .encoder
                    .copy_buffer_to_buffer(&staging, 0, &entry.buffer, offset, len);
            }
            None => log::warn!("update of {buffer:?} at {offset}+{len} is not 4-byte aligned; dropped"),
        }
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(entry) = self.buffers.remove(&buffer) {
            entry.buffer.destroy();
        }
    }

    fn create_vertex_array(
        &mut self,
        layout: &wgpu::VertexBufferLayout<'static>,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        index_format: wgpu::IndexFormat,
    ) -> RenderResult<VertexArrayHandle> {
        let kind_of = |h: BufferHandle| self.buffers.get(&h).map(|e| e.kind);
        if kind_of(vertex_buffer) != Some(BufferKind::Vertex) || kind_of(index_buffer) != Some(BufferKind::Index) {
            return Err(RenderError::ResourceCreation {
                kind: ResourceKind::VertexArray,
                reason: format!("{vertex_buffer:?}/{index_buffer:?} are not a live vertex/index buffer pair"),
            });
        }

        let handle = VertexArrayHandle(self.allocate());
        self.vertex_arrays.insert(
            handle,
            VertexArrayEntry {
                array_stride: layout.array_stride,
                step_mode: layout.step_mode,
                attributes: layout.attributes.to_vec(),
                vertex_buffer,
                index_buffer,
                index_format,
            },
        );
        Ok(handle)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        if self.vertex_arrays.remove(&vertex_array).is_some() {
            self.pipelines.retain(|(_, vao), _| *vao != vertex_array);
            if self.bound_vertex_array == vertex_array {
                self.bound_vertex_array = VertexArrayHandle::NONE;
            }
        }
    }

    fn create_shader(&mut self, source: &ShaderSource) -> RenderResult<CompiledShader> {
        let vertex = self.compile_module(&source.label, ShaderStage::Vertex, &source.vertex)?;
        let fragment = self.compile_module(&source.label, ShaderStage::Fragment, &source.fragment)?;

        let slots = merge_slots(scan_bindings(&source.vertex), scan_bindings(&source.fragment));

        let group_count = slots.iter().map(|s| s.binding.group + 1).max().unwrap_or(0);
        let max_groups = self.device.limits().max_bind_groups;
        if group_count > max_groups {
            return Err(RenderError::UnsupportedBackend(format!(
                "`{}` uses {group_count} bind groups, device allows {max_groups}",
                source.label
            )));
        }
        let group_layouts: Vec<wgpu::BindGroupLayout> = (0..group_count)
            .map(|group| {
                let entries: Vec<_> = slots
                    .iter()
                    .filter(|s| s.binding.group == group)
                    .map(|s| layout_entry(&s.binding))
                    .collect();
                self.device
                    .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some("tessel bind group layout"),
                        entries: &entries,
                    })
            })
            .collect();

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(source.label.as_ref()),
                bind_group_layouts: &group_layouts.iter().collect::<Vec<_>>(),
                immediate_size: 0,
            });

        let uniform_locations = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !matches!(s.binding.kind, BindingKind::Block | BindingKind::Sampler))
            .map(|(i, s)| (s.binding.name.clone(), UniformLocation(i as i32)))
            .collect();

        let handle = ProgramHandle(self.allocate());
        log::debug!("shader `{}` compiled as {handle:?} ({} bindings)", source.label, slots.len());
        self.programs.insert(
            handle,
            ProgramEntry {
                label: source.label.to_string(),
                vertex,
                fragment,
                slots,
                group_layouts,
                pipeline_layout,
            },
        );
        Ok(CompiledShader::new(handle, uniform_locations))
    }

    fn delete_shader(&mut self, program: ProgramHandle) {
        if self.programs.remove(&program).is_some() {
            self.pipelines.retain(|(p, _), _| *p != program);
            if self.bound_program == program {
                self.bound_program = ProgramHandle::NONE;
            }
        }
    }

    fn bind_uniform_block(&mut self, program: ProgramHandle, block_name: &str, binding: u32, buffer: BufferHandle) {
        let Some(entry) = self.programs.get_mut(&program) else {
            log::warn!("bind_uniform_block on unknown program {program:?}");
            return;
        };
        match entry
            .slots
            .iter_mut()
            .find(|s| s.binding.kind == BindingKind::Block && s.binding.name == block_name)
        {
            Some(slot) => {
                if slot.binding.binding != binding {
                    log::debug!(
                        "block `{block_name}` is declared at binding {}, not {binding}; using the declaration",
                        slot.binding.binding
                    );
                }
                slot.block_buffer = Some(buffer);
            }
            None => log::trace!("program {program:?} does not declare block `{block_name}`"),
        }
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.bound_program = program;
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let slot = self
            .programs
            .get_mut(&self.bound_program)
            .and_then(|p| usize::try_from(location.0).ok().and_then(|i| p.slots.get_mut(i)));
        match slot {
            Some(slot) => slot.value = Some(value),
            None => log::warn!("set_uniform({location:?}) without a matching program bound"),
        }
    }

    fn create_texture(
        &mut self,
        size: IVec2,
        pixels: Option<&[u8]>,
        sampling: TextureSampling,
    ) -> RenderResult<TextureHandle> {
        let max = self.device.limits().max_texture_dimension_2d;
        let (width, height) = match (u32::try_from(size.x), u32::try_from(size.y)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 && w <= max && h <= max => (w, h),
            _ => {
                return Err(RenderError::ResourceCreation {
                    kind: ResourceKind::Texture,
                    reason: format!("invalid size {}x{} (max {max})", size.x, size.y),
                });
            }
        };
        if let Some(px) = pixels {
            let expected = width as usize * height as usize * 4;
            if px.len() != expected {
                return Err(RenderError::ResourceCreation {
                    kind: ResourceKind::Texture,
                    reason: format!("expected {expected} bytes of RGBA8, got {}", px.len()),
                });
            }
        }

        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tessel texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        if let Some(px) = pixels {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                px,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(width * 4),
                    rows_per_image: Some(height),
                },
                extent,
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.sampler(sampling);

        let handle = TextureHandle(self.allocate());
        self.textures.insert(handle, TextureEntry { texture, view, sampler });
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if let Some(entry) = self.textures.remove(&texture) {
            entry.texture.destroy();
            self.texture_units.retain(|_, t| *t != texture);
        }
    }

    fn set_texture_sampling(&mut self, texture: TextureHandle, sampling: TextureSampling) {
        let sampler = self.sampler(sampling);
        match self.textures.get_mut(&texture) {
            Some(entry) => entry.sampler = sampler,
            None => log::warn!("set_texture_sampling on unknown texture {texture:?}"),
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        if texture.is_none() {
            self.texture_units.remove(&unit);
        } else {
            self.texture_units.insert(unit, texture);
        }
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.bound_vertex_array = vertex_array;
    }

    fn draw_indexed(&mut self, index_count: u32) {
        if self.frame.is_none() {
            log::warn!("draw_indexed outside a frame; dropped");
            return;
        }
        let (program, vertex_array) = (self.bound_program, self.bound_vertex_array);
        if self.pipeline(program, vertex_array).is_none() {
            log::warn!("draw_indexed without a live program and vertex array bound; dropped");
            return;
        }

        let Some(prog) = self.programs.get(&program) else { return };
        let Some(groups) = self.bind_groups(prog) else { return };
        let Some(vao) = self.vertex_arrays.get(&vertex_array) else { return };
        let (Some(vbo), Some(ibo)) = (self.buffers.get(&vao.vertex_buffer), self.buffers.get(&vao.index_buffer)) else {
            log::warn!("vertex array {vertex_array:?} references released buffers; draw dropped");
            return;
        };
        let Some(pipeline) = self.pipelines.get(&(program, vertex_array)) else { return };
        let Some(frame) = self.frame.as_mut() else { return };

        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tessel quad pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
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

        if let Some((size, anchor)) = self.viewport {
            // Anchor is bottom-left; wgpu viewports are anchored top-left.
            let top = frame.size.y - (anchor.y + size.y);
            if anchor.x >= 0 && top >= 0 && anchor.x + size.x <= frame.size.x {
                rpass.set_viewport(anchor.x as f32, top as f32, size.x as f32, size.y as f32, 0.0, 1.0);
            } else {
                log::debug!("viewport exceeds the frame target; drawing to the full target");
            }
        }

        rpass.set_pipeline(pipeline);
        for (i, group) in groups.iter().enumerate() {
            rpass.set_bind_group(i as u32, group, &[]);
        }
        rpass.set_vertex_buffer(0, vbo.buffer.slice(..));
        rpass.set_index_buffer(ibo.buffer.slice(..), vao.index_format);
        rpass.draw_indexed(0..index_count, 0, 0..1);
    }

    fn set_clear_color(&mut self, color: Rgba) {
        let [r, g, b, a] = color.unpack();
        self.clear_color = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        };
    }

    fn clear(&mut self) {
        let Some(frame) = self.frame.as_mut() else {
            log::warn!("clear outside a frame; dropped");
            return;
        };
        let _ = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tessel clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
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

    fn set_viewport(&mut self, size: IVec2, anchor_bottom_left: IVec2) {
        if size.x <= 0 || size.y <= 0 {
            log::warn!("ignoring empty viewport {}x{}", size.x, size.y);
            return;
        }
        self.viewport = Some((size, anchor_bottom_left));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::ShaderSource;

    #[test]
    fn quad_shader_slots_merge_both_stages() {
        let source = ShaderSource::quad();
        let slots = merge_slots(scan_bindings(&source.vertex), scan_bindings(&source.fragment));
        let names: Vec<_> = slots.iter().map(|s| s.binding.name.as_str()).collect();
        assert_eq!(
            names,
            ["Camera", "uModel", "uTextureTransform", "u_depth", "uTintColor", "uTex2d", "uTex2d_sampler"]
        );

        let sampler = slots.last().unwrap();
        assert_eq!(sampler.sampled_texture, Some(5));
    }

    #[test]
    fn shared_bindings_appear_once() {
        let decl = "@group(0) @binding(0) var<uniform> Camera: CameraBlock;";
        let slots = merge_slots(scan_bindings(decl), scan_bindings(decl));
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn uniform_encoding_pads_mat3_columns() {
        let bytes = encode_uniform(UniformValue::Mat3([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]));
        assert_eq!(bytes.len(), 48);
        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(&floats[4..8], &[4.0, 5.0, 6.0, 0.0]);

        assert_eq!(encode_uniform(UniformValue::Float(0.5)).len(), 4);
        assert_eq!(encode_uniform(UniformValue::Vec4([0.0; 4])).len(), 16);
    }

    #[test]
    fn camera_updates_inside_a_frame_are_recorded_in_order() {
        let camera_block = crate::render::uniforms::CAMERA_BLOCK_SIZE;
        assert_eq!(upload_route(true, 0, camera_block), Some(UploadRoute::Encoder));
        assert_eq!(upload_route(false, 0, camera_block), Some(UploadRoute::Queue));
    }

    #[test]
    fn misaligned_updates_are_rejected() {
        assert_eq!(upload_route(true, 2, 16), None);
        assert_eq!(upload_route(false, 0, 6), None);
    }
}
