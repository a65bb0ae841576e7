use crate::coords::Affine2DMatrix;

use super::api::{
    BufferHandle, BufferInit, BufferKind, GraphicsApi, ProgramHandle, SharedApi, UniformValue,
    VertexArrayHandle,
};
use super::error::{RenderError, RenderResult};
use super::quad::{QuadVertex, QUAD_INDEX_COUNT, QUAD_INDEX_FORMAT, QUAD_INDICES, QUAD_VERTICES};
use super::renderer2d::{QuadDraw, Renderer2D, RendererConfig, SceneState};
use super::resource::{GpuBuffer, GpuProgram, GpuVertexArray};
use super::shader::{names, CompiledShader};
use super::uniforms::{camera_block, texture_transform, to_matrix_layout, CAMERA_BLOCK_SIZE};

/// Texture unit every quad samples from.
const QUAD_TEXTURE_UNIT: u32 = 0;

/// GPU objects owned by an initialized renderer.
///
/// Field order is drop order: the vertex array goes before the buffers it references.
struct QuadResources {
    vertex_array: GpuVertexArray,
    vertex_buffer: GpuBuffer,
    index_buffer: GpuBuffer,
    camera_buffer: GpuBuffer,
    program: GpuProgram,
}

impl QuadResources {
    fn create(api: &SharedApi, config: &RendererConfig) -> RenderResult<Self> {
        let program = GpuProgram::new(api, &config.shader)?;

        let vertex_buffer = GpuBuffer::new(
            api,
            BufferKind::Vertex,
            BufferInit::Static(bytemuck::cast_slice(&QUAD_VERTICES)),
        )?;
        let index_buffer = GpuBuffer::new(
            api,
            BufferKind::Index,
            BufferInit::Static(bytemuck::cast_slice(&QUAD_INDICES)),
        )?;
        let vertex_array = GpuVertexArray::new(
            api,
            &QuadVertex::layout(),
            &vertex_buffer,
            &index_buffer,
            QUAD_INDEX_FORMAT,
        )?;

        let camera_buffer = GpuBuffer::new(
            api,
            BufferKind::Uniform,
            BufferInit::Dynamic { size: CAMERA_BLOCK_SIZE },
        )?;
        api.borrow_mut().bind_uniform_block(
            program.handle(),
            names::CAMERA_BLOCK,
            config.camera_binding,
            camera_buffer.handle(),
        );

        Ok(Self {
            vertex_array,
            vertex_buffer,
            index_buffer,
            camera_buffer,
            program,
        })
    }

    fn handles(&self) -> QuadHandles {
        QuadHandles {
            vertex_array: self.vertex_array.handle(),
            vertex_buffer: self.vertex_buffer.handle(),
            index_buffer: self.index_buffer.handle(),
            camera_buffer: self.camera_buffer.handle(),
            program: self.program.handle(),
        }
    }
}

/// Snapshot of the handles a renderer currently owns.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct QuadHandles {
    pub vertex_array: VertexArrayHandle,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub camera_buffer: BufferHandle,
    pub program: ProgramHandle,
}

impl QuadHandles {
    /// True when every handle is the "no resource" sentinel.
    pub fn is_unset(&self) -> bool {
        *self == QuadHandles::default()
    }
}

/// Renderer issuing one indexed draw per quad.
///
/// Owns its shader program, quad buffers, vertex array and camera buffer.
/// Textures are borrowed per draw and never released here.
pub struct ImmediateRenderer2D {
    api: SharedApi,
    config: RendererConfig,
    resources: Option<QuadResources>,
    state: SceneState,
    view_projection: Affine2DMatrix,
}

impl ImmediateRenderer2D {
    pub fn new(api: SharedApi, config: RendererConfig) -> Self {
        Self {
            api,
            config,
            resources: None,
            state: SceneState::Uninitialized,
            view_projection: Affine2DMatrix::identity(),
        }
    }

    /// Moves every GPU handle into a new renderer, leaving `self` uninitialized
    /// with no resources, so shutting `self` down afterwards touches nothing.
    pub fn take(&mut self) -> Self {
        Self {
            api: self.api.clone(),
            config: self.config.clone(),
            resources: self.resources.take(),
            state: std::mem::take(&mut self.state),
            view_projection: std::mem::take(&mut self.view_projection),
        }
    }

    pub fn handles(&self) -> QuadHandles {
        self.resources
            .as_ref()
            .map(QuadResources::handles)
            .unwrap_or_default()
    }

    /// Camera of the current (or most recent) scene.
    pub fn view_projection(&self) -> &Affine2DMatrix {
        &self.view_projection
    }

    /// Uniform map of the owned program, if initialized.
    pub fn shader(&self) -> Option<&CompiledShader> {
        self.resources.as_ref().map(|r| r.program.shader())
    }

    fn reject(&self, operation: &'static str) -> RenderError {
        log::warn!("rejected `{operation}`: renderer is {}", self.state);
        RenderError::InvalidState {
            operation,
            state: self.state,
        }
    }

    fn expect_state(&self, expected: SceneState, operation: &'static str) -> RenderResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.reject(operation))
        }
    }
}

/// Uploads `value` if the program declares `name`.
fn set_uniform_if_declared(
    api: &mut dyn GraphicsApi,
    shader: &CompiledShader,
    name: &str,
    value: UniformValue,
) {
    match shader.location(name) {
        Some(location) => api.set_uniform(location, value),
        None => log::trace!("program does not declare `{name}`; skipped"),
    }
}

impl Renderer2D for ImmediateRenderer2D {
    fn init(&mut self) -> RenderResult<()> {
        self.expect_state(SceneState::Uninitialized, "init")?;

        let resources = QuadResources::create(&self.api, &self.config)?;
        log::debug!(
            "immediate renderer initialized ({} uniforms declared)",
            resources.program.shader().uniform_locations.len()
        );

        self.resources = Some(resources);
        self.state = SceneState::Ready;
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(resources) = self.resources.take() {
            drop(resources);
            log::debug!("immediate renderer shut down");
        }
        self.state = SceneState::Uninitialized;
        self.view_projection.reset();
    }

    fn begin_scene(&mut self, view_projection: &Affine2DMatrix) -> RenderResult<()> {
        self.expect_state(SceneState::Ready, "begin_scene")?;
        let Some(resources) = self.resources.as_ref() else {
            return Err(self.reject("begin_scene"));
        };

        self.view_projection = *view_projection;
        resources
            .camera_buffer
            .write(0, bytemuck::bytes_of(&camera_block(view_projection)));

        self.state = SceneState::InScene;
        Ok(())
    }

    fn end_scene(&mut self) -> RenderResult<()> {
        self.expect_state(SceneState::InScene, "end_scene")?;
        self.state = SceneState::Ready;
        Ok(())
    }

    fn draw_quad(&mut self, quad: &QuadDraw) -> RenderResult<()> {
        self.expect_state(SceneState::InScene, "draw_quad")?;
        let Some(resources) = self.resources.as_ref() else {
            return Err(self.reject("draw_quad"));
        };

        let shader = resources.program.shader();
        let mut api = self.api.borrow_mut();

        api.use_program(shader.program);

        set_uniform_if_declared(
            &mut *api,
            shader,
            names::MODEL,
            UniformValue::Mat3(to_matrix_layout(&quad.transform)),
        );
        set_uniform_if_declared(
            &mut *api,
            shader,
            names::TEXTURE_TRANSFORM,
            UniformValue::Mat3(texture_transform(quad.uv_bottom_left, quad.uv_top_right)),
        );
        set_uniform_if_declared(&mut *api, shader, names::DEPTH, UniformValue::Float(0.0));
        set_uniform_if_declared(
            &mut *api,
            shader,
            names::TINT_COLOR,
            UniformValue::Vec4(quad.tint.unpack()),
        );
        set_uniform_if_declared(
            &mut *api,
            shader,
            names::TEXTURE,
            UniformValue::Int(QUAD_TEXTURE_UNIT as i32),
        );

        api.bind_texture(QUAD_TEXTURE_UNIT, quad.texture);
        api.bind_vertex_array(resources.vertex_array.handle());
        api.draw_indexed(QUAD_INDEX_COUNT);
        api.bind_vertex_array(VertexArrayHandle::NONE);

        Ok(())
    }

    fn state(&self) -> SceneState {
        self.state
    }
}

impl Drop for ImmediateRenderer2D {
    fn drop(&mut self) {
        self.shutdown();
    }
}
