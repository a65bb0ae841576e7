//! Renderer lifecycle driven against the recording backend.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;

use tessel_engine::backend::{GpuCall, RecordingApi};
use tessel_engine::coords::{Affine2DMatrix, IVec2, Vec2, Viewport};
use tessel_engine::paint::Rgba;
use tessel_engine::render::{
    camera_block, create_renderer, share, ImmediateRenderer2D, QuadDraw, RenderError, Renderer2D,
    RendererConfig, RendererKind, ResourceKind, SceneState, SharedApi, TextureHandle,
    UniformValue,
};
use tessel_engine::texture::Texture;

fn recording() -> (Rc<RefCell<RecordingApi>>, SharedApi) {
    share(RecordingApi::new())
}

fn ready(api: &SharedApi) -> ImmediateRenderer2D {
    let mut r = ImmediateRenderer2D::new(api.clone(), RendererConfig::default());
    r.init().unwrap();
    r
}

fn quad_at(x: f64, y: f64) -> QuadDraw {
    QuadDraw::new(Affine2DMatrix::translation(Vec2::new(x, y)), TextureHandle(77))
}

#[test]
fn init_creates_five_objects() {
    let (rec, api) = recording();
    let r = ready(&api);

    assert_eq!(r.state(), SceneState::Ready);
    assert_eq!(rec.borrow().live_count(), 5);

    let h = r.handles();
    assert!(h.program.is_some() && h.vertex_array.is_some());
    assert!(h.vertex_buffer.is_some() && h.index_buffer.is_some() && h.camera_buffer.is_some());
}

#[test]
fn init_binds_camera_block_at_binding_zero() {
    let (rec, api) = recording();
    let r = ready(&api);
    let h = r.handles();

    let bound = rec.borrow().calls().iter().any(|c| {
        *c == GpuCall::BindUniformBlock {
            program: h.program,
            block: "Camera".to_string(),
            binding: 0,
            buffer: h.camera_buffer,
        }
    });
    assert!(bound);
}

#[test]
fn scene_bracket_leaves_nothing_behind() {
    let (rec, api) = recording();
    let mut r = ready(&api);

    r.begin_scene(&Affine2DMatrix::ndc(Viewport::new(800.0, 600.0))).unwrap();
    for i in 0..3 {
        r.draw_quad(&quad_at(i as f64 * 10.0, 0.0)).unwrap();
    }
    r.end_scene().unwrap();
    r.shutdown();

    assert_eq!(rec.borrow().draw_count(), 3);
    assert_eq!(rec.borrow().live_count(), 0);
    assert!(r.handles().is_unset());
    assert_eq!(r.state(), SceneState::Uninitialized);
}

#[test]
fn every_draw_rebinds_and_unbinds() {
    let (rec, api) = recording();
    let mut r = ready(&api);
    let h = r.handles();

    r.begin_scene(&Affine2DMatrix::identity()).unwrap();
    rec.borrow_mut().take_calls();
    r.draw_quad(&quad_at(0.0, 0.0)).unwrap();
    r.draw_quad(&quad_at(1.0, 0.0)).unwrap();

    let calls = rec.borrow().calls().to_vec();
    let draws: Vec<_> = calls
        .iter()
        .filter(|c| matches!(c, GpuCall::DrawIndexed { .. }))
        .collect();
    for draw in &draws {
        assert_eq!(
            **draw,
            GpuCall::DrawIndexed {
                index_count: 6,
                program: h.program,
                vertex_array: h.vertex_array,
                texture_unit0: TextureHandle(77),
            }
        );
    }
    assert_eq!(calls.iter().filter(|c| matches!(c, GpuCall::UseProgram(_))).count(), 2);
    assert_eq!(calls.last(), Some(&GpuCall::BindVertexArray(Default::default())));
}

#[test]
fn draw_uploads_quad_uniforms() {
    let (rec, api) = recording();
    let mut r = ready(&api);

    let transform = Affine2DMatrix::translation(Vec2::new(3.0, 4.0)) * Affine2DMatrix::scale(2.0);
    r.begin_scene(&Affine2DMatrix::identity()).unwrap();
    r.draw_quad(
        &QuadDraw::new(transform, TextureHandle(5))
            .with_uv(Vec2::new(0.25, 0.0), Vec2::new(0.75, 0.5))
            .with_tint(Rgba(0xFF00FF80)),
    )
    .unwrap();

    let rec = rec.borrow();
    assert_eq!(
        rec.uniform_uploads("uModel"),
        [UniformValue::Mat3([2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 3.0, 4.0, 1.0])]
    );
    assert_eq!(
        rec.uniform_uploads("uTextureTransform"),
        [UniformValue::Mat3([0.5, 0.0, 0.0, 0.0, 0.5, 0.0, 0.25, 0.0, 1.0])]
    );
    assert_eq!(rec.uniform_uploads("u_depth"), [UniformValue::Float(0.0)]);
    assert_eq!(rec.uniform_uploads("uTex2d"), [UniformValue::Int(0)]);

    let tints = rec.uniform_uploads("uTintColor");
    let [UniformValue::Vec4(tint)] = tints.as_slice() else {
        panic!("tint not uploaded once");
    };
    assert_relative_eq!(tint[0], 1.0);
    assert_relative_eq!(tint[1], 0.0);
    assert_relative_eq!(tint[2], 1.0);
    assert_relative_eq!(tint[3], 128.0 / 255.0);
}

#[test]
fn camera_matrix_reaches_the_camera_buffer() {
    let (rec, api) = recording();
    let mut r = ready(&api);
    let camera = Affine2DMatrix::ndc(Viewport::new(640.0, 480.0));

    r.begin_scene(&camera).unwrap();

    let expected: Vec<u8> = bytemuck::bytes_of(&camera_block(&camera)).to_vec();
    let camera_buffer = r.handles().camera_buffer;
    let uploads: Vec<_> = rec
        .borrow()
        .calls()
        .iter()
        .filter_map(|c| match c {
            GpuCall::UpdateBuffer { buffer, offset: 0, data } if *buffer == camera_buffer => Some(data.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(uploads, [expected.clone()]);
    assert!(expected.iter().any(|b| *b != 0));
    assert_eq!(*r.view_projection(), camera);
}

#[test]
fn missing_uniforms_are_skipped() {
    let (rec, api) = share(RecordingApi::with_uniforms(&["uModel"]));
    let mut r = ready(&api);

    r.begin_scene(&Affine2DMatrix::identity()).unwrap();
    r.draw_quad(&quad_at(0.0, 0.0)).unwrap();

    let rec = rec.borrow();
    let uploads = rec
        .calls()
        .iter()
        .filter(|c| matches!(c, GpuCall::SetUniform { .. }))
        .count();
    assert_eq!(uploads, 1);
    assert_eq!(rec.draw_count(), 1);
}

#[test]
fn illegal_transitions_are_rejected_without_gpu_calls() {
    let (rec, api) = recording();
    let mut r = ImmediateRenderer2D::new(api.clone(), RendererConfig::default());

    let err = r.begin_scene(&Affine2DMatrix::identity()).unwrap_err();
    assert!(matches!(
        err,
        RenderError::InvalidState { operation: "begin_scene", state: SceneState::Uninitialized }
    ));
    assert!(r.draw_quad(&quad_at(0.0, 0.0)).is_err());
    assert!(r.end_scene().is_err());
    assert!(rec.borrow().calls().is_empty());

    r.init().unwrap();
    rec.borrow_mut().take_calls();
    assert!(r.init().is_err());
    assert!(r.end_scene().is_err());
    assert!(r.draw_quad(&quad_at(0.0, 0.0)).is_err());

    r.begin_scene(&Affine2DMatrix::identity()).unwrap();
    rec.borrow_mut().take_calls();
    assert!(r.begin_scene(&Affine2DMatrix::identity()).is_err());
    assert!(r.init().is_err());
    assert!(rec.borrow().calls().is_empty());
    assert_eq!(r.state(), SceneState::InScene);
}

#[test]
fn shutdown_is_idempotent() {
    let (rec, api) = recording();
    let mut r = ready(&api);

    r.shutdown();
    let released = rec.borrow_mut().take_calls();
    assert_eq!(released.iter().filter(|c| c.is_release()).count(), 5);

    r.shutdown();
    assert!(rec.borrow().calls().is_empty());
}

#[test]
fn reinit_after_shutdown() {
    let (rec, api) = recording();
    let mut r = ready(&api);
    r.shutdown();
    r.init().unwrap();
    assert_eq!(rec.borrow().live_count(), 5);
}

#[test]
fn take_moves_every_handle() {
    let (rec, api) = recording();
    let mut source = ready(&api);
    let handles = source.handles();

    let mut dest = source.take();
    assert_eq!(dest.handles(), handles);
    assert_eq!(dest.state(), SceneState::Ready);
    assert!(source.handles().is_unset());
    assert_eq!(source.state(), SceneState::Uninitialized);

    rec.borrow_mut().take_calls();
    source.shutdown();
    drop(source);
    assert!(rec.borrow().calls().is_empty());

    dest.shutdown();
    let calls = rec.borrow().calls().to_vec();
    assert_eq!(calls.len(), 5);
    assert!(calls.iter().all(GpuCall::is_release));
    assert_eq!(rec.borrow().live_count(), 0);
}

#[test]
fn drop_releases_resources() {
    let (rec, api) = recording();
    {
        let mut r = ready(&api);
        r.begin_scene(&Affine2DMatrix::identity()).unwrap();
    }
    assert_eq!(rec.borrow().live_count(), 0);
}

fn assert_partial_init_cleans_up(kind: ResourceKind) {
    let (rec, api) = recording();
    rec.borrow_mut().fail_next_create(kind);

    let mut r = ImmediateRenderer2D::new(api.clone(), RendererConfig::default());
    assert!(r.init().is_err(), "init should fail when {kind} creation fails");
    assert_eq!(rec.borrow().live_count(), 0, "leak after {kind} failure");
    assert_eq!(r.state(), SceneState::Uninitialized);
    assert!(r.handles().is_unset());

    r.init().unwrap();
}

#[test]
fn partial_init_failure_releases_acquired() {
    for kind in [
        ResourceKind::VertexBuffer,
        ResourceKind::IndexBuffer,
        ResourceKind::VertexArray,
        ResourceKind::UniformBuffer,
    ] {
        assert_partial_init_cleans_up(kind);
    }
}

#[test]
fn shader_failure_is_reported_as_compilation_error() {
    let (rec, api) = recording();
    rec.borrow_mut().fail_next_create(ResourceKind::Program);

    let mut r = ImmediateRenderer2D::new(api, RendererConfig::default());
    assert!(matches!(r.init(), Err(RenderError::ShaderCompilation { .. })));
    assert_eq!(rec.borrow().live_count(), 0);
}

#[test]
fn factory_returns_working_trait_object() {
    let (rec, api) = recording();
    let mut r: Box<dyn Renderer2D> = create_renderer(RendererKind::Immediate, api, RendererConfig::default());

    assert_eq!(r.state(), SceneState::Uninitialized);
    r.init().unwrap();
    r.begin_scene(&Affine2DMatrix::identity()).unwrap();
    r.draw_quad(&quad_at(0.0, 0.0)).unwrap();
    r.end_scene().unwrap();
    drop(r);

    assert_eq!(rec.borrow().draw_count(), 1);
    assert_eq!(rec.borrow().live_count(), 0);
}

#[test]
fn renderer_never_releases_borrowed_textures() {
    let (rec, api) = recording();
    let texture = Texture::from_pixels(&api, IVec2::new(2, 2), &[255; 16], Default::default()).unwrap();
    {
        let mut r = ready(&api);
        r.begin_scene(&Affine2DMatrix::identity()).unwrap();
        texture.draw(&mut r, &Affine2DMatrix::identity(), Rgba::WHITE).unwrap();
        r.end_scene().unwrap();
    }
    assert!(rec.borrow().is_texture_live(texture.handle()));

    let handle = texture.handle();
    drop(texture);
    assert!(!rec.borrow().is_texture_live(handle));
    assert_eq!(rec.borrow().live_count(), 0);
}

#[test]
fn region_draw_uses_display_matrix_as_is() {
    let (rec, api) = recording();
    let texture = Texture::from_pixels(&api, IVec2::new(4, 4), &[255; 64], Default::default()).unwrap();
    let mut r = ready(&api);

    r.begin_scene(&Affine2DMatrix::identity()).unwrap();
    texture
        .draw_region(&mut r, &Affine2DMatrix::identity(), IVec2::new(2, 0), IVec2::new(2, 2), Rgba::WHITE)
        .unwrap();
    texture.draw(&mut r, &Affine2DMatrix::identity(), Rgba::WHITE).unwrap();
    r.end_scene().unwrap();

    assert_eq!(
        rec.borrow().uniform_uploads("uModel"),
        [
            UniformValue::Mat3([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
            UniformValue::Mat3([4.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 1.0]),
        ]
    );
    assert_eq!(
        rec.borrow().uniform_uploads("uTextureTransform")[0],
        UniformValue::Mat3([0.5, 0.0, 0.0, 0.0, 0.5, 0.0, 0.5, 0.5, 1.0])
    );
}
