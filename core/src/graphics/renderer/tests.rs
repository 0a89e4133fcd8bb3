use super::*;
use crate::graphics::device::{DeviceOptions, ExecutionMode};
use crate::graphics::state::SamplerFilter;
use crate::test_utils::{Event, Recorder, RecordingBackend};

/// Renderer whose commands only run on `process_frame`.
fn external_renderer(recorder: &Recorder) -> Renderer {
    let mut device = RenderDevice::new(GraphicsDriver::Empty);
    let recorder = recorder.clone();
    let options = DeviceOptions {
        execution_mode: ExecutionMode::External,
        texture_filter: SamplerFilter::Trilinear,
        max_anisotropy: 8,
        ..Default::default()
    };
    device
        .init(options, move |_| Ok(RecordingBackend::new(recorder)))
        .unwrap();
    Renderer::new(device)
}

#[test]
fn test_create_update_delete_buffer() {
    let recorder = Recorder::default();
    let renderer = external_renderer(&recorder);

    let buffer = renderer.create_vertex_buffer(&[1u16, 2], true);
    buffer.set_data_from_slice(&[7u8, 8, 9]);
    let id = buffer.id();
    drop(buffer);
    renderer.device().process_frame();

    assert_eq!(
        recorder.events(),
        vec![
            Event::CreateBuffer(vec![1, 0, 2, 0]),
            Event::UpdateBuffer(vec![7, 8, 9]),
            Event::DestroyBuffer(vec![7, 8, 9]),
        ]
    );
    assert!(!renderer.device().is_live(id));
}

#[test]
fn test_handles_usable_before_execution() {
    let recorder = Recorder::default();
    let renderer = external_renderer(&recorder);

    let shader = renderer.create_shader(ShaderDesc::default());
    assert!(!renderer.device().is_live(shader.id()));

    renderer.device().process_frame();
    assert!(renderer.device().is_live(shader.id()));
}

#[test]
fn test_resources_get_distinct_handles() {
    let recorder = Recorder::default();
    let renderer = external_renderer(&recorder);

    let a = renderer.create_shader(ShaderDesc::default());
    let b = renderer.create_blend_state(BlendStateDesc::alpha());
    let c = renderer.create_render_target();
    assert_ne!(a.id(), b.id());
    assert_ne!(b.id(), c.id());
    assert_eq!(b.desc(), &BlendStateDesc::alpha());
}

#[test]
fn test_texture_from_image_uses_device_sampler() {
    let recorder = Recorder::default();
    let renderer = external_renderer(&recorder);
    let image = Image::new(PixelFormat::Rgba8UnsignedNorm, Size2::new(2, 2), vec![255; 16]).unwrap();

    let texture = renderer.create_texture_from_image(&image, false);
    assert_eq!(texture.size(), Size2::new(2, 2));

    let commands = renderer.device().queue().drain();
    match &commands[..] {
        [Command::InitTexture { desc, .. }] => {
            assert_eq!(desc.sampler.filter, SamplerFilter::Trilinear);
            assert_eq!(desc.sampler.max_anisotropy, 8);
        }
        other => panic!("unexpected commands: {other:?}"),
    }
}

#[test]
fn test_render_target_attachments_dedupe() {
    let recorder = Recorder::default();
    let renderer = external_renderer(&recorder);

    let color = renderer.create_texture(TextureDesc::render_target(
        Size2::new(16, 16),
        PixelFormat::Rgba8UnsignedNorm,
        1,
    ));
    let mut target = renderer.create_render_target();

    assert!(target.add_color_texture(&color));
    assert!(!target.add_color_texture(&color));
    assert_eq!(target.color_textures(), &[color.id()]);

    assert!(target.remove_color_texture(&color));
    assert!(!target.remove_color_texture(&color));
    assert!(target.color_textures().is_empty());

    renderer.device().process_frame();
    assert_eq!(recorder.count(|e| matches!(e, Event::AddColorTexture(_))), 1);
    assert_eq!(recorder.count(|e| matches!(e, Event::RemoveColorTexture(_))), 1);
}

#[test]
fn test_depth_texture_only_queued_on_change() {
    let recorder = Recorder::default();
    let renderer = external_renderer(&recorder);

    let depth = renderer.create_texture(TextureDesc::render_target(
        Size2::new(16, 16),
        PixelFormat::Depth,
        1,
    ));
    let mut target = renderer.create_render_target();
    target.set_depth_texture(Some(&depth));
    target.set_depth_texture(Some(&depth));
    target.set_depth_texture(None);

    renderer.device().process_frame();
    assert_eq!(
        recorder.count(|e| matches!(e, Event::SetDepthTexture(_))),
        2
    );
    assert_eq!(target.depth_texture(), None);
}

#[test]
fn test_frame_submission() {
    let recorder = Recorder::default();
    let renderer = external_renderer(&recorder);

    let shader = renderer.create_shader(ShaderDesc::default());
    let indices = renderer.create_index_buffer(&[0u16, 1, 2], false);
    let vertices = renderer.create_vertex_buffer(&[0f32; 9], false);

    let mut frame = CommandBuffer::new();
    frame.push(Command::Clear(ClearDesc::default()));
    frame.push(Command::Draw(Box::new(DrawDesc::new(
        shader.id(),
        indices.id(),
        vertices.id(),
        3,
    ))));
    renderer.submit(frame);
    renderer.present();
    renderer.device().process_frame();

    let events = recorder.events();
    let tail: Vec<_> = events.iter().skip(3).cloned().collect();
    assert_eq!(tail, vec![Event::Clear, Event::Draw(3), Event::Present]);
    assert_eq!(renderer.stats().frames, 1);
}

#[test]
fn test_shutdown_then_drop_wrappers() {
    let recorder = Recorder::default();
    let mut renderer = external_renderer(&recorder);
    let buffer = renderer.create_index_buffer(&[0u32], false);
    renderer.device().process_frame();

    renderer.shutdown();
    drop(buffer);

    // Teardown released the buffer once; the late delete is dropped by the closed queue
    assert_eq!(recorder.count(|e| matches!(e, Event::DestroyBuffer(_))), 1);
    assert!(renderer.device().queue().is_empty());
}
