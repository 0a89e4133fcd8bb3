//! Render command pipeline across threads

use std::sync::Arc;
use std::thread;

use crate::graphics::{
    BackendRegistry, BlendStateDesc, BufferDesc, BufferKind, ClearDesc, Command, CommandBuffer,
    DataType, DeviceOptions, DrawDesc, DrawMode, GraphicsDriver, HeadlessWindow, NativeWindow,
    RenderDevice, Renderer, ShaderDesc, TextureDesc, VertexAttribute, VertexSemantic,
};
use crate::test_utils::{Event, Recorder, RecordingBackend};
use crate::types::{Color, Image, PixelFormat, Size2};

fn recording_renderer(recorder: &Recorder) -> Renderer {
    let mut device = RenderDevice::new(GraphicsDriver::Empty);
    let recorder = recorder.clone();
    device
        .init(DeviceOptions::default(), move |_| Ok(RecordingBackend::new(recorder)))
        .unwrap();
    Renderer::new(device)
}

fn empty_renderer() -> Renderer {
    let window: Arc<dyn NativeWindow> = Arc::new(HeadlessWindow::new(Size2::new(320, 240), "test"));
    let options = DeviceOptions {
        size: Size2::new(320, 240),
        ..Default::default()
    };
    let device = BackendRegistry::new()
        .create_device(GraphicsDriver::Empty, &window, options)
        .unwrap();
    Renderer::new(device)
}

fn quad_shader() -> ShaderDesc {
    ShaderDesc {
        vertex_shader: b"void main() {}".to_vec(),
        fragment_shader: b"void main() {}".to_vec(),
        vertex_attributes: vec![
            VertexAttribute::new(VertexSemantic::Position, 0, DataType::FloatVector3),
            VertexAttribute::new(VertexSemantic::TexCoord, 0, DataType::FloatVector2),
        ],
        ..Default::default()
    }
}

#[test]
fn test_many_producers_one_consumer() {
    let recorder = Recorder::default();
    let renderer = recording_renderer(&recorder);
    let device = renderer.device();

    thread::scope(|scope| {
        for t in 0..4u8 {
            scope.spawn(move || {
                for i in 0..25u8 {
                    let id = device.allocate();
                    device.push(Command::InitBuffer {
                        id,
                        desc: BufferDesc::new(BufferKind::Vertex, false, vec![t, i]),
                    });
                }
            });
        }
    });
    renderer.flush();

    assert_eq!(device.live_count(), 100);
    let events = recorder.events();
    // Each producer's commands keep their relative order
    for t in 0..4u8 {
        let seen: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                Event::CreateBuffer(data) if data[0] == t => Some(data[1]),
                _ => None,
            })
            .collect();
        assert_eq!(seen, (0..25).collect::<Vec<_>>());
    }
}

#[test]
fn test_create_update_delete_across_threads() {
    let recorder = Recorder::default();
    let renderer = recording_renderer(&recorder);

    let buffer = renderer.create_index_buffer(&[0u16, 1, 2], true);
    let id = buffer.id();
    buffer.set_data_from_slice(&[3u16, 4, 5]);
    drop(buffer);
    renderer.flush();

    assert!(!renderer.device().is_live(id));
    assert_eq!(
        recorder.events(),
        vec![
            Event::CreateBuffer(vec![0, 0, 1, 0, 2, 0]),
            Event::UpdateBuffer(vec![3, 0, 4, 0, 5, 0]),
            Event::DestroyBuffer(vec![3, 0, 4, 0, 5, 0]),
        ]
    );
}

#[test]
fn test_textured_quad_frame_on_empty_backend() {
    let renderer = empty_renderer();

    let image = Image::new(PixelFormat::Rgba8UnsignedNorm, Size2::new(4, 4), vec![200; 64]).unwrap();
    let texture = renderer.create_texture_from_image(&image, true);
    let shader = renderer.create_shader(quad_shader());
    let blend = renderer.create_blend_state(BlendStateDesc::alpha());
    let vertices = renderer.create_vertex_buffer(&[0f32; 20], false);
    let indices = renderer.create_index_buffer(&[0u16, 1, 2, 2, 1, 3], false);

    for _ in 0..3 {
        let mut frame = CommandBuffer::new();
        frame.push(Command::Clear(ClearDesc::color(Color::BLACK).with_depth(1.0)));
        frame.push(Command::Draw(Box::new(
            DrawDesc::new(shader.id(), indices.id(), vertices.id(), 6)
                .mode(DrawMode::TriangleList)
                .texture(0, texture.id())
                .blend_state(blend.id()),
        )));
        renderer.submit(frame);
        renderer.present();
    }
    renderer.flush();

    let stats = renderer.stats();
    assert_eq!(stats.frames, 3);
    assert_eq!(stats.commands_failed, 0);
    assert_eq!(renderer.device().live_count(), 5);
}

#[test]
fn test_offscreen_target_round_trip() {
    let renderer = empty_renderer();

    let color = renderer.create_texture(TextureDesc::render_target(
        Size2::new(64, 64),
        PixelFormat::Rgba8UnsignedNorm,
        1,
    ));
    let depth = renderer.create_texture(TextureDesc::render_target(Size2::new(64, 64), PixelFormat::Depth, 1));
    let mut target = renderer.create_render_target();
    target.add_color_texture(&color);
    target.set_depth_texture(Some(&depth));

    renderer.set_render_target(Some(&target));
    renderer.clear(ClearDesc::color(Color::WHITE));
    renderer.set_render_target(None);
    drop(target);
    renderer.flush();

    assert_eq!(renderer.stats().commands_failed, 0);
    assert_eq!(renderer.device().live_count(), 2);
}

#[test]
fn test_invalid_draw_is_skipped_and_frame_continues() {
    let renderer = empty_renderer();
    let shader = renderer.create_shader(quad_shader());
    let vertices = renderer.create_vertex_buffer(&[0f32; 20], false);
    let indices = renderer.create_index_buffer(&[0u16, 1, 2], false);

    // Index count past the end of the index buffer
    renderer.add_draw_command(DrawDesc::new(shader.id(), indices.id(), vertices.id(), 300));
    renderer.present();
    renderer.flush();

    let stats = renderer.stats();
    assert_eq!(stats.commands_failed, 1);
    assert_eq!(stats.frames, 1);
}

#[test]
fn test_resize_is_synchronous() {
    let mut renderer = empty_renderer();
    renderer.resize(Size2::new(640, 480));
    assert_eq!(renderer.size(), Size2::new(640, 480));
    assert_eq!(renderer.stats().commands_failed, 0);

    // Empty back buffer is rejected by the backend but the device keeps running
    renderer.resize(Size2::new(0, 0));
    assert_eq!(renderer.stats().commands_failed, 1);
}

#[test]
fn test_unregistered_driver_is_system_error() {
    let window: Arc<dyn NativeWindow> = Arc::new(HeadlessWindow::new(Size2::new(8, 8), "x"));
    let err = BackendRegistry::new()
        .create_device(GraphicsDriver::Direct3D11, &window, DeviceOptions::default())
        .err()
        .unwrap();
    assert!(err.to_string().contains("direct3d11"));
}
