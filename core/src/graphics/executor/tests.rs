use super::*;
use crate::graphics::desc::{BufferDesc, DrawDesc, ShaderDesc, TextureDesc};
use crate::graphics::state::BufferKind;
use crate::graphics::table::ResourceKind;
use crate::test_utils::{Event, Recorder, RecordingBackend, rid};
use crate::types::{PixelFormat, Size2};

fn executor(backend: RecordingBackend) -> (Executor<RecordingBackend>, Arc<DeviceShared>) {
    let shared = Arc::new(DeviceShared::new());
    (Executor::new(backend, Arc::clone(&shared)), shared)
}

fn init_buffer(raw: u64, kind: BufferKind, data: Vec<u8>) -> Command {
    Command::InitBuffer {
        id: rid(raw),
        desc: BufferDesc::new(kind, true, data),
    }
}

fn init_shader(raw: u64) -> Command {
    Command::InitShader {
        id: rid(raw),
        desc: ShaderDesc::default(),
    }
}

// ============================================================================
// Resource lifecycle
// ============================================================================

#[test]
fn test_create_update_delete_in_order() {
    let recorder = Recorder::default();
    let (mut exec, shared) = executor(RecordingBackend::new(recorder.clone()));

    exec.process(vec![
        init_buffer(1, BufferKind::Vertex, vec![1, 2, 3]),
        Command::SetBufferData { id: rid(1), data: vec![4, 5] },
    ]);
    assert!(shared.is_live(rid(1)));

    exec.process(vec![Command::DeleteResource { id: rid(1) }]);

    assert_eq!(
        recorder.events(),
        vec![
            Event::CreateBuffer(vec![1, 2, 3]),
            Event::UpdateBuffer(vec![4, 5]),
            Event::DestroyBuffer(vec![4, 5]),
        ]
    );
    assert!(!shared.is_live(rid(1)));
    assert!(exec.table().is_empty());
}

#[test]
fn test_update_before_create_is_skipped() {
    let recorder = Recorder::default();
    let (mut exec, _shared) = executor(RecordingBackend::new(recorder.clone()));

    exec.process(vec![
        Command::SetBufferData { id: rid(7), data: vec![1] },
        init_buffer(7, BufferKind::Index, vec![0]),
    ]);

    assert_eq!(recorder.events(), vec![Event::CreateBuffer(vec![0])]);
}

#[test]
fn test_duplicate_handle_rejected() {
    let recorder = Recorder::default();
    let (mut exec, _shared) = executor(RecordingBackend::new(recorder.clone()));

    exec.process(vec![
        init_buffer(1, BufferKind::Vertex, vec![1]),
        init_shader(1),
    ]);

    assert_eq!(exec.table().kind_of(rid(1)), Some(ResourceKind::Buffer));
    assert_eq!(recorder.count(|e| *e == Event::CreateShader), 0);
}

#[test]
fn test_delete_unknown_handle_fails_only_that_command() {
    let recorder = Recorder::default();
    let (mut exec, shared) = executor(RecordingBackend::new(recorder.clone()));

    exec.process(vec![Command::DeleteResource { id: rid(99) }, Command::Present]);

    assert_eq!(recorder.events(), vec![Event::Present]);
    assert_eq!(shared.failed.load(std::sync::atomic::Ordering::Relaxed), 1);
    assert_eq!(shared.executed.load(std::sync::atomic::Ordering::Relaxed), 1);
}

#[test]
fn test_invalid_texture_levels_rejected_before_backend() {
    let recorder = Recorder::default();
    let (mut exec, _shared) = executor(RecordingBackend::new(recorder.clone()));

    let mut desc = TextureDesc::render_target(Size2::new(4, 4), PixelFormat::Rgba8UnsignedNorm, 1);
    desc.levels.push(crate::graphics::TextureLevel {
        size: Size2::new(4, 4),
        data: vec![0; 3],
    });
    exec.process(vec![Command::InitTexture { id: rid(1), desc }]);

    assert!(recorder.events().is_empty());
}

// ============================================================================
// Render targets
// ============================================================================

#[test]
fn test_render_target_attachments() {
    let recorder = Recorder::default();
    let (mut exec, _shared) = executor(RecordingBackend::new(recorder.clone()));
    let color = TextureDesc::render_target(Size2::new(8, 8), PixelFormat::Rgba8UnsignedNorm, 1);
    let depth = TextureDesc::render_target(Size2::new(8, 8), PixelFormat::Depth, 1);

    exec.process(vec![
        Command::InitRenderTarget { id: rid(1) },
        Command::InitTexture { id: rid(2), desc: color },
        Command::InitTexture { id: rid(3), desc: depth },
        Command::AddRenderTargetColorTexture { id: rid(1), texture: rid(2) },
        Command::SetRenderTargetDepthTexture { id: rid(1), texture: Some(rid(3)) },
        Command::SetRenderTarget { id: Some(rid(1)) },
        Command::RemoveRenderTargetColorTexture { id: rid(1), texture: rid(2) },
    ]);

    let events = recorder.events();
    assert!(events.contains(&Event::AddColorTexture(rid(2))));
    assert!(events.contains(&Event::SetDepthTexture(Some(rid(3)))));
    assert!(events.contains(&Event::SetRenderTarget(true)));
    assert!(events.contains(&Event::RemoveColorTexture(rid(2))));
}

#[test]
fn test_deleting_current_target_rebinds_back_buffer() {
    let recorder = Recorder::default();
    let (mut exec, _shared) = executor(RecordingBackend::new(recorder.clone()));

    exec.process(vec![
        Command::InitRenderTarget { id: rid(1) },
        Command::SetRenderTarget { id: Some(rid(1)) },
        Command::DeleteResource { id: rid(1) },
    ]);

    let events = recorder.events();
    let unbind = events.iter().position(|e| *e == Event::SetRenderTarget(false));
    let destroy = events.iter().position(|e| matches!(e, Event::DestroyRenderTarget(_)));
    assert!(unbind.is_some() && destroy.is_some());
    assert!(unbind < destroy);
}

#[test]
fn test_attach_missing_texture_is_skipped() {
    let recorder = Recorder::default();
    let (mut exec, _shared) = executor(RecordingBackend::new(recorder.clone()));

    exec.process(vec![
        Command::InitRenderTarget { id: rid(1) },
        Command::AddRenderTargetColorTexture { id: rid(1), texture: rid(5) },
    ]);

    assert_eq!(recorder.events(), vec![Event::CreateRenderTarget]);
}

// ============================================================================
// Draws
// ============================================================================

fn draw_setup() -> Vec<Command> {
    vec![
        init_shader(1),
        init_buffer(2, BufferKind::Index, vec![0, 0, 1, 0, 2, 0]),
        init_buffer(3, BufferKind::Vertex, vec![0; 36]),
    ]
}

#[test]
fn test_draw_resolves_handles() {
    let recorder = Recorder::default();
    let (mut exec, _shared) = executor(RecordingBackend::new(recorder.clone()));

    let mut commands = draw_setup();
    commands.push(Command::Draw(Box::new(DrawDesc::new(rid(1), rid(2), rid(3), 3))));
    exec.process(commands);

    assert_eq!(recorder.count(|e| *e == Event::Draw(3)), 1);
}

#[test]
fn test_draw_with_missing_texture_is_skipped() {
    let recorder = Recorder::default();
    let (mut exec, _shared) = executor(RecordingBackend::new(recorder.clone()));

    let mut commands = draw_setup();
    commands.push(Command::Draw(Box::new(
        DrawDesc::new(rid(1), rid(2), rid(3), 3).texture(0, rid(42)),
    )));
    commands.push(Command::Present);
    exec.process(commands);

    assert_eq!(recorder.count(|e| matches!(e, Event::Draw(_))), 0);
    assert_eq!(recorder.count(|e| *e == Event::Present), 1);
}

#[test]
fn test_failing_draw_does_not_stop_the_batch() {
    let recorder = Recorder::default();
    let (mut exec, shared) = executor(RecordingBackend::failing_draws(recorder.clone()));

    let mut commands = draw_setup();
    commands.push(Command::Draw(Box::new(DrawDesc::new(rid(1), rid(2), rid(3), 3))));
    commands.push(Command::Present);
    exec.process(commands);

    assert_eq!(recorder.count(|e| *e == Event::Present), 1);
    assert_eq!(shared.failed.load(std::sync::atomic::Ordering::Relaxed), 1);
    assert_eq!(shared.frames.load(std::sync::atomic::Ordering::Relaxed), 1);
}

// ============================================================================
// Fences and teardown
// ============================================================================

#[test]
fn test_fence_signals_queue() {
    let (mut exec, shared) = executor(RecordingBackend::new(Recorder::default()));
    exec.process(vec![Command::Fence(3)]);
    assert_eq!(shared.queue.completed_fence(), 3);
}

#[test]
fn test_fence_counted_before_waiter_wakes() {
    let (mut exec, shared) = executor(RecordingBackend::new(Recorder::default()));

    // A waiter observing the fence must also observe it as executed
    let waiter_shared = Arc::clone(&shared);
    let waiter = std::thread::spawn(move || {
        waiter_shared.queue.flush();
        waiter_shared.executed.load(std::sync::atomic::Ordering::Relaxed)
    });
    loop {
        let commands = shared.queue.wait_and_drain(std::time::Duration::from_millis(10));
        if commands.is_empty() {
            continue;
        }
        exec.process(commands);
        break;
    }
    assert_eq!(waiter.join().unwrap(), 1);
}

#[test]
fn test_teardown_releases_everything() {
    let recorder = Recorder::default();
    let (mut exec, shared) = executor(RecordingBackend::new(recorder.clone()));

    let mut commands = draw_setup();
    commands.push(Command::InitRenderTarget { id: rid(4) });
    exec.process(commands);
    assert_eq!(exec.table().len(), 4);

    exec.teardown();

    assert!(exec.table().is_empty());
    assert!(!shared.is_live(rid(1)));
    assert_eq!(recorder.count(|e| matches!(e, Event::DestroyBuffer(_))), 2);
    assert_eq!(recorder.count(|e| *e == Event::DestroyShader), 1);
    assert_eq!(recorder.count(|e| matches!(e, Event::DestroyRenderTarget(_))), 1);
}
