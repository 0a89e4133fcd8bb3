use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::graphics::handle::ResourceId;
use crate::types::Size2;

fn id(raw: u64) -> ResourceId {
    ResourceId::from_raw(raw).unwrap()
}

fn delete(raw: u64) -> Command {
    Command::DeleteResource { id: id(raw) }
}

// ============================================================================
// FIFO ordering
// ============================================================================

#[test]
fn test_drain_preserves_push_order() {
    let queue = CommandQueue::new();
    for raw in 1..=5 {
        queue.push(delete(raw));
    }

    let drained = queue.drain();
    let ids: Vec<_> = drained.iter().filter_map(Command::target).map(ResourceId::get).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_drain_takes_each_command_once() {
    let queue = CommandQueue::new();
    queue.push(Command::Present);
    assert_eq!(queue.drain().len(), 1);
    assert!(queue.drain().is_empty());
    assert!(queue.is_empty());
}

#[test]
fn test_submit_keeps_batch_contiguous() {
    let queue = CommandQueue::new();
    queue.push(delete(1));

    let mut batch = CommandBuffer::new();
    batch.push(delete(2));
    batch.push(delete(3));
    queue.submit(batch);
    queue.push(delete(4));

    let ids: Vec<_> = queue.drain().iter().filter_map(Command::target).map(ResourceId::get).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[test]
fn test_concurrent_producers_lose_nothing() {
    let queue = Arc::new(CommandQueue::new());
    let producers: Vec<_> = (0..4u64)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..250u64 {
                    queue.push(delete(p * 1000 + i + 1));
                }
            })
        })
        .collect();

    let mut drained = Vec::new();
    while drained.len() < 1000 {
        drained.extend(queue.wait_and_drain(Duration::from_millis(10)));
    }
    for producer in producers {
        producer.join().unwrap();
    }
    drained.extend(queue.drain());
    assert_eq!(drained.len(), 1000);

    // Each producer's own commands stay in order
    for p in 0..4u64 {
        let mine: Vec<_> = drained
            .iter()
            .filter_map(Command::target)
            .map(ResourceId::get)
            .filter(|raw| (raw - 1) / 1000 == p)
            .collect();
        let mut sorted = mine.clone();
        sorted.sort_unstable();
        assert_eq!(mine, sorted);
        assert_eq!(mine.len(), 250);
    }
}

// ============================================================================
// Waiting and closing
// ============================================================================

#[test]
fn test_wait_and_drain_times_out_empty() {
    let queue = CommandQueue::new();
    assert!(queue.wait_and_drain(Duration::from_millis(5)).is_empty());
}

#[test]
fn test_push_after_close_is_dropped() {
    let queue = CommandQueue::new();
    queue.push(Command::Present);
    queue.close();
    queue.push(Command::Resize { size: Size2::new(1, 1) });

    assert!(queue.is_closed());
    assert_eq!(queue.drain(), vec![Command::Present]);
    assert!(queue.insert_fence().is_none());
}

#[test]
fn test_close_wakes_waiting_consumer() {
    let queue = Arc::new(CommandQueue::new());
    let waiter = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.wait_and_drain(Duration::from_secs(30)))
    };
    thread::sleep(Duration::from_millis(20));
    queue.close();
    assert!(waiter.join().unwrap().is_empty());
}

// ============================================================================
// Flush barrier
// ============================================================================

#[test]
fn test_flush_waits_for_prior_commands() {
    let queue = Arc::new(CommandQueue::new());
    let executed_before_fence = Arc::new(AtomicBool::new(false));

    let consumer = {
        let queue = Arc::clone(&queue);
        let executed = Arc::clone(&executed_before_fence);
        thread::spawn(move || {
            loop {
                for command in queue.wait_and_drain(Duration::from_millis(5)) {
                    match command {
                        Command::Present => {
                            thread::sleep(Duration::from_millis(20));
                            executed.store(true, Ordering::SeqCst);
                        }
                        Command::Fence(fence) => {
                            queue.signal_fence(fence);
                            return;
                        }
                        _ => {}
                    }
                }
            }
        })
    };

    queue.push(Command::Present);
    queue.flush();
    assert!(executed_before_fence.load(Ordering::SeqCst));
    assert_eq!(queue.completed_fence(), 1);
    consumer.join().unwrap();
}

#[test]
fn test_fence_ids_increase() {
    let queue = CommandQueue::new();
    let first = queue.insert_fence().unwrap();
    let second = queue.insert_fence().unwrap();
    assert!(second > first);
    assert_eq!(queue.drain(), vec![Command::Fence(first), Command::Fence(second)]);
}

#[test]
fn test_flush_after_close_returns() {
    let queue = CommandQueue::new();
    queue.close();
    queue.flush();
}

#[test]
fn test_close_releases_fence_waiter() {
    let queue = Arc::new(CommandQueue::new());
    let fence = queue.insert_fence().unwrap();
    let waiter = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.wait_fence(fence))
    };
    thread::sleep(Duration::from_millis(20));
    queue.close();
    waiter.join().unwrap();
}
