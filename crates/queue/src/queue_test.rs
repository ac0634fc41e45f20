//! Tests for the thread-safe queue

use super::*;
use std::sync::Arc;
use std::thread;

#[test]
fn test_fifo_order() {
    let queue = SafeQueue::new();
    queue.push(1);
    queue.push(2);
    queue.push(3);

    assert_eq!(queue.len(), 3);
    assert_eq!(queue.pop(false), Some(1));
    assert_eq!(queue.pop(false), Some(2));
    assert_eq!(queue.pop(false), Some(3));
    assert!(queue.is_empty());
}

#[test]
fn test_non_blocking_pop_on_empty() {
    let queue: SafeQueue<u32> = SafeQueue::new();
    assert_eq!(queue.pop(false), None);
}

#[test]
fn test_blocking_pop_receives_item() {
    let queue = Arc::new(SafeQueue::new());

    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.pop(true))
    };

    // Give the consumer a moment to block before producing.
    thread::sleep(Duration::from_millis(50));
    queue.push(42u32);

    assert_eq!(consumer.join().unwrap(), Some(42));
}

#[test]
fn test_cancel_wakes_blocked_pop() {
    let queue: Arc<SafeQueue<u32>> = Arc::new(SafeQueue::new());

    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.pop(true))
    };

    thread::sleep(Duration::from_millis(50));
    let start = Instant::now();
    queue.cancel();

    assert_eq!(consumer.join().unwrap(), None);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(queue.cancelled());
}

#[test]
fn test_push_after_cancel_is_dropped() {
    let queue = SafeQueue::new();
    queue.cancel();
    queue.push(1u32);

    assert!(queue.is_empty());
    assert_eq!(queue.pop(false), None);
}

#[test]
fn test_pop_after_cancel_returns_none_with_items_queued() {
    let queue = SafeQueue::new();
    queue.push(1u32);
    queue.cancel();

    assert_eq!(queue.pop(false), None);
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_pop_bulk_drains_in_order() {
    let queue = SafeQueue::new();
    for i in 0..5u32 {
        queue.push(i);
    }

    let drained = queue.pop_bulk(3, Duration::from_millis(10));
    assert_eq!(drained, vec![0, 1, 2]);
    assert_eq!(queue.len(), 2);
}

#[test]
fn test_pop_bulk_waits_for_quantity() {
    let queue = Arc::new(SafeQueue::new());

    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.pop_bulk(2, Duration::from_secs(5)))
    };

    thread::sleep(Duration::from_millis(50));
    queue.push(1u32);
    queue.push(2u32);

    assert_eq!(consumer.join().unwrap(), vec![1, 2]);
}

#[test]
fn test_pop_bulk_timeout_returns_partial_drain() {
    let queue = SafeQueue::new();
    queue.push(7u32);

    let start = Instant::now();
    let drained = queue.pop_bulk(5, Duration::from_millis(100));

    assert_eq!(drained, vec![7]);
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[test]
fn test_pop_bulk_does_not_block_when_cancelled() {
    let queue = SafeQueue::new();
    queue.push(1u32);
    queue.push(2u32);
    queue.cancel();

    let start = Instant::now();
    let drained = queue.pop_bulk(10, Duration::from_secs(30));

    assert_eq!(drained, vec![1, 2]);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_concurrent_producers_and_consumers() {
    let queue = Arc::new(SafeQueue::new());
    let producers: Vec<_> = (0..4)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..100u32 {
                    queue.push(p * 100 + i);
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut seen = 0;
                while queue.pop(true).is_some() {
                    seen += 1;
                }
                seen
            })
        })
        .collect();

    for p in producers {
        p.join().unwrap();
    }
    // Let consumers drain the remainder, then release them.
    while !queue.is_empty() {
        thread::sleep(Duration::from_millis(5));
    }
    queue.cancel();

    let total: usize = consumers.into_iter().map(|c| c.join().unwrap()).sum();
    assert_eq!(total, 400);
}
