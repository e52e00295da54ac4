use std::time::{Duration, Instant};

use assert_call::{call, CallRecorder};

use super::*;

fn run_all(fs: &mut Vec<TimerFn>) {
    for f in fs.drain(..) {
        f();
    }
}

#[test]
fn drain_due_in_deadline_order() {
    let mut cr = CallRecorder::new();
    let mut q = TimerQueue::new();
    let now = Instant::now();
    q.insert(now + Duration::from_millis(20), Box::new(|| call!("20")));
    q.insert(now + Duration::from_millis(10), Box::new(|| call!("10")));
    q.insert(now + Duration::from_millis(30), Box::new(|| call!("30")));

    let mut fs = Vec::new();
    assert!(q.drain_due(now + Duration::from_millis(25), &mut fs));
    run_all(&mut fs);
    cr.verify(["10", "20"]);
    assert_eq!(q.len(), 1);
    assert_eq!(q.next_deadline(), Some(now + Duration::from_millis(30)));
}

#[test]
fn same_deadline_fires_in_arming_order() {
    let mut cr = CallRecorder::new();
    let mut q = TimerQueue::new();
    let at = Instant::now();
    q.insert(at, Box::new(|| call!("a")));
    q.insert(at, Box::new(|| call!("b")));

    let mut fs = Vec::new();
    q.drain_due(at, &mut fs);
    run_all(&mut fs);
    cr.verify(["a", "b"]);
}

#[test]
fn nothing_due() {
    let mut q = TimerQueue::new();
    let now = Instant::now();
    q.insert(now + Duration::from_secs(1), Box::new(|| {}));
    let mut fs = Vec::new();
    assert!(!q.drain_due(now, &mut fs));
    assert!(!q.is_empty());
}

#[test]
fn remove_pending() {
    let mut q = TimerQueue::new();
    let now = Instant::now();
    let id = q.insert(now, Box::new(|| {}));
    assert!(q.remove(id).is_some());
    assert!(q.is_empty());
    assert!(q.remove(id).is_none());
}

#[test]
fn remove_stale_id_keeps_reused_slot() {
    let mut cr = CallRecorder::new();
    let mut q = TimerQueue::new();
    let now = Instant::now();
    let old = q.insert(now, Box::new(|| call!("old")));
    let mut fs = Vec::new();
    q.drain_due(now, &mut fs);
    run_all(&mut fs);
    cr.verify("old");

    q.insert(now, Box::new(|| call!("new")));
    assert!(q.remove(old).is_none());
    q.drain_due(now, &mut fs);
    run_all(&mut fs);
    cr.verify("new");
}
