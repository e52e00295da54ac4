use assert_call::{call, CallRecorder};

use crate::deps;

use super::*;

#[test]
fn first_invocation_sees_empty() {
    let mut cr = CallRecorder::new();
    let t = SnapshotTracker::new();
    t.invoke(&deps! { a: 1 }, |cur, prev| {
        call!("{cur:?} {prev:?}");
        Ok(())
    })
    .unwrap();
    cr.verify("{Name(\"a\"): 1} Empty");
}

#[test]
fn later_invocation_sees_previous_values() {
    let t = SnapshotTracker::new();
    t.invoke(&deps! { a: 1 }, |_, _| Ok(())).unwrap();
    let prev = t
        .invoke(&deps! { a: 2 }, |_, prev| Ok(prev.get::<i32>("a").copied()))
        .unwrap();
    assert_eq!(prev, Some(1));
    assert_eq!(t.previous(), Snapshot::Prior(deps! { a: 2 }));
}

#[test]
fn failed_invocation_keeps_snapshot() {
    let t = SnapshotTracker::new();
    t.invoke(&deps! { a: 1 }, |_, _| Ok(())).unwrap();
    let r = t.invoke(&deps! { a: 2 }, |_, _| Err::<(), _>(CallbackError::msg("no")));
    assert!(r.is_err());
    assert_eq!(t.previous(), Snapshot::Prior(deps! { a: 1 }));
}

#[test]
fn empty_snapshot_has_empty_seq() {
    assert!(Snapshot::Empty.to_seq().is_empty());
    assert!(Snapshot::Empty.is_empty());
    assert_eq!(Snapshot::Prior(deps! { a: 1 }).to_seq().len(), 1);
}
