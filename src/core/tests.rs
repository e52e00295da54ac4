use std::{
    cell::Cell,
    rc::Rc,
    time::{Duration, Instant},
};

use assert_call::{call, CallRecorder};

use super::*;
use crate::deps;

#[test]
#[should_panic(expected = "Only one `Runtime` can exist in the same thread at the same time.")]
fn second_runtime_panics() {
    let _rt0 = Runtime::new();
    let _rt1 = Runtime::new();
}

#[test]
fn runtime_can_be_recreated_after_drop() {
    drop(Runtime::new());
    let _rt = Runtime::new();
}

#[test]
#[should_panic(expected = "`Runtime` is not created.")]
fn queue_microtask_without_runtime_panics() {
    queue_microtask(|| {});
}

#[test]
fn mount_renders_on_update() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let c = Component::new(|_| call!("render"));
    c.mount();
    cr.verify(());
    assert!(!c.is_mounted());

    rt.update();
    cr.verify("render");
    assert!(c.is_mounted());

    rt.update();
    cr.verify(());
}

#[test]
fn invalidate_renders_once() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let c = Component::new(|_| call!("render"));
    c.mount();
    rt.update();
    cr.verify("render");

    c.invalidate();
    c.invalidate();
    rt.update();
    cr.verify("render");
}

#[test]
fn invalidate_before_mount_is_ignored() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let c = Component::new(|_| call!("render"));
    c.invalidate();
    rt.update();
    cr.verify(());
}

#[test]
fn use_hook_keeps_slot_across_renders() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let c = Component::new(|cx| {
        let n = cx.use_hook(|| Cell::new(0));
        n.set(n.get() + 1);
        call!("{}", n.get());
    });
    c.mount();
    rt.update();
    c.invalidate();
    rt.update();
    cr.verify(["1", "2"]);
}

#[test]
#[should_panic(expected = "hook #0 changed type between renders.")]
fn hook_type_change_panics() {
    let mut rt = Runtime::new();
    let first = Rc::new(Cell::new(true));
    let c = Component::new({
        let first = first.clone();
        move |cx| {
            if first.get() {
                cx.use_hook(|| 0u8);
            } else {
                cx.use_hook(|| "text");
            }
        }
    });
    c.mount();
    rt.update();
    first.set(false);
    c.invalidate();
    rt.update();
}

#[test]
fn effect_runs_when_deps_change() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let n = Rc::new(Cell::new(1));
    let c = Component::new({
        let n = n.clone();
        move |cx| {
            let n = n.get();
            cx.use_effect(EffectPhase::Passive, deps! { n }.to_seq(), move || {
                call!("run {n}");
                Cleanup::from_fn(move || call!("cleanup {n}"))
            });
        }
    });
    c.mount();
    rt.update();
    cr.verify("run 1");

    c.invalidate();
    rt.update();
    cr.verify(());

    n.set(2);
    c.invalidate();
    rt.update();
    cr.verify(["cleanup 1", "run 2"]);

    c.unmount();
    rt.update();
    cr.verify("cleanup 2");
    assert!(c.is_torn_down());
}

#[test]
fn layout_effects_run_before_passive_effects() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let c = Component::new(|cx| {
        cx.use_effect(EffectPhase::Passive, DepSeq::default(), || {
            call!("passive");
            Cleanup::empty()
        });
        cx.use_effect(EffectPhase::Layout, DepSeq::default(), || {
            call!("layout");
            Cleanup::empty()
        });
    });
    c.mount();
    rt.update();
    cr.verify(["layout", "passive"]);
}

#[test]
fn run_effects_by_phase() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let c = Component::new(|cx| {
        cx.use_effect(EffectPhase::Passive, DepSeq::default(), || {
            call!("passive");
            Cleanup::empty()
        });
        cx.use_effect(EffectPhase::Layout, DepSeq::default(), || {
            call!("layout");
            Cleanup::empty()
        });
    });
    c.mount();
    rt.run_renders();
    assert!(rt.run_effects(Some(EffectPhase::Layout)));
    cr.verify("layout");
    assert!(rt.run_effects(Some(EffectPhase::Passive)));
    cr.verify("passive");
    assert!(!rt.run_effects(None));
}

#[test]
fn effect_scheduled_twice_runs_latest_only() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let n = Rc::new(Cell::new(1));
    let c = Component::new({
        let n = n.clone();
        move |cx| {
            let n = n.get();
            cx.use_effect(EffectPhase::Passive, deps! { n }.to_seq(), move || {
                call!("run {n}");
                Cleanup::empty()
            });
        }
    });
    c.mount();
    rt.run_renders();
    n.set(2);
    c.invalidate();
    rt.run_renders();
    rt.update();
    cr.verify("run 2");
}

#[test]
fn unmount_before_effects_run_skips_them() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let c = Component::new(|cx| {
        cx.use_effect(EffectPhase::Passive, DepSeq::default(), || {
            call!("run");
            Cleanup::empty()
        });
    });
    c.mount();
    rt.run_renders();
    c.unmount();
    rt.update();
    cr.verify(());
}

#[test]
fn children_rendered_with_parent_and_torn_down_when_dropped() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let show = Rc::new(Cell::new(true));
    let child = Component::new(|cx| {
        call!("child");
        cx.use_effect(EffectPhase::Passive, DepSeq::default(), || {
            Cleanup::from_fn(|| call!("child cleanup"))
        });
    });
    let parent = Component::new({
        let show = show.clone();
        let child = child.clone();
        move |cx| {
            call!("parent");
            if show.get() {
                cx.child(&child);
            }
        }
    });
    parent.mount();
    rt.update();
    cr.verify(["parent", "child"]);

    child.invalidate();
    rt.update();
    cr.verify("child");

    show.set(false);
    parent.invalidate();
    rt.update();
    cr.verify(["parent", "child cleanup"]);
    assert!(child.is_torn_down());
}

#[test]
fn unmount_tears_down_children_first() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let child = Component::new(|cx| {
        cx.use_effect(EffectPhase::Passive, DepSeq::default(), || {
            Cleanup::from_fn(|| call!("child cleanup"))
        });
    });
    let parent = Component::new({
        let child = child.clone();
        move |cx| {
            cx.use_effect(EffectPhase::Passive, DepSeq::default(), || {
                Cleanup::from_fn(|| call!("parent cleanup"))
            });
            cx.child(&child);
        }
    });
    parent.mount();
    rt.update();
    parent.unmount();
    rt.update();
    cr.verify(["child cleanup", "parent cleanup"]);
}

#[test]
fn microtasks_run_after_effects_before_next_render() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let c = Component::new(|cx| {
        call!("render");
        let this = cx.component();
        cx.use_effect(EffectPhase::Passive, DepSeq::default(), move || {
            call!("effect");
            queue_microtask(|| call!("microtask"));
            this.invalidate();
            Cleanup::empty()
        });
    });
    c.mount();
    rt.update();
    cr.verify(["render", "effect", "microtask", "render"]);
}

#[test]
fn microtask_queued_by_microtask_runs_in_same_drain() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    queue_microtask(|| {
        call!("a");
        queue_microtask(|| call!("b"));
    });
    assert!(rt.run_microtasks());
    cr.verify(["a", "b"]);
    assert!(!rt.run_microtasks());
}

#[test]
fn timers_fire_when_due() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    set_timeout(Duration::ZERO, || call!("now"));
    let later = set_timeout(Duration::from_secs(60), || call!("later"));
    rt.update();
    cr.verify("now");
    assert_eq!(rt.next_timer(), Some(later.deadline()));
    clear_timeout(later);
    assert_eq!(rt.next_timer(), None);
}

#[test]
fn run_until_idle_blocking_waits_for_timers() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let start = Instant::now();
    set_timeout(Duration::from_millis(20), || call!("fired"));
    rt.run_until_idle_blocking();
    cr.verify("fired");
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn dropping_runtime_discards_timers() {
    let mut cr = CallRecorder::new();
    {
        let _rt = Runtime::new();
        set_timeout(Duration::ZERO, || call!("never"));
    }
    let mut rt = Runtime::new();
    rt.update();
    cr.verify(());
    assert_eq!(rt.next_timer(), None);
}

#[test]
fn effect_phase_display() {
    assert_eq!(EffectPhase::Layout.to_string(), "layout");
    assert_eq!(EffectPhase::Passive.to_string(), "passive");
}
