use std::{cell::Cell, rc::Rc};

use assert_call::{call, CallRecorder};

use crate::{deps, Component, Runtime};

use super::*;

fn render_with(n: &Rc<Cell<i32>>, mut f: impl FnMut(&mut HookContext, i32) + 'static) -> Component {
    let n = n.clone();
    Component::new(move |cx| f(cx, n.get()))
}

fn rerender(rt: &mut Runtime, c: &Component, n: &Rc<Cell<i32>>, value: i32) {
    n.set(value);
    c.invalidate();
    rt.update();
}

#[test]
fn memo_recomputes_only_on_change() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let n = Rc::new(Cell::new(1));
    let c = render_with(&n, |cx, n| {
        let v = use_custom_memo(cx, deps! { half: n / 2 }, |d| {
            let half = d.get::<i32>("half").copied().unwrap_or_default();
            call!("compute {half}");
            Ok(half * 100)
        });
        call!("render {v:?}");
    });
    c.mount();
    rt.update();
    cr.verify(["compute 0", "render Some(0)"]);

    rerender(&mut rt, &c, &n, 2);
    cr.verify(["compute 1", "render Some(100)"]);

    rerender(&mut rt, &c, &n, 3);
    cr.verify("render Some(100)");
}

#[test]
fn memo_error_goes_to_handler() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let n = Rc::new(Cell::new(1));
    let c = render_with(&n, |cx, n| {
        let on_error = ErrorHandler::new(|e| call!("error {e}"));
        let v = use_custom_memo_with(cx, deps! { n }, on_error, |_| {
            if n == 1 {
                Err(CallbackError::msg("one"))
            } else {
                Ok(n)
            }
        });
        call!("render {v:?}");
    });
    c.mount();
    rt.update();
    cr.verify(["error one", "render None"]);

    rerender(&mut rt, &c, &n, 1);
    cr.verify("render None");

    rerender(&mut rt, &c, &n, 2);
    cr.verify("render Some(2)");
}

#[test]
fn deps_memo_keeps_stored_set() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let n = Rc::new(Cell::new(1));
    let c = render_with(&n, |cx, n| {
        let d = use_deps_memo(cx, deps! { n, render: Rc::new(n) });
        call!("{:?}", d.get::<i32>("n"));
    });
    c.mount();
    rt.update();
    rerender(&mut rt, &c, &n, 1);
    rerender(&mut rt, &c, &n, 4);
    cr.verify(["Some(1)", "Some(1)", "Some(4)"]);
}

#[test]
fn callback_identity_follows_deps() {
    let mut rt = Runtime::new();
    let n = Rc::new(Cell::new(1));
    let callbacks = Rc::new(RefCell::new(Vec::new()));
    let c = render_with(&n, {
        let callbacks = callbacks.clone();
        move |cx, n| {
            let cb = use_custom_callback(cx, deps! { n }, |d, x: i32| {
                Ok(d.get::<i32>("n").copied().unwrap_or_default() + x)
            });
            callbacks.borrow_mut().push(cb);
        }
    });
    c.mount();
    rt.update();
    rerender(&mut rt, &c, &n, 1);
    rerender(&mut rt, &c, &n, 10);

    let callbacks = callbacks.borrow();
    assert!(callbacks[0].ptr_eq(&callbacks[1]));
    assert!(!callbacks[1].ptr_eq(&callbacks[2]));
    assert_eq!(callbacks[0].call(5), Some(6));
    assert_eq!(callbacks[2].call(5), Some(15));
}

#[test]
fn callback_error_uses_latest_handler() {
    let mut rt = Runtime::new();
    let mut cr = CallRecorder::new();
    let n = Rc::new(Cell::new(1));
    let callback = Rc::new(RefCell::new(None));
    let c = render_with(&n, {
        let callback = callback.clone();
        move |cx, n| {
            let on_error = ErrorHandler::new(move |e| call!("handler {n}: {e}"));
            let cb = use_custom_callback_with(cx, deps! {}, on_error, |_, ()| {
                Err::<(), _>(CallbackError::msg("failed"))
            });
            *callback.borrow_mut() = Some(cb);
        }
    });
    c.mount();
    rt.update();
    rerender(&mut rt, &c, &n, 2);

    let cb = callback.borrow().clone().unwrap();
    assert_eq!(cb.call(()), None);
    cr.verify("handler 2: failed");
}
