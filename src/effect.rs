use std::{cell::RefCell, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{
    core::{Cleanup, EffectPhase},
    error::guard,
    snapshot::use_snapshot_tracker,
    use_bind_ref, use_first_run_gate, CallbackError, Deps, ErrorHandler, HookContext, Snapshot,
};


/// Options of the effect hooks.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectOptions {
    /// Skip the invocation of the first scheduling pass.
    ///
    /// Read on the first render only: the gate of a hook is created with this value, and changing it on a later
    /// render has no effect. Remount the component to change it.
    pub ignore_first: bool,

    /// Receives errors returned from the effect.
    #[serde(skip)]
    pub on_error: ErrorHandler,
}

impl EffectOptions {
    pub fn ignore_first() -> Self {
        Self {
            ignore_first: true,
            ..Self::default()
        }
    }

    pub fn on_error(mut self, f: impl Fn(CallbackError) + 'static) -> Self {
        self.on_error = ErrorHandler::new(f);
        self
    }
}

/// Result of an effect body.
pub type EffectResult = Result<Cleanup, CallbackError>;

type EffectFn = Rc<RefCell<dyn FnMut(&Deps, &Snapshot) -> EffectResult>>;
type PartialEffectFn = Rc<RefCell<dyn FnMut(&Deps, &Deps, &Snapshot) -> EffectResult>>;

/// Run `f` after paint whenever `deps` changes.
///
/// `f` receives the current dependencies and the [`Snapshot`] of the previous successful run.
pub fn use_custom_effect(
    cx: &mut HookContext,
    deps: Deps,
    f: impl FnMut(&Deps, &Snapshot) -> EffectResult + 'static,
) {
    use_custom_effect_with(cx, deps, EffectOptions::default(), f)
}

/// [`use_custom_effect`] with [`EffectOptions`].
pub fn use_custom_effect_with(
    cx: &mut HookContext,
    deps: Deps,
    options: EffectOptions,
    f: impl FnMut(&Deps, &Snapshot) -> EffectResult + 'static,
) {
    use_effect_in(cx, EffectPhase::Passive, deps, options, f)
}

/// Run `f` before paint whenever `deps` changes.
pub fn use_custom_layout_effect(
    cx: &mut HookContext,
    deps: Deps,
    f: impl FnMut(&Deps, &Snapshot) -> EffectResult + 'static,
) {
    use_custom_layout_effect_with(cx, deps, EffectOptions::default(), f)
}

/// [`use_custom_layout_effect`] with [`EffectOptions`].
pub fn use_custom_layout_effect_with(
    cx: &mut HookContext,
    deps: Deps,
    options: EffectOptions,
    f: impl FnMut(&Deps, &Snapshot) -> EffectResult + 'static,
) {
    use_effect_in(cx, EffectPhase::Layout, deps, options, f)
}

fn use_effect_in(
    cx: &mut HookContext,
    phase: EffectPhase,
    deps: Deps,
    options: EffectOptions,
    f: impl FnMut(&Deps, &Snapshot) -> EffectResult + 'static,
) {
    let gate = use_first_run_gate(cx, options.ignore_first);
    let tracker = use_snapshot_tracker(cx);
    let f: EffectFn = Rc::new(RefCell::new(f));
    let f = use_bind_ref(cx, f);
    let on_error = use_bind_ref(cx, options.on_error);
    let seq = deps.to_seq();
    cx.use_effect(phase, seq, move || {
        if !gate.pass() {
            return Cleanup::empty();
        }
        let f = f.get();
        let on_error = on_error.get();
        guard(&on_error, || {
            tracker.invoke(&deps, |deps, prev| (&mut *f.borrow_mut())(deps, prev))
        })
        .unwrap_or_default()
    });
}

/// Run `f` after paint whenever `deps` changes, passing the latest `props` as well.
///
/// `props` do not trigger the effect. `f` receives the dependencies, the props of the render that scheduled
/// the run and the [`Snapshot`] of the props of the previous successful run.
pub fn use_partial_effect(
    cx: &mut HookContext,
    deps: Deps,
    props: Deps,
    f: impl FnMut(&Deps, &Deps, &Snapshot) -> EffectResult + 'static,
) {
    use_partial_effect_with(cx, deps, props, EffectOptions::default(), f)
}

/// [`use_partial_effect`] with [`EffectOptions`].
pub fn use_partial_effect_with(
    cx: &mut HookContext,
    deps: Deps,
    props: Deps,
    options: EffectOptions,
    f: impl FnMut(&Deps, &Deps, &Snapshot) -> EffectResult + 'static,
) {
    let gate = use_first_run_gate(cx, options.ignore_first);
    let tracker = use_snapshot_tracker(cx);
    let f: PartialEffectFn = Rc::new(RefCell::new(f));
    let f = use_bind_ref(cx, f);
    let props = use_bind_ref(cx, props);
    let on_error = use_bind_ref(cx, options.on_error);
    let seq = deps.to_seq();
    cx.use_effect(EffectPhase::Passive, seq, move || {
        if !gate.pass() {
            return Cleanup::empty();
        }
        let f = f.get();
        let props = props.get();
        let on_error = on_error.get();
        guard(&on_error, || {
            tracker.invoke(&props, |props, prev| (&mut *f.borrow_mut())(&deps, props, prev))
        })
        .unwrap_or_default()
    });
}
