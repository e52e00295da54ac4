use std::{cell::Cell, rc::Rc, time::Duration};

use derive_ex::derive_ex;
use serde::{Deserialize, Serialize};

use crate::{
    core::{clear_timeout, set_timeout, Cleanup, EffectPhase, TimerId, WeakComponent},
    error::guard,
    memo::use_memo_slot,
    use_bind_ref, BindRef, CallbackError, DepSeq, Deps, ErrorHandler, HookContext,
};


/// When a [`SafeCallback`] invokes its function.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayOptions {
    /// Delay in milliseconds. `0` calls the function synchronously.
    pub delay_ms: u64,

    /// Cancel the pending invocation when a new one is scheduled.
    pub debounce: bool,

    /// Receives errors returned from the function.
    #[serde(skip)]
    pub on_error: ErrorHandler,
}

impl DelayOptions {
    pub fn immediate() -> Self {
        Self::default()
    }

    pub fn delayed(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::default()
        }
    }

    pub fn debounced(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            debounce: true,
            ..Self::default()
        }
    }

    pub fn on_error(mut self, f: impl Fn(CallbackError) + 'static) -> Self {
        self.on_error = ErrorHandler::new(f);
        self
    }

    fn delay(&self) -> Option<Duration> {
        (self.delay_ms > 0).then(|| Duration::from_millis(self.delay_ms))
    }
}

/// Timer bookkeeping of one [`use_safe_callback`] hook.
struct DelayedInvocation {
    pending: Cell<Option<TimerId>>,
    ended: Cell<bool>,
    owner: WeakComponent,
}

impl DelayedInvocation {
    fn new(owner: WeakComponent) -> Self {
        Self {
            pending: Cell::new(None),
            ended: Cell::new(false),
            owner,
        }
    }

    fn end(&self) {
        self.ended.set(true);
    }

    /// Ended once the owner is torn down, even if its effects never ran.
    fn is_ended(&self) -> bool {
        if !self.ended.get() && self.owner.upgrade().is_none_or(|c| c.is_torn_down()) {
            self.end();
        }
        self.ended.get()
    }
}

type SafeFn<A> = Rc<dyn Fn(A) -> Result<(), CallbackError>>;

/// A function returned by [`use_safe_callback`].
#[derive_ex(Clone, bound())]
pub struct SafeCallback<A: 'static>(Rc<dyn Fn(A)>);

impl<A: 'static> SafeCallback<A> {
    /// Invoke now or schedule an invocation, depending on the [`DelayOptions`] of the latest render.
    pub fn call(&self, args: A) {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A callback that can be delayed or debounced and never runs after its component was torn down.
///
/// Each call uses the function and the options of the latest render. A delayed call runs the function and the
/// error handler taken when it was scheduled. The returned [`SafeCallback`] keeps its identity
/// while `deps` are unchanged. Errors are handed to [`DelayOptions::on_error`].
///
/// Tearing the component down does not cancel pending timers. They still fire, but do nothing.
pub fn use_safe_callback<A: 'static>(
    cx: &mut HookContext,
    deps: Deps,
    options: DelayOptions,
    f: impl Fn(A) -> Result<(), CallbackError> + 'static,
) -> SafeCallback<A> {
    let f: SafeFn<A> = Rc::new(f);
    let f = use_bind_ref(cx, f);
    let options = use_bind_ref(cx, options);
    let owner = cx.component().downgrade();
    let invocation = cx.use_hook(|| DelayedInvocation::new(owner));
    cx.use_effect(EffectPhase::Passive, DepSeq::default(), {
        let invocation = invocation.clone();
        move || Cleanup::from_fn(move || invocation.end())
    });
    let seq = deps.to_seq();
    use_memo_slot(cx, seq, move || {
        SafeCallback(Rc::new(move |args| invoke(&invocation, &f, &options, args)))
    })
}

fn invoke<A: 'static>(
    invocation: &Rc<DelayedInvocation>,
    f: &BindRef<SafeFn<A>>,
    options: &BindRef<DelayOptions>,
    args: A,
) {
    let current = options.get();
    let f = f.get();
    let Some(delay) = current.delay() else {
        guard(&current.on_error, || f(args));
        return;
    };
    if current.debounce {
        if let Some(id) = invocation.pending.take() {
            tracing::trace!("debounced call canceled");
            clear_timeout(id);
        }
    }
    let on_error = current.on_error;
    let id = set_timeout(delay, {
        let invocation = invocation.clone();
        move || {
            if invocation.is_ended() {
                tracing::debug!("delayed call skipped after teardown");
                return;
            }
            guard(&on_error, || f(args));
        }
    });
    invocation.pending.set(Some(id));
}
