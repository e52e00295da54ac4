use std::{cell::RefCell, rc::Rc};

use derive_ex::derive_ex;

use crate::{error::guard, use_bind_ref, CallbackError, DepSeq, Deps, ErrorHandler, HookContext};

#[cfg(test)]
mod tests;

pub(crate) fn use_memo_slot<T: Clone + 'static>(cx: &mut HookContext, seq: DepSeq, compute: impl FnOnce() -> T) -> T {
    let slot = cx.use_hook(|| RefCell::new(None::<(DepSeq, T)>));
    if let Some((prev, value)) = &*slot.borrow() {
        if !seq.is_changed_from(Some(prev)) {
            return value.clone();
        }
    }
    let value = compute();
    *slot.borrow_mut() = Some((seq, value.clone()));
    value
}

/// The dependency set stored on the render where its values last changed.
pub fn use_deps_memo(cx: &mut HookContext, deps: Deps) -> Deps {
    let seq = deps.to_seq();
    use_memo_slot(cx, seq, || deps)
}

/// Compute a value from `deps`, recomputing only when one of them changes.
///
/// Returns `None` if `f` failed; the failure is memoized like a value.
pub fn use_custom_memo<R: Clone + 'static>(
    cx: &mut HookContext,
    deps: Deps,
    f: impl FnOnce(&Deps) -> Result<R, CallbackError>,
) -> Option<R> {
    use_custom_memo_with(cx, deps, ErrorHandler::default(), f)
}

/// [`use_custom_memo`] with an error handler.
pub fn use_custom_memo_with<R: Clone + 'static>(
    cx: &mut HookContext,
    deps: Deps,
    on_error: ErrorHandler,
    f: impl FnOnce(&Deps) -> Result<R, CallbackError>,
) -> Option<R> {
    let seq = deps.to_seq();
    use_memo_slot(cx, seq, || guard(&on_error, || f(&deps)))
}

/// A memoized function returned by [`use_custom_callback`].
///
/// Calls return `None` when the function failed.
#[derive_ex(Clone, bound())]
pub struct Callback<A: 'static, R: 'static>(Rc<dyn Fn(A) -> Option<R>>);

impl<A: 'static, R: 'static> Callback<A, R> {
    pub fn call(&self, args: A) -> Option<R> {
        (self.0)(args)
    }

    /// Returns `true` if both were created by the same render.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A function that keeps its identity while `deps` are unchanged.
///
/// `f` is taken from the render where `deps` last changed and receives the dependencies of that render.
pub fn use_custom_callback<A: 'static, R: 'static>(
    cx: &mut HookContext,
    deps: Deps,
    f: impl Fn(&Deps, A) -> Result<R, CallbackError> + 'static,
) -> Callback<A, R> {
    use_custom_callback_with(cx, deps, ErrorHandler::default(), f)
}

/// [`use_custom_callback`] with an error handler.
///
/// The handler of the latest render receives the errors.
pub fn use_custom_callback_with<A: 'static, R: 'static>(
    cx: &mut HookContext,
    deps: Deps,
    on_error: ErrorHandler,
    f: impl Fn(&Deps, A) -> Result<R, CallbackError> + 'static,
) -> Callback<A, R> {
    let on_error = use_bind_ref(cx, on_error);
    let seq = deps.to_seq();
    use_memo_slot(cx, seq, move || {
        Callback(Rc::new(move |args| {
            let on_error = on_error.get();
            guard(&on_error, || f(&deps, args))
        }))
    })
}
