use std::{
    borrow::Cow,
    marker::PhantomData,
    rc::Rc,
    sync::atomic::{AtomicUsize, Ordering},
};

use derive_ex::derive_ex;

use crate::HookContext;


static NEXT_CHANNEL_KEY: AtomicUsize = AtomicUsize::new(0);

/// A value propagated to every component rendered below its provider.
///
/// Consumers read the value of the nearest enclosing [`provide`](Self::provide).
#[derive_ex(Clone, bound())]
pub struct Channel<T: 'static> {
    key: usize,
    name: Cow<'static, str>,
    _phantom: PhantomData<fn() -> Rc<T>>,
}

impl<T: 'static> Channel<T> {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            key: NEXT_CHANNEL_KEY.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            _phantom: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make `value` visible to the hooks and children rendered inside `children`.
    pub fn provide(&self, cx: &mut HookContext, value: Rc<T>, children: impl FnOnce(&mut HookContext)) {
        cx.with_provided(self.key, value, |cx| children(cx));
    }

    /// The value of the nearest enclosing provider, or `None` if there is none.
    pub fn consume(&self, cx: &HookContext) -> Option<Rc<T>> {
        cx.provided(self.key)?.downcast().ok()
    }
}
