use std::{
    cell::{OnceCell, Ref, RefCell, RefMut},
    rc::Rc,
};

use derive_ex::derive_ex;

use crate::HookContext;


/// A mutable slot shared between a component and the callbacks it schedules.
///
/// Cloning a `BindRef` yields another handle to the same slot.
#[derive_ex(Clone, bound())]
pub struct BindRef<T: 'static>(Rc<RefCell<T>>);

impl<T: 'static> BindRef<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    pub fn replace(&self, value: T) -> T {
        self.0.replace(value)
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A [`BindRef`] created with `init` on the first render and left alone afterwards.
pub fn use_ref<T: 'static>(cx: &mut HookContext, init: impl FnOnce() -> T) -> BindRef<T> {
    BindRef::clone(&cx.use_hook(|| BindRef::new(init())))
}

/// A [`BindRef`] that holds `value` from the latest render.
///
/// Deferred callbacks read the slot when they run, so they see the latest value without being recreated.
pub fn use_bind_ref<T: 'static>(cx: &mut HookContext, value: T) -> BindRef<T> {
    let slot = cx.use_hook(OnceCell::<BindRef<T>>::new);
    match slot.get() {
        Some(r) => {
            r.set(value);
            r.clone()
        }
        None => {
            let r = BindRef::new(value);
            let _ = slot.set(r.clone());
            r
        }
    }
}
