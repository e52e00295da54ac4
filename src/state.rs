use std::{cell::RefCell, rc::Rc};

use derive_ex::derive_ex;

use crate::{core::WeakComponent, HookContext};


/// Setter returned by [`use_state`].
///
/// Setting the value schedules a re-render of the component that owns the state.
#[derive_ex(Clone, bound())]
pub struct SetState<T: 'static> {
    value: Rc<RefCell<T>>,
    owner: WeakComponent,
}

impl<T: 'static> SetState<T> {
    pub fn set(&self, value: T) {
        *self.value.borrow_mut() = value;
        self.owner.invalidate();
    }

    /// Modify the value in place and schedule a re-render.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.value.borrow_mut());
        self.owner.invalidate();
    }

    /// Set the value and schedule a re-render only if it changed.
    pub fn set_dedup(&self, value: T)
    where
        T: PartialEq,
    {
        let mut current = self.value.borrow_mut();
        if *current != value {
            *current = value;
            drop(current);
            self.owner.invalidate();
        }
    }
}

/// A value that persists across renders, together with a setter that re-renders the component.
pub fn use_state<T: Clone + 'static>(cx: &mut HookContext, init: impl FnOnce() -> T) -> (T, SetState<T>) {
    let value = cx.use_hook(|| RefCell::new(init()));
    let current = value.borrow().clone();
    let set = SetState {
        value,
        owner: cx.component().downgrade(),
    };
    (current, set)
}
