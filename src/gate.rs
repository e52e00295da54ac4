use std::{cell::Cell, rc::Rc};

use parse_display::Display;

use crate::{core::queue_microtask, HookContext};


#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[display(style = "snake_case")]
pub enum GateState {
    /// Invocations are skipped until the gate opens.
    Suppressing,
    /// Invocations pass. Terminal.
    Active,
}

/// Skips the invocations of an effect that happen before its first scheduling pass has settled.
///
/// The first pass queues a microtask that opens the gate. Passes that happen before the microtask runs,
/// such as a dependency change made in the same synchronous step, are skipped as well.
#[derive(Debug)]
pub struct FirstRunGate {
    state: Cell<GateState>,
    is_open_queued: Cell<bool>,
}

impl FirstRunGate {
    pub fn new(ignore_first: bool) -> Rc<Self> {
        let state = if ignore_first {
            GateState::Suppressing
        } else {
            GateState::Active
        };
        Rc::new(Self {
            state: Cell::new(state),
            is_open_queued: Cell::new(false),
        })
    }

    pub fn state(&self) -> GateState {
        self.state.get()
    }

    /// Returns `true` if the invocation may run.
    pub fn pass(self: &Rc<Self>) -> bool {
        if self.state.get() == GateState::Active {
            return true;
        }
        if !self.is_open_queued.replace(true) {
            let this = Rc::downgrade(self);
            queue_microtask(move || {
                if let Some(this) = this.upgrade() {
                    this.state.set(GateState::Active);
                    tracing::debug!("first run gate opened");
                }
            });
        }
        tracing::debug!("first run suppressed");
        false
    }
}

/// A [`FirstRunGate`] owned by the current hook.
///
/// `ignore_first` is read on the first render only.
pub fn use_first_run_gate(cx: &mut HookContext, ignore_first: bool) -> Rc<FirstRunGate> {
    let gate = cx.use_hook(|| FirstRunGate::new(ignore_first));
    (*gate).clone()
}
