//! The component runtime the hooks are built on.
//!
//! It provides the primitives the hooks need and nothing more: persistent hook slots, effects in two
//! phases keyed by a [`DepSeq`], a microtask queue, timers, and tree-scoped values.
use std::{
    any::Any,
    cell::{Cell, RefCell},
    mem::{replace, swap, take},
    rc::{Rc, Weak},
    thread::AccessError,
    time::{Duration, Instant},
};

use derive_ex::derive_ex;
use parse_display::Display;

use crate::DepSeq;

mod cleanup;
mod sleep;
mod timer;

pub use cleanup::Cleanup;
pub use timer::TimerId;

use timer::{TimerFn, TimerQueue};

#[cfg(test)]
mod tests;

thread_local! {
    static GLOBALS: RefCell<Globals> = RefCell::new(Globals::new());
}

type Microtask = Box<dyn FnOnce()>;

struct Globals {
    is_runtime_exists: bool,
    renders: Vec<Weak<ComponentNode>>,
    unmounts: Vec<Rc<ComponentNode>>,
    effects: Effects,
    microtasks: Vec<Microtask>,
    timers: TimerQueue,
}
impl Globals {
    fn new() -> Self {
        Self {
            is_runtime_exists: false,
            renders: Vec::new(),
            unmounts: Vec::new(),
            effects: Effects::default(),
            microtasks: Vec::new(),
            timers: TimerQueue::new(),
        }
    }
    fn with<T>(f: impl FnOnce(&mut Self) -> T) -> T {
        GLOBALS.with(|g| f(&mut g.borrow_mut()))
    }
    fn try_with<T>(f: impl FnOnce(&mut Self) -> T) -> Result<T, AccessError> {
        GLOBALS.try_with(|g| f(&mut g.borrow_mut()))
    }
    fn swap_vec<T>(f: impl FnOnce(&mut Self) -> &mut Vec<T>, values: &mut Vec<T>) -> bool {
        Self::with(|g| swap(f(g), values));
        !values.is_empty()
    }
    fn assert_exists(&self) {
        if !self.is_runtime_exists {
            panic!("`Runtime` is not created.");
        }
    }

    /// Leaves the queues empty and returns what they held so it can be dropped outside the borrow.
    fn finish_runtime(&mut self) -> Discarded {
        self.is_runtime_exists = false;
        Discarded {
            _renders: take(&mut self.renders),
            _unmounts: take(&mut self.unmounts),
            _effects: take(&mut self.effects),
            _microtasks: take(&mut self.microtasks),
            _timers: take(&mut self.timers),
        }
    }
}

struct Discarded {
    _renders: Vec<Weak<ComponentNode>>,
    _unmounts: Vec<Rc<ComponentNode>>,
    _effects: Effects,
    _microtasks: Vec<Microtask>,
    _timers: TimerQueue,
}

/// Component runtime.
///
/// Only one `Runtime` can exist in a thread at a time. Hooks, microtasks and timers can only be scheduled
/// while it exists.
#[derive_ex(Default)]
#[default(Self::new())]
pub struct Runtime {
    renders_buffer: Vec<Weak<ComponentNode>>,
    unmounts_buffer: Vec<Rc<ComponentNode>>,
    effects_buffer: Vec<EffectTask>,
    microtasks_buffer: Vec<Microtask>,
    timers_buffer: Vec<TimerFn>,
}
impl Runtime {
    pub fn new() -> Self {
        if Globals::with(|g| replace(&mut g.is_runtime_exists, true)) {
            panic!("Only one `Runtime` can exist in the same thread at the same time.");
        };
        Self {
            renders_buffer: Vec::new(),
            unmounts_buffer: Vec::new(),
            effects_buffer: Vec::new(),
            microtasks_buffer: Vec::new(),
            timers_buffer: Vec::new(),
        }
    }

    /// Render the components that were mounted or invalidated.
    ///
    /// Returns `true` if any component was rendered.
    pub fn run_renders(&mut self) -> bool {
        let mut handled = false;
        let mut renders = take(&mut self.renders_buffer);
        while Globals::swap_vec(|g| &mut g.renders, &mut renders) {
            for node in renders.drain(..) {
                if let Some(node) = node.upgrade() {
                    if node.is_render_queued.get() {
                        node.render();
                        handled = true;
                    }
                }
            }
        }
        self.renders_buffer = renders;
        handled
    }

    /// Tear down the components passed to [`Component::unmount`].
    ///
    /// Returns `true` if any component was torn down.
    pub fn run_unmounts(&mut self) -> bool {
        let mut handled = false;
        let mut unmounts = take(&mut self.unmounts_buffer);
        while Globals::swap_vec(|g| &mut g.unmounts, &mut unmounts) {
            for node in unmounts.drain(..) {
                node.teardown();
                handled = true;
            }
        }
        self.unmounts_buffer = unmounts;
        handled
    }

    /// Perform scheduled effects.
    ///
    /// If `phase` is `None`, effects of all phases are performed, layout effects first.
    ///
    /// Returns `true` if any effect was performed.
    pub fn run_effects(&mut self, phase: Option<EffectPhase>) -> bool {
        let mut handled = false;
        let mut effects = take(&mut self.effects_buffer);
        while Globals::with(|g| g.effects.drain(phase, &mut effects)) {
            for effect in effects.drain(..) {
                effect.run();
            }
            handled = true;
        }
        self.effects_buffer = effects;
        handled
    }

    /// Perform queued microtasks, including the ones they queue.
    ///
    /// Returns `true` if any microtask was performed.
    pub fn run_microtasks(&mut self) -> bool {
        let mut handled = false;
        let mut microtasks = take(&mut self.microtasks_buffer);
        while Globals::swap_vec(|g| &mut g.microtasks, &mut microtasks) {
            for task in microtasks.drain(..) {
                task();
            }
            handled = true;
        }
        self.microtasks_buffer = microtasks;
        handled
    }

    /// Fire the timers that are due now.
    ///
    /// Returns `true` if any timer fired.
    pub fn run_timers(&mut self) -> bool {
        let now = Instant::now();
        let mut handled = false;
        let mut timers = take(&mut self.timers_buffer);
        while Globals::with(|g| g.timers.drain_due(now, &mut timers)) {
            tracing::trace!(count = timers.len(), "fire timers");
            for f in timers.drain(..) {
                f();
            }
            handled = true;
        }
        self.timers_buffer = timers;
        handled
    }

    /// Repeat until there is nothing left to do.
    ///
    /// Microtasks run first in every round, so the ones queued by a render or an effect run before anything
    /// else is rendered. Layout effects run before passive effects, and timers only fire when everything
    /// else is settled.
    pub fn update(&mut self) {
        loop {
            if self.run_microtasks() {
                continue;
            }
            if self.run_renders() {
                continue;
            }
            if self.run_unmounts() {
                continue;
            }
            if self.run_effects(Some(EffectPhase::Layout)) {
                continue;
            }
            if self.run_effects(Some(EffectPhase::Passive)) {
                continue;
            }
            if self.run_timers() {
                continue;
            }
            break;
        }
    }

    /// Deadline of the earliest pending timer.
    pub fn next_timer(&self) -> Option<Instant> {
        Globals::with(|g| g.timers.next_deadline())
    }

    /// Call [`update`](Self::update) and wait for pending timers until none is left.
    pub async fn run_until_idle(&mut self) {
        loop {
            self.update();
            match self.next_timer() {
                Some(deadline) => sleep::sleep_until(deadline).await,
                None => break,
            }
        }
    }

    /// Blocking version of [`run_until_idle`](Self::run_until_idle).
    pub fn run_until_idle_blocking(&mut self) {
        futures::executor::block_on(self.run_until_idle())
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        let discarded = Globals::with(|g| g.finish_runtime());
        drop(discarded);
    }
}

/// Queue `f` to run once the current render or effect step has finished.
pub fn queue_microtask(f: impl FnOnce() + 'static) {
    Globals::with(|g| {
        g.assert_exists();
        g.microtasks.push(Box::new(f));
    })
}

/// Arm a timer that calls `f` once `delay` has elapsed.
pub fn set_timeout(delay: Duration, f: impl FnOnce() + 'static) -> TimerId {
    let deadline = Instant::now() + delay;
    Globals::with(|g| {
        g.assert_exists();
        g.timers.insert(deadline, Box::new(f))
    })
}

/// Cancel a pending timer.
///
/// Does nothing if the timer already fired or was canceled.
pub fn clear_timeout(id: TimerId) {
    let removed = Globals::try_with(|g| g.timers.remove(id)).ok().flatten();
    drop(removed);
}

/// When an effect runs relative to painting.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Default)]
#[display(style = "snake_case")]
pub enum EffectPhase {
    /// Before the frame is painted.
    Layout,
    /// After the frame is painted.
    #[default]
    Passive,
}

#[derive(Default)]
struct Effects {
    layout: Vec<EffectTask>,
    passive: Vec<EffectTask>,
}
impl Effects {
    fn push(&mut self, phase: EffectPhase, task: EffectTask) {
        match phase {
            EffectPhase::Layout => self.layout.push(task),
            EffectPhase::Passive => self.passive.push(task),
        }
    }
    fn drain(&mut self, phase: Option<EffectPhase>, to: &mut Vec<EffectTask>) -> bool {
        match phase {
            Some(EffectPhase::Layout) => to.append(&mut self.layout),
            Some(EffectPhase::Passive) => to.append(&mut self.passive),
            None => {
                to.append(&mut self.layout);
                to.append(&mut self.passive);
            }
        }
        !to.is_empty()
    }
}

#[derive(Default)]
struct EffectSlot {
    deps: RefCell<Option<DepSeq>>,
    cleanup: RefCell<Cleanup>,
    generation: Cell<u64>,
}
impl EffectSlot {
    fn run_cleanup(&self) {
        let cleanup = take(&mut *self.cleanup.borrow_mut());
        cleanup.run();
    }
}

struct EffectTask {
    node: Weak<ComponentNode>,
    slot: Weak<EffectSlot>,
    generation: u64,
    f: Box<dyn FnOnce() -> Cleanup>,
}
impl EffectTask {
    fn run(self) {
        let (Some(node), Some(slot)) = (self.node.upgrade(), self.slot.upgrade()) else {
            return;
        };
        if node.is_torn_down() || slot.generation.get() != self.generation {
            return;
        }
        slot.run_cleanup();
        let cleanup = (self.f)();
        if node.is_torn_down() {
            cleanup.run();
        } else {
            *slot.cleanup.borrow_mut() = cleanup;
        }
    }
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[display(style = "snake_case")]
enum Lifecycle {
    Created,
    Mounted,
    TornDown,
}

struct ComponentNode {
    render: RefCell<Box<dyn FnMut(&mut HookContext)>>,
    hooks: RefCell<Vec<Rc<dyn Any>>>,
    effects: RefCell<Vec<Rc<EffectSlot>>>,
    children: RefCell<Vec<Component>>,
    scope: RefCell<Scope>,
    lifecycle: Cell<Lifecycle>,
    is_render_queued: Cell<bool>,
}
impl ComponentNode {
    fn is_torn_down(&self) -> bool {
        self.lifecycle.get() == Lifecycle::TornDown
    }

    fn schedule_render(self: &Rc<Self>) {
        if self.is_torn_down() || self.is_render_queued.replace(true) {
            return;
        }
        Globals::with(|g| {
            g.assert_exists();
            g.renders.push(Rc::downgrade(self));
        });
    }

    fn render(self: &Rc<Self>) {
        self.is_render_queued.set(false);
        if self.is_torn_down() {
            return;
        }
        self.lifecycle.set(Lifecycle::Mounted);
        let scope = self.scope.borrow().clone();
        let mut cx = HookContext {
            node: self,
            cursor: 0,
            scope,
            children: Vec::new(),
        };
        tracing::trace!("render");
        {
            let mut render = self.render.borrow_mut();
            (&mut **render)(&mut cx);
        }
        let children = cx.children;
        let old = replace(&mut *self.children.borrow_mut(), children);
        for child in old {
            let is_kept = self.children.borrow().iter().any(|c| c.ptr_eq(&child));
            if !is_kept {
                child.0.teardown();
            }
        }
    }

    fn teardown(&self) {
        if self.lifecycle.replace(Lifecycle::TornDown) == Lifecycle::TornDown {
            return;
        }
        let children = take(&mut *self.children.borrow_mut());
        for child in children {
            child.0.teardown();
        }
        let effects = take(&mut *self.effects.borrow_mut());
        for effect in effects {
            effect.run_cleanup();
        }
        let hooks = take(&mut *self.hooks.borrow_mut());
        drop(hooks);
        tracing::trace!("torn down");
    }
}

/// A render function together with the state of its hooks.
///
/// Cloning a `Component` yields another handle to the same instance.
#[derive(Clone)]
pub struct Component(Rc<ComponentNode>);

impl Component {
    pub fn new(render: impl FnMut(&mut HookContext) + 'static) -> Self {
        Self(Rc::new(ComponentNode {
            render: RefCell::new(Box::new(render)),
            hooks: RefCell::new(Vec::new()),
            effects: RefCell::new(Vec::new()),
            children: RefCell::new(Vec::new()),
            scope: RefCell::new(Scope::default()),
            lifecycle: Cell::new(Lifecycle::Created),
            is_render_queued: Cell::new(false),
        }))
    }

    /// Schedule the first render of a root component.
    ///
    /// The runtime only keeps a weak reference, so the component must be kept alive by the caller.
    pub fn mount(&self) {
        self.0.schedule_render();
    }

    /// Schedule a re-render of a mounted component.
    pub fn invalidate(&self) {
        if self.0.lifecycle.get() == Lifecycle::Mounted {
            self.0.schedule_render();
        }
    }

    /// Schedule teardown: effect cleanups run, and the component never renders again.
    pub fn unmount(&self) {
        Globals::with(|g| {
            g.assert_exists();
            g.unmounts.push(self.0.clone());
        });
    }

    pub fn is_mounted(&self) -> bool {
        self.0.lifecycle.get() == Lifecycle::Mounted
    }

    pub fn is_torn_down(&self) -> bool {
        self.0.is_torn_down()
    }

    pub fn downgrade(&self) -> WeakComponent {
        WeakComponent(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Weak handle of a [`Component`].
#[derive(Clone)]
pub struct WeakComponent(Weak<ComponentNode>);

impl WeakComponent {
    pub fn upgrade(&self) -> Option<Component> {
        self.0.upgrade().map(Component)
    }

    pub fn invalidate(&self) {
        if let Some(c) = self.upgrade() {
            c.invalidate();
        }
    }
}

/// Values provided to a subtree, innermost first.
#[derive(Clone, Default)]
struct Scope(Option<Rc<ScopeEntry>>);

struct ScopeEntry {
    key: usize,
    value: Rc<dyn Any>,
    parent: Scope,
}

impl Scope {
    fn push(&self, key: usize, value: Rc<dyn Any>) -> Self {
        Scope(Some(Rc::new(ScopeEntry {
            key,
            value,
            parent: self.clone(),
        })))
    }
    fn get(&self, key: usize) -> Option<Rc<dyn Any>> {
        let mut scope = self;
        while let Some(entry) = &scope.0 {
            if entry.key == key {
                return Some(entry.value.clone());
            }
            scope = &entry.parent;
        }
        None
    }
}

/// Context passed to a render function.
///
/// Hooks are identified by call order: the n-th hook called in a render gets the same slot on every render.
pub struct HookContext<'a> {
    node: &'a Rc<ComponentNode>,
    cursor: usize,
    scope: Scope,
    children: Vec<Component>,
}

impl HookContext<'_> {
    /// Get the slot of the current hook, creating it with `init` on the first render.
    ///
    /// # Panics
    ///
    /// Panics if the slot was created by a hook of a different type, i.e. the hook order changed.
    pub fn use_hook<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Rc<T> {
        self.use_slot(init).0
    }

    fn use_slot<T: 'static>(&mut self, init: impl FnOnce() -> T) -> (Rc<T>, bool) {
        let index = self.cursor;
        self.cursor += 1;
        let existing = self.node.hooks.borrow().get(index).cloned();
        if let Some(hook) = existing {
            return match hook.downcast::<T>() {
                Ok(hook) => (hook, false),
                Err(_) => panic!(
                    "hook #{index} changed type between renders. Hooks must be called in the same order on every render."
                ),
            };
        }
        let hook = Rc::new(init());
        let mut hooks = self.node.hooks.borrow_mut();
        debug_assert_eq!(hooks.len(), index);
        hooks.push(hook.clone());
        (hook, true)
    }

    /// Schedule `f` to run in `phase` if `deps` differs from the previous render.
    ///
    /// The [`Cleanup`] returned by the previous run is performed right before `f`, and when the component is
    /// torn down. If the effect is scheduled again before it ran, only the latest `f` runs.
    pub fn use_effect(
        &mut self,
        phase: EffectPhase,
        deps: DepSeq,
        f: impl FnOnce() -> Cleanup + 'static,
    ) {
        let (slot, is_new) = self.use_slot(EffectSlot::default);
        if is_new {
            self.node.effects.borrow_mut().push(slot.clone());
        }
        let is_changed = deps.is_changed_from(slot.deps.borrow().as_ref());
        if !is_changed {
            return;
        }
        *slot.deps.borrow_mut() = Some(deps);
        let generation = slot.generation.get().wrapping_add(1);
        slot.generation.set(generation);
        tracing::trace!(%phase, "schedule effect");
        let task = EffectTask {
            node: Rc::downgrade(self.node),
            slot: Rc::downgrade(&slot),
            generation,
            f: Box::new(f),
        };
        Globals::with(|g| {
            g.assert_exists();
            g.effects.push(phase, task);
        });
    }

    /// Render `child` now, inside the values provided at this point of the render.
    ///
    /// A child that is not rendered again by the next render of this component is torn down.
    pub fn child(&mut self, child: &Component) {
        if child.is_torn_down() {
            tracing::warn!("rendering a torn down component is ignored");
            return;
        }
        *child.0.scope.borrow_mut() = self.scope.clone();
        child.0.render();
        if !self.children.iter().any(|c| c.ptr_eq(child)) {
            self.children.push(child.clone());
        }
    }

    /// The component being rendered.
    pub fn component(&self) -> Component {
        Component(self.node.clone())
    }

    pub(crate) fn with_provided(&mut self, key: usize, value: Rc<dyn Any>, f: impl FnOnce(&mut Self)) {
        let scope = self.scope.push(key, value);
        let parent = replace(&mut self.scope, scope);
        f(self);
        self.scope = parent;
    }

    pub(crate) fn provided(&self, key: usize) -> Option<Rc<dyn Any>> {
        self.scope.get(key)
    }
}
