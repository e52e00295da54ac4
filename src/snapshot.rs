use std::{cell::RefCell, rc::Rc};

use crate::{CallbackError, DepKey, DepSeq, Deps, HookContext};

#[cfg(test)]
mod tests;

/// Dependencies seen by the previous successful invocation of an effect.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Snapshot {
    /// No invocation has succeeded yet.
    #[default]
    Empty,
    Prior(Deps),
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        matches!(self, Snapshot::Empty)
    }

    pub fn deps(&self) -> Option<&Deps> {
        match self {
            Snapshot::Empty => None,
            Snapshot::Prior(deps) => Some(deps),
        }
    }

    pub fn get<T: 'static>(&self, key: impl Into<DepKey>) -> Option<&T> {
        self.deps()?.get(key)
    }

    /// The values as a sequence; empty for [`Snapshot::Empty`].
    pub fn to_seq(&self) -> DepSeq {
        self.deps().map(Deps::to_seq).unwrap_or_default()
    }
}

/// Keeps the values of the last successful invocation for the next one.
#[derive(Debug, Default)]
pub struct SnapshotTracker {
    prev: RefCell<Snapshot>,
}

impl SnapshotTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self) -> Snapshot {
        self.prev.borrow().clone()
    }

    /// Call `f` with `current` and the previous snapshot; on success `current` becomes the snapshot.
    pub fn invoke<R>(
        &self,
        current: &Deps,
        f: impl FnOnce(&Deps, &Snapshot) -> Result<R, CallbackError>,
    ) -> Result<R, CallbackError> {
        let prev = self.previous();
        let value = f(current, &prev)?;
        *self.prev.borrow_mut() = Snapshot::Prior(current.clone());
        Ok(value)
    }
}

pub(crate) fn use_snapshot_tracker(cx: &mut HookContext) -> Rc<SnapshotTracker> {
    cx.use_hook(SnapshotTracker::new)
}
