use std::{collections::BTreeMap, time::Instant};

use derive_ex::{derive_ex, Ex};
use slabmap::SlabMap;

pub(crate) type TimerFn = Box<dyn FnOnce()>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Key {
    instant: Instant,
    seq: u64,
}

/// Handle of a timer armed with [`set_timeout`](crate::core::set_timeout).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerId {
    id: usize,
    key: Key,
}

impl TimerId {
    /// When the timer is due.
    pub fn deadline(&self) -> Instant {
        self.key.instant
    }
}

struct Entry {
    key: Key,
    f: TimerFn,
}

/// Pending timers ordered by deadline, then by arming order.
#[derive(Ex)]
#[derive_ex(Default)]
#[default(Self::new())]
pub(crate) struct TimerQueue {
    next_seq: u64,
    tasks: BTreeMap<Key, usize>,
    entries: SlabMap<Entry>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            next_seq: 0,
            tasks: BTreeMap::new(),
            entries: SlabMap::new(),
        }
    }

    pub fn insert(&mut self, instant: Instant, f: TimerFn) -> TimerId {
        let key = Key {
            instant,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        let id = self.entries.insert(Entry { key, f });
        self.tasks.insert(key, id);
        TimerId { id, key }
    }

    /// Removes a pending timer.
    ///
    /// Returns `None` if the timer already fired or was removed; slots reused by newer timers are left alone.
    pub fn remove(&mut self, id: TimerId) -> Option<TimerFn> {
        if self.entries.get(id.id)?.key != id.key {
            return None;
        }
        self.tasks.remove(&id.key);
        self.entries.remove(id.id).map(|e| e.f)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.tasks.first_key_value().map(|(key, _)| key.instant)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Moves every timer due at `now` into `to`, in firing order.
    pub fn drain_due(&mut self, now: Instant, to: &mut Vec<TimerFn>) -> bool {
        while let Some(task) = self.tasks.first_entry() {
            if task.key().instant > now {
                break;
            }
            let id = task.remove();
            if let Some(entry) = self.entries.remove(id) {
                to.push(entry.f);
            }
        }
        !to.is_empty()
    }
}

#[cfg(test)]
mod tests;
