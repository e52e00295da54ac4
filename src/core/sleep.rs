use std::{
    collections::BTreeMap,
    future::Future,
    pin::Pin,
    sync::{Condvar, LazyLock, Mutex, MutexGuard},
    task::{Context, Poll, Waker},
    time::Instant,
};

use slabmap::SlabMap;

static SLEEPERS: LazyLock<Sleepers> = LazyLock::new(|| Sleepers {
    queue: Mutex::new(SleepQueue::new()),
    condvar: Condvar::new(),
});

/// Wakes sleeping futures from a single background thread.
///
/// Timer callbacks of the runtime are not `Send`, so the thread only wakes the waiting task; the callbacks
/// themselves run on the runtime's thread.
struct Sleepers {
    queue: Mutex<SleepQueue>,
    condvar: Condvar,
}

impl Sleepers {
    fn lock(&self) -> MutexGuard<'_, SleepQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn run_worker(&self) {
        let mut wakes = Vec::new();
        let mut queue = self.lock();
        loop {
            let now = Instant::now();
            queue.take_due(now, &mut wakes);
            if !wakes.is_empty() {
                drop(queue);
                for waker in wakes.drain(..) {
                    waker.wake();
                }
                queue = self.lock();
                continue;
            }
            queue = match queue.next_deadline() {
                Some(deadline) => {
                    let timeout = deadline.saturating_duration_since(now);
                    self.condvar
                        .wait_timeout(queue, timeout)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                }
                None => self.condvar.wait(queue).unwrap_or_else(|e| e.into_inner()),
            };
        }
    }
}

struct SleepQueue {
    next_seq: u64,
    deadlines: BTreeMap<(Instant, u64), usize>,
    wakers: SlabMap<Option<Waker>>,
    is_worker_running: bool,
}

impl SleepQueue {
    fn new() -> Self {
        Self {
            next_seq: 0,
            deadlines: BTreeMap::new(),
            wakers: SlabMap::new(),
            is_worker_running: false,
        }
    }

    fn insert(&mut self, deadline: Instant, waker: Waker) -> (usize, (Instant, u64)) {
        if !self.is_worker_running {
            self.is_worker_running = true;
            std::thread::spawn(|| SLEEPERS.run_worker());
        }
        let key = (deadline, self.next_seq);
        self.next_seq += 1;
        let is_first = self
            .deadlines
            .first_key_value()
            .is_none_or(|(first, _)| key < *first);
        let id = self.wakers.insert(Some(waker));
        self.deadlines.insert(key, id);
        if is_first {
            SLEEPERS.condvar.notify_one();
        }
        (id, key)
    }

    fn take_due(&mut self, now: Instant, to: &mut Vec<Waker>) {
        while let Some(entry) = self.deadlines.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let id = entry.remove();
            if let Some(waker) = self.wakers.get_mut(id).and_then(Option::take) {
                to.push(waker);
            }
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.first_key_value().map(|(key, _)| key.0)
    }

    /// `Ready` once the worker has taken the waker out.
    fn poll(&mut self, id: usize, cx: &Context) -> Poll<()> {
        match self.wakers.get_mut(id) {
            Some(Some(waker)) => {
                if !waker.will_wake(cx.waker()) {
                    *waker = cx.waker().clone();
                }
                Poll::Pending
            }
            _ => {
                self.wakers.remove(id);
                Poll::Ready(())
            }
        }
    }

    fn remove(&mut self, id: usize, key: (Instant, u64)) {
        self.deadlines.remove(&key);
        self.wakers.remove(id);
    }
}

struct SleepUntil {
    entry: Option<(usize, (Instant, u64))>,
}

impl Future for SleepUntil {
    type Output = ();
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some((id, _)) = this.entry else {
            return Poll::Ready(());
        };
        let poll = SLEEPERS.lock().poll(id, cx);
        if poll.is_ready() {
            this.entry = None;
        }
        poll
    }
}

impl Drop for SleepUntil {
    fn drop(&mut self) {
        if let Some((id, key)) = self.entry {
            SLEEPERS.lock().remove(id, key);
        }
    }
}

pub(crate) async fn sleep_until(deadline: Instant) {
    if deadline > Instant::now() {
        let entry = SLEEPERS.lock().insert(deadline, Waker::noop().clone());
        SleepUntil { entry: Some(entry) }.await
    }
}
