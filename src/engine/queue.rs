use std::collections::VecDeque;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Bounded multi-consumer queue that evicts its oldest entry instead of
/// blocking producers when full.
///
/// Entries matching the `protected` predicate are only evicted when nothing
/// else is left to drop.
pub struct DropOldestQueue<T> {
    state: Mutex<State<T>>,
    capacity: usize,
    protected: fn(&T) -> bool,
    notify: Notify,
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

pub enum Push<T> {
    Queued,
    /// Queued after evicting the returned entry.
    Evicted(T),
    Closed(T),
}

impl<T> DropOldestQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self::with_protected(capacity, |_| false)
    }

    pub fn with_protected(capacity: usize, protected: fn(&T) -> bool) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            protected,
            notify: Notify::new(),
        }
    }

    pub fn push(&self, item: T) -> Push<T> {
        let mut state = self.state.lock();
        if state.closed {
            return Push::Closed(item);
        }

        let evicted = if state.items.len() >= self.capacity {
            let index = state
                .items
                .iter()
                .position(|queued| !(self.protected)(queued))
                .unwrap_or(0);
            state.items.remove(index)
        } else {
            None
        };
        state.items.push_back(item);
        drop(state);

        self.notify.notify_one();
        match evicted {
            Some(old) => Push::Evicted(old),
            None => Push::Queued,
        }
    }

    /// Wait for the next item. Returns `None` once closed and drained.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if let Some(item) = state.items.pop_front() {
                    let more = !state.items.is_empty();
                    drop(state);
                    if more {
                        self.notify.notify_one();
                    }
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Stop accepting items. Consumers drain what is left, then see `None`.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }
}
