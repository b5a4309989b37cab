//! Timer queue (component E): an ordered, doubly-linked list of timer
//! entries owned by a single reactor thread, plus a mutex-protected
//! pending list for registrations made by other threads during a timer's
//! "incipient" phase.
//!
//! Grounded in the original `TimerQueue`'s tick/reposition algorithm, with
//! one correction: `check()` (here, `tick`) computes the caught-up
//! `new_expire_time` but the source never assigns it back onto the node
//! before repositioning, so a periodic timer that ever falls behind keeps
//! firing against its stale `expire_time_` forever. This port assigns the
//! computed value to the node before repositioning it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::clock::{Clock, TickType};
use crate::traits::{TimerId, TimerListener};

struct TimerNode {
    id: TimerId,
    expire_tick: TickType,
    interval: TickType,
    user_data: u64,
    listener: Arc<dyn TimerListener>,
    prev: Option<usize>,
    next: Option<usize>,
}

struct PendingTimer {
    id: TimerId,
    listener: Arc<dyn TimerListener>,
    user_data: u64,
    initial_delay: TickType,
    interval: TickType,
}

/// An ordered queue of one-shot and periodic timers.
pub struct TimerQueue {
    clock: Arc<dyn Clock>,
    nodes: Vec<Option<TimerNode>>,
    free_list: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    index: HashMap<TimerId, usize>,
    next_id: Arc<AtomicU64>,
    pending: Mutex<Vec<PendingTimer>>,
}

impl TimerQueue {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            nodes: Vec::new(),
            free_list: Vec::new(),
            head: None,
            tail: None,
            index: HashMap::new(),
            next_id: Arc::new(AtomicU64::new(1)),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Registers a timer against the active queue. Only safe from the
    /// owning thread. `now` defaults to the clock's current steady tick
    /// when not supplied.
    pub fn add(
        &mut self,
        listener: Arc<dyn TimerListener>,
        user_data: u64,
        initial_delay: TickType,
        interval: TickType,
        now: Option<TickType>,
    ) -> TimerId {
        let now = now.unwrap_or_else(|| self.clock.steady_ticks_raw());
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let idx = self.alloc_slot(TimerNode {
            id,
            expire_tick: now + initial_delay,
            interval,
            user_data,
            listener,
            prev: None,
            next: None,
        });
        self.index.insert(id, idx);
        self.insert_sorted(idx);
        id
    }

    /// Registers a timer from a non-owning thread; it is held in a
    /// mutex-protected pending list until [`TimerQueue::merge_pending`] is
    /// called by the owner.
    pub fn add_pending(
        &self,
        listener: Arc<dyn TimerListener>,
        user_data: u64,
        initial_delay: TickType,
        interval: TickType,
    ) -> TimerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pending.lock().expect("timer pending list mutex poisoned").push(PendingTimer {
            id,
            listener,
            user_data,
            initial_delay,
            interval,
        });
        id
    }

    /// Owner-only. Translates every pending timer's `initial_delay` into
    /// an absolute `expire_tick` using `now` and inserts it into the
    /// active queue.
    pub fn merge_pending(&mut self, now: TickType) {
        let drained: Vec<PendingTimer> =
            std::mem::take(&mut *self.pending.lock().expect("timer pending list mutex poisoned"));
        for p in drained {
            let idx = self.alloc_slot(TimerNode {
                id: p.id,
                expire_tick: now + p.initial_delay,
                interval: p.interval,
                user_data: p.user_data,
                listener: p.listener,
                prev: None,
                next: None,
            });
            self.index.insert(p.id, idx);
            self.insert_sorted(idx);
        }
    }

    /// Changes a live timer's interval; takes effect the next time it is
    /// repositioned after firing. Returns `false` if `id` is unknown.
    pub fn reset_interval(&mut self, id: TimerId, new_interval: TickType) -> bool {
        let Some(&idx) = self.index.get(&id) else { return false };
        self.nodes[idx].as_mut().expect("indexed slot is live").interval = new_interval;
        true
    }

    /// Cancels a live timer. Only safe from the owning thread.
    pub fn remove(&mut self, id: TimerId) -> bool {
        let Some(idx) = self.index.remove(&id) else { return false };
        self.unlink(idx);
        self.free_slot(idx);
        true
    }

    /// Fires every timer whose `expire_tick <= now`, in ascending
    /// `expire_tick` order (ties broken by insertion order, which the
    /// list preserves since equal-or-later entries always insert after
    /// equal ones during the tail-first scan in `insert_sorted`).
    pub fn tick(&mut self, now: TickType) {
        while let Some(idx) = self.head {
            let expire_tick = self.nodes[idx].as_ref().expect("head is live").expire_tick;
            if expire_tick > now {
                break;
            }
            self.unlink(idx);

            let node = self.nodes[idx].as_ref().expect("unlinked node still live");
            node.listener.on_timeout(node.id, node.user_data);

            if node.interval == 0 {
                self.index.remove(&node.id);
                self.free_slot(idx);
            } else {
                let mut new_expire = expire_tick + node.interval;
                if new_expire <= now {
                    // Catches up a timer that fell behind instead of
                    // letting it keep firing against a stale expire_tick.
                    new_expire = now + 1;
                }
                self.nodes[idx].as_mut().expect("node still live").expire_tick = new_expire;
                self.insert_sorted(idx);
            }
        }
    }

    /// Ticks until the earliest active timer's `expire_tick`, or `None`
    /// if the queue is empty. Already-due timers report `0`.
    #[must_use]
    pub fn next_timeout(&self, now: TickType) -> Option<TickType> {
        let idx = self.head?;
        let expire_tick = self.nodes[idx].as_ref().expect("head is live").expire_tick;
        Some((expire_tick - now).max(0))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    fn alloc_slot(&mut self, node: TimerNode) -> usize {
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx] = Some(node);
            idx
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn free_slot(&mut self, idx: usize) {
        self.nodes[idx] = None;
        self.free_list.push(idx);
    }

    /// Inserts an already-allocated, unlinked node into the list, scanning
    /// from the tail backward (short timers tend to land near the tail).
    fn insert_sorted(&mut self, idx: usize) {
        let expire = self.nodes[idx].as_ref().expect("slot is live").expire_tick;
        let mut cursor = self.tail;
        while let Some(c) = cursor {
            if self.nodes[c].as_ref().expect("cursor is live").expire_tick <= expire {
                break;
            }
            cursor = self.nodes[c].as_ref().expect("cursor is live").prev;
        }
        match cursor {
            None => {
                let old_head = self.head;
                {
                    let node = self.nodes[idx].as_mut().expect("slot is live");
                    node.next = old_head;
                    node.prev = None;
                }
                if let Some(h) = old_head {
                    self.nodes[h].as_mut().expect("old head is live").prev = Some(idx);
                }
                self.head = Some(idx);
                if self.tail.is_none() {
                    self.tail = Some(idx);
                }
            }
            Some(c) => {
                let old_next = self.nodes[c].as_ref().expect("cursor is live").next;
                {
                    let node = self.nodes[idx].as_mut().expect("slot is live");
                    node.prev = Some(c);
                    node.next = old_next;
                }
                self.nodes[c].as_mut().expect("cursor is live").next = Some(idx);
                match old_next {
                    Some(n) => self.nodes[n].as_mut().expect("old next is live").prev = Some(idx),
                    None => self.tail = Some(idx),
                }
            }
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.nodes[idx].as_ref().expect("slot is live");
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.nodes[p].as_mut().expect("prev is live").next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].as_mut().expect("next is live").prev = prev,
            None => self.tail = prev,
        }
    }
}
