//! Lock-free linked queue (component C).
//!
//! Grounded in the original `QueueBase`/`ConcurrentQueue`: a permanent
//! sentinel node, a `tail` cursor advanced by producers, and a
//! `last_consumed` cursor CAS-advanced by consumers. A node is returned by
//! `dequeue` to exactly one consumer, which owns it until it calls
//! `commit`; only then can the producer-side `release` step reclaim it.
//!
//! The original's virtual destructor is replaced here with an explicit
//! mechanism: each node carries a type-erased payload pointer and a drop
//! function captured at construction instead of a vtable.

use crate::cache_aligned::CacheAligned;
use std::cell::Cell;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::{Condvar, Mutex};

/// A node in the linked queue. Payload is type-erased: `drop_fn` is the
/// drop glue for whatever `T` was passed to [`LinkedQueueNode::new`].
pub struct LinkedQueueNode {
    next: AtomicPtr<LinkedQueueNode>,
    consumed: AtomicBool,
    drop_fn: unsafe fn(*mut ()),
    payload: Cell<*mut ()>,
}

// SAFETY: a node's payload is only ever accessed by the thread that holds
// exclusive ownership of it (construction, then the consumer between
// dequeue and commit), never concurrently.
unsafe impl Send for LinkedQueueNode {}

impl LinkedQueueNode {
    /// Builds a new, unlinked node wrapping `value`.
    #[must_use]
    pub fn new<T>(value: T) -> *mut Self {
        unsafe fn drop_glue<T>(payload: *mut ()) {
            // SAFETY: only ever called with a pointer produced by
            // `Box::into_raw(Box::new::<T>(..))` in this same function.
            drop(unsafe { Box::from_raw(payload.cast::<T>()) });
        }
        let payload = Box::into_raw(Box::new(value)).cast::<()>();
        Box::into_raw(Box::new(Self {
            next: AtomicPtr::new(ptr::null_mut()),
            consumed: AtomicBool::new(false),
            drop_fn: drop_glue::<T>,
            payload: Cell::new(payload),
        }))
    }

    fn sentinel() -> *mut Self {
        Box::into_raw(Box::new(Self {
            next: AtomicPtr::new(ptr::null_mut()),
            consumed: AtomicBool::new(false),
            drop_fn: |_| {},
            payload: Cell::new(ptr::null_mut()),
        }))
    }

    /// Takes ownership of the node's payload, interpreting it as `T`.
    ///
    /// # Safety
    /// The caller must be the node's current exclusive owner (i.e. have
    /// just received it from [`LinkedQueue::dequeue`] or
    /// [`LinkedQueue::blocking_dequeue`], and not have called this or
    /// dropped the queue already), and `T` must match the type used at
    /// [`LinkedQueueNode::new`].
    #[must_use]
    pub unsafe fn take_payload<T>(node: *mut Self) -> T {
        let raw = unsafe { (*node).payload.replace(ptr::null_mut()) };
        debug_assert!(!raw.is_null(), "payload already taken from this node");
        *unsafe { Box::from_raw(raw.cast::<T>()) }
    }
}

/// Whether a queue's producer side is accessed by one thread or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterMode {
    /// Only one thread ever calls `enqueue`.
    Single,
    /// Multiple threads may call `enqueue`; linking is protected by a
    /// short-held mutex (covers only the `tail.next`/`tail` update, not
    /// reclamation or consumption).
    Multi,
}

/// A multi-producer (optionally) / multi-consumer lock-free queue of
/// type-erased nodes.
pub struct LinkedQueue {
    sentinel: *mut LinkedQueueNode,
    tail: CacheAligned<AtomicPtr<LinkedQueueNode>>,
    last_consumed: CacheAligned<AtomicPtr<LinkedQueueNode>>,
    writer_mode: WriterMode,
    enqueue_lock: Mutex<()>,
    blocking_mode_used: AtomicBool,
    wait_lock: Mutex<()>,
    wait_cond: Condvar,
}

// SAFETY: all mutable access to nodes happens through atomics (next,
// consumed) or through a mutex-guarded linking step; the sentinel is
// never freed while the queue lives.
unsafe impl Send for LinkedQueue {}
unsafe impl Sync for LinkedQueue {}

impl LinkedQueue {
    #[must_use]
    pub fn new(writer_mode: WriterMode) -> Self {
        let sentinel = LinkedQueueNode::sentinel();
        Self {
            sentinel,
            tail: CacheAligned::new(AtomicPtr::new(sentinel)),
            last_consumed: CacheAligned::new(AtomicPtr::new(sentinel)),
            writer_mode,
            enqueue_lock: Mutex::new(()),
            blocking_mode_used: AtomicBool::new(false),
            wait_lock: Mutex::new(()),
            wait_cond: Condvar::new(),
        }
    }

    /// Links `node` onto the tail of the queue.
    pub fn enqueue(&self, node: *mut LinkedQueueNode) {
        self.release(2);
        match self.writer_mode {
            WriterMode::Single => self.link(node),
            WriterMode::Multi => {
                let _guard = self.enqueue_lock.lock().expect("enqueue mutex poisoned");
                self.link(node);
            }
        }
        if self.blocking_mode_used.load(Ordering::Acquire) {
            let _guard = self.wait_lock.lock().expect("queue wait mutex poisoned");
            self.wait_cond.notify_all();
        }
    }

    fn link(&self, node: *mut LinkedQueueNode) {
        let tail = self.tail.load(Ordering::Relaxed);
        // SAFETY: `tail` always points at a live node (the sentinel, or a
        // node previously linked by this same method).
        unsafe { (*tail).next.store(node, Ordering::Release) };
        self.tail.store(node, Ordering::Release);
    }

    /// Claims the next unconsumed node, or `None` if the queue is empty.
    pub fn dequeue(&self) -> Option<*mut LinkedQueueNode> {
        loop {
            let last_consumed = self.last_consumed.load(Ordering::Relaxed);
            // SAFETY: `last_consumed` always points at a live node.
            let next = unsafe { (*last_consumed).next.load(Ordering::Acquire) };
            if next.is_null() {
                return None;
            }
            if self
                .last_consumed
                .compare_exchange_weak(last_consumed, next, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                return Some(next);
            }
        }
    }

    /// Blocks until a node is available.
    pub fn blocking_dequeue(&self) -> *mut LinkedQueueNode {
        if let Some(node) = self.dequeue() {
            return node;
        }
        self.blocking_mode_used.store(true, Ordering::Release);
        let mut guard = self.wait_lock.lock().expect("queue wait mutex poisoned");
        loop {
            if let Some(node) = self.dequeue() {
                return node;
            }
            guard = self.wait_cond.wait(guard).expect("queue wait condvar poisoned");
        }
    }

    /// Marks `node` as consumed, making it eligible for reclamation by a
    /// future `enqueue`.
    pub fn commit(&self, node: *mut LinkedQueueNode) {
        // SAFETY: caller holds exclusive ownership of `node` (received from
        // `dequeue`/`blocking_dequeue` and not yet committed).
        unsafe { (*node).consumed.store(true, Ordering::Release) };
    }

    /// Frees up to `trim` already-consumed, detached nodes from the front
    /// of the queue.
    fn release(&self, mut trim: u32) {
        while trim > 0 {
            // SAFETY: sentinel is always live.
            let n = unsafe { (*self.sentinel).next.load(Ordering::Relaxed) };
            if n.is_null() {
                return;
            }
            // Never free the current tail: a producer about to link onto
            // it would otherwise dereference freed memory.
            if ptr::eq(n, self.tail.load(Ordering::Acquire)) {
                return;
            }
            // SAFETY: `n` is a live node (not yet freed, reachable from the
            // sentinel chain).
            if !unsafe { (*n).consumed.load(Ordering::Acquire) } {
                return;
            }
            let next = unsafe { (*n).next.load(Ordering::Relaxed) };
            if unsafe { (*self.sentinel).next.compare_exchange(n, next, Ordering::AcqRel, Ordering::Relaxed) }.is_ok()
            {
                Self::drop_node(n);
                trim -= 1;
            }
            // else someone else advanced it first; loop and retry.
        }
    }

    fn drop_node(node: *mut LinkedQueueNode) {
        // SAFETY: node has been unlinked from every cursor that could reach
        // it (sentinel.next advanced past it, and it is not the tail) and
        // its consumer is done with it (consumed == true).
        unsafe {
            let payload = (*node).payload.get();
            if !payload.is_null() {
                ((*node).drop_fn)(payload);
            }
            drop(Box::from_raw(node));
        }
    }
}

impl Drop for LinkedQueue {
    fn drop(&mut self) {
        let mut current = self.sentinel;
        loop {
            // SAFETY: walking the still-linked chain during teardown; no
            // other thread may use the queue concurrently with `drop`.
            let next = unsafe { (*current).next.load(Ordering::Relaxed) };
            Self::drop_node(current);
            if next.is_null() {
                break;
            }
            current = next;
        }
    }
}
