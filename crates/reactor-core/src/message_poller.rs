//! Message poller (component G): drains up to a fixed number of entries
//! from a lock-free linked queue per call, dispatching each to a handler.
//!
//! Corrects a source defect (noted for awareness, not reproduced): the
//! original constructor takes `max_poll_num` as a parameter but never
//! assigns it to the field the poll loop bounds against, so the bound is
//! effectively whatever the field happened to be zero-initialized to.
//! This port assigns it.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::clock::TickType;
use crate::queue::{LinkedQueue, LinkedQueueNode};
use crate::traits::MessageHandler;

/// Drains up to `max_poll_num` messages of type `M` from a [`LinkedQueue`]
/// per [`QueueMessagePoller::poll`] call, handing each to `handler`.
pub struct QueueMessagePoller<M, H: MessageHandler<M>> {
    queue: Arc<LinkedQueue>,
    handler: H,
    max_poll_num: usize,
    _marker: PhantomData<fn() -> M>,
}

impl<M, H: MessageHandler<M>> QueueMessagePoller<M, H> {
    #[must_use]
    pub fn new(queue: Arc<LinkedQueue>, handler: H, max_poll_num: usize) -> Self {
        Self { queue, handler, max_poll_num, _marker: PhantomData }
    }

    /// Dequeues up to `max_poll_num` entries, processes each via the
    /// handler, and commits it. Returns the number of messages processed.
    pub fn poll(&self, now: TickType) -> usize {
        let mut processed = 0;
        while processed < self.max_poll_num {
            let Some(node) = self.queue.dequeue() else { break };
            // SAFETY: `node` was just dequeued from `self.queue`, which
            // only ever holds nodes built from `LinkedQueueNode::new::<M>`
            // by this poller's producers.
            let msg = unsafe { LinkedQueueNode::take_payload::<M>(node) };
            self.handler.process(now, msg);
            self.queue.commit(node);
            processed += 1;
        }
        processed
    }
}
