//! Lock-free queues: a multi-producer/multi-consumer linked queue
//! (component C) and a fixed-capacity indexed circular queue for
//! shared-memory-style fan-out (component D).

pub mod circular;
pub mod linked;

pub use circular::CircularQueue;
pub use linked::{LinkedQueue, LinkedQueueNode, WriterMode};
