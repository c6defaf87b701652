//! chime - a blocking MPMC ring buffer on a race-free wait queue.
//!
//! Two tightly coupled primitives:
//!
//! | Primitive | Type | Role |
//! |-----------|------|------|
//! | Wait queue | [`WaitQueue`] / [`WaitNode`] | no-missed-wakeup suspend/resume without mutex-guarded condvars |
//! | Ring buffer | [`BlockingRingBuffer<T>`] | bounded lock-free MPMC queue, blocking when full/empty |
//!
//! The ring buffer claims slot ids with CAS on two monotonic cursors and
//! leans entirely on the wait queue's guarantee for its blocking paths;
//! the wait queue's prepare/recheck/suspend split exists precisely so a
//! lock-free caller can test a condition after registering interest in
//! its change.
//!
//! # Example
//!
//! ```
//! use chime::BlockingRingBuffer;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let ring = Arc::new(BlockingRingBuffer::new(16).unwrap());
//!
//! let producer = {
//!     let ring = Arc::clone(&ring);
//!     thread::spawn(move || {
//!         for i in 0..100 {
//!             ring.enqueue(i).unwrap();
//!         }
//!     })
//! };
//!
//! let mut sum = 0;
//! for _ in 0..100 {
//!     sum += ring.dequeue().unwrap();
//! }
//! producer.join().unwrap();
//! assert_eq!(sum, (0..100).sum::<i32>());
//! ```
//!
//! # Cancellation
//!
//! Blocking calls observe a per-thread interrupt flag (see
//! [`sync::interrupt`]). A thread stuck in `enqueue`/`dequeue` can be
//! cancelled from outside; the call returns
//! [`ChimeError::Interrupted`] without claiming a slot or transferring
//! an element. There are no timeouts: absent a peer and an interrupt,
//! blocking is indefinite by contract.

pub mod error;
pub mod insights;
pub mod ring;
pub mod sync;

pub use error::{ChimeError, Result};
pub use insights::init_tracy;
pub use ring::BlockingRingBuffer;
pub use sync::{InterruptHandle, WaitNode, WaitQueue};
