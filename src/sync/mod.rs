//! Synchronization primitives underpinning the blocking ring buffer.
//!
//! - `wait_queue` - race-free prepare/recheck/suspend wait queue
//! - `interrupt` - per-thread cancellation substrate for blocking waits

pub mod interrupt;
pub mod wait_queue;

pub use interrupt::InterruptHandle;
pub use wait_queue::{WaitNode, WaitQueue};
