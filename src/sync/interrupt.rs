//! Per-thread interrupt status for cancelling blocking waits.
//!
//! Blocking operations in this crate (`WaitNode::wait`, and the
//! enqueue/dequeue paths that call it) observe a per-thread interrupt
//! flag. Any thread holding an [`InterruptHandle`] may request
//! cancellation; the owning thread observes the request either before
//! suspending or immediately upon resuming, and the flag is cleared when
//! the cancellation is surfaced as [`ChimeError::Interrupted`].
//!
//! [`ChimeError::Interrupted`]: crate::error::ChimeError::Interrupted

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, Thread};

struct State {
    flag: AtomicBool,
    thread: Thread,
}

thread_local! {
    static CURRENT: Arc<State> = Arc::new(State {
        flag: AtomicBool::new(false),
        thread: thread::current(),
    });
}

/// Handle to one thread's interrupt status.
///
/// Cloneable and sendable; typically obtained on the target thread via
/// [`current`] and handed to whichever thread decides to cancel.
#[derive(Clone)]
pub struct InterruptHandle {
    state: Arc<State>,
}

impl InterruptHandle {
    /// Request cancellation of the owning thread's blocking waits.
    ///
    /// Sets the interrupt flag and unparks the owner, so a thread
    /// suspended in `WaitNode::wait` observes the request promptly.
    pub fn interrupt(&self) {
        self.state.flag.store(true, Ordering::SeqCst);
        self.state.thread.unpark();
    }

    /// Observe the interrupt flag without clearing it.
    pub fn is_interrupted(&self) -> bool {
        self.state.flag.load(Ordering::SeqCst)
    }
}

/// Handle to the calling thread's interrupt status.
pub fn current() -> InterruptHandle {
    CURRENT.with(|state| InterruptHandle {
        state: Arc::clone(state),
    })
}

/// Observe the calling thread's interrupt flag without clearing it.
pub fn pending() -> bool {
    CURRENT.with(|state| state.flag.load(Ordering::SeqCst))
}

/// Clear and return the calling thread's interrupt flag.
///
/// This is the observation point: once a cancellation has been surfaced
/// to the caller the flag is reset, so a retried operation blocks again
/// until a fresh interrupt arrives.
pub fn take_pending() -> bool {
    CURRENT.with(|state| state.flag.swap(false, Ordering::SeqCst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_flag_starts_clear() {
        assert!(!pending());
        assert!(!take_pending());
    }

    #[test]
    fn test_take_clears_flag() {
        current().interrupt();
        assert!(pending());
        assert!(take_pending());
        assert!(!pending());
        assert!(!take_pending());
    }

    #[test]
    fn test_interrupt_from_other_thread() {
        let (tx, rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            tx.send(current()).unwrap();
            while !pending() {
                thread::park_timeout(Duration::from_millis(50));
            }
            take_pending()
        });

        let handle = rx.recv().unwrap();
        assert!(!handle.is_interrupted());
        handle.interrupt();
        assert!(handle.is_interrupted());
        assert!(worker.join().unwrap());
    }
}
