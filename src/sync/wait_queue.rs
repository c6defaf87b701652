//! Race-free wait/notify queue.
//!
//! Naive condition-check-then-sleep is unsafe without a lock around the
//! condition. With `condition = false` initially:
//!
//! ```text
//! Thread1:                    Thread2:
//!   while !condition {  (1)
//!                               condition = true   (3)
//!                               notify             (4)
//!       sleep            (2)
//!   }
//! ```
//!
//! Running 1 -> 3 -> 4 -> 2, Thread1 misses the wake and sleeps forever.
//! [`WaitQueue`] closes that window by splitting the wait into two steps:
//! [`WaitQueue::prepare_wait`] registers interest *before* the condition
//! is checked, and [`WaitNode::wait`] suspends afterwards. A wake issued
//! between the two is held as a park permit and consumed by the eventual
//! suspend, so it cannot be lost:
//!
//! ```rust,ignore
//! // waiter                              // notifier
//! loop {                                 condition.store(true, SeqCst);
//!     let wn = wq.prepare_wait();        wq.signal();
//!     if condition.load(SeqCst) {
//!         break;
//!     }
//!     wn.wait()?;
//! }
//! ```
//!
//! Semantic guarantee, for any interleaving: let x be completed `wait`
//! calls, y completed `signal` calls, w actual suspensions and s
//! effective wakes of a suspended thread. If at some instant x == y,
//! then w == s. A `signal` that finds any registered node which is (or
//! will be) suspended always wakes the earliest such node, and a woken
//! node is never woken again without a fresh `wait`.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, Thread};

use crossbeam::queue::SegQueue;

use crate::error::{ChimeError, Result};
use crate::insights;
use crate::sync::interrupt;

struct Node {
    /// Owning thread, fixed at registration.
    thread: Thread,
    /// True while the owner is genuinely (or imminently) suspended.
    parked: AtomicBool,
}

/// An unbounded FIFO of registered waiters.
///
/// The backing queue is lock-free; `prepare_wait` and `signal` never
/// block. The queue may hold several nodes of one thread at once, but at
/// most one of them has `parked == true` at any instant - [`WaitNode::wait`]
/// maintains that invariant by resetting the flag unconditionally on
/// resume. Were two parked-looking nodes of one thread ever visible, two
/// concurrent `signal` calls could each stop at one of them, count a
/// single actual wake twice, and strand a third waiter.
pub struct WaitQueue {
    queue: SegQueue<Arc<Node>>,
}

/// A single suspend ticket handed out by [`WaitQueue::prepare_wait`].
///
/// Bound to the registering thread: the handle is `!Send`, so the
/// platform suspend in [`wait`](WaitNode::wait) is always performed by
/// the thread the node was registered for.
pub struct WaitNode {
    node: Arc<Node>,
    _owner: PhantomData<*const ()>,
}

impl WaitQueue {
    /// Create an empty wait queue.
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
        }
    }

    /// Register the calling thread as a waiter.
    ///
    /// Must be called *before* evaluating the condition the caller
    /// intends to wait on - registering after the check reopens the
    /// missed-wakeup window this type exists to close.
    pub fn prepare_wait(&self) -> WaitNode {
        let node = Arc::new(Node {
            thread: thread::current(),
            parked: AtomicBool::new(false),
        });
        self.queue.push(Arc::clone(&node));
        WaitNode {
            node,
            _owner: PhantomData,
        }
    }

    /// Wake the earliest waiter that is suspended or about to suspend.
    ///
    /// Pops nodes from the head one at a time, unparking each popped
    /// node's owner unconditionally and then sampling its `parked` flag.
    /// The loop stops at the first node observed parked: that node is
    /// taken as the one definitely (or very probably) suspended, and the
    /// wake is attributed to it. A node observed unparked either has not
    /// reached `wait` yet - its eventual park will consume the permit
    /// just delivered and return immediately - or was already resumed by
    /// an earlier wake; in both cases popping on leaves no thread
    /// permanently waiting. No-op when the queue is empty.
    ///
    /// Stopping at the first parked node, rather than scanning ahead, is
    /// load-bearing: a stale parked flag can only be observed on a node
    /// whose thread was already effectively woken through an earlier
    /// node, so attributing this wake to it is still one wake per one
    /// resumed thread.
    pub fn signal(&self) {
        while let Some(node) = self.queue.pop() {
            insights::record_unpark();
            node.thread.unpark();
            if node.parked.load(Ordering::SeqCst) {
                break;
            }
        }
    }

    /// Advisory number of registered waiters.
    ///
    /// A snapshot only; stale as soon as it is read. Never use it to
    /// decide whether a `signal` is needed.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Advisory emptiness check. Snapshot only.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitNode {
    /// Suspend the calling thread until a wake registered after this
    /// node's `prepare_wait` is delivered.
    ///
    /// May also return without a matching [`WaitQueue::signal`]: a wake
    /// aimed at a different past or future node of this thread, or a
    /// spurious unpark, resumes it just the same. Callers must therefore
    /// always recheck their condition and, if unsatisfied, loop through
    /// a fresh `prepare_wait`.
    ///
    /// A wake delivered before this call is stored as the thread's park
    /// permit, and any operation that parks internally consumes it.
    /// Between `prepare_wait` and `wait` the owning thread must not
    /// block on a channel receive, a `Mutex` or `Condvar`, `park`, or
    /// `park_timeout`; doing so can swallow the pre-paid wake and leave
    /// this call suspended with no signal left to resume it.
    ///
    /// # Errors
    ///
    /// Returns [`ChimeError::Interrupted`] if the calling thread's
    /// interrupt flag is set on entry or upon resuming; the flag is
    /// cleared in that case.
    pub fn wait(&self) -> Result<()> {
        self.node.parked.store(true, Ordering::SeqCst);
        insights::record_park();
        if !interrupt::pending() {
            thread::park();
        }
        // Reset unconditionally. A signal may have popped and unparked an
        // older node of this thread; that permit is what this park just
        // consumed, so this node may still sit in the queue. Leaving
        // parked set here would let the queue hold two parked-looking
        // nodes of one thread the next time this thread re-registers.
        self.node.parked.store(false, Ordering::SeqCst);
        if interrupt::take_pending() {
            return Err(ChimeError::Interrupted);
        }
        Ok(())
    }
}
