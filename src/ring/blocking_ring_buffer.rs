//! Bounded lock-free MPMC ring buffer with blocking enqueue/dequeue.
//!
//! Producers and consumers claim monotonically increasing slot ids by
//! CAS on two cursors; logical id `i` lives in physical slot
//! `i % capacity`. Ids are never reused, so a physical slot's occupancy
//! (null vs. non-null pointer) disambiguates which logical cycle
//! currently owns it. A slot id moves through
//! `unclaimed -> claimed-writing -> occupied -> claimed-reading ->
//! unclaimed (next cycle)`, gated only by the two cursors - no lock ever
//! protects a slot.
//!
//! When the ring is full, `enqueue` blocks; when empty, `dequeue`
//! blocks. Both use the prepare/recheck/suspend pattern of
//! [`WaitQueue`] against a dedicated waiter queue per direction, and
//! each successful transfer signals the opposite queue to wake one peer.
//!
//! Ordering: slot ids are claimed in strictly increasing order, but not
//! necessarily in call-arrival order - a CAS loser retries and may end up
//! with a later id than a later-arriving winner. There is no FIFO
//! guarantee across producers or across consumers, only FIFO by slot id.

use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};
use std::thread;

use crossbeam::utils::CachePadded;

use crate::error::{ChimeError, Result};
use crate::insights;
use crate::sync::interrupt;
use crate::sync::wait_queue::WaitQueue;

/// Bounded MPMC queue over a circular slot array.
///
/// Fixed capacity, chosen at construction; any number of producer and
/// consumer threads. Blocking is indefinite by contract: an `enqueue` on
/// a full ring returns only once some `dequeue` makes room (or the
/// caller is interrupted), and vice versa.
pub struct BlockingRingBuffer<T> {
    /// One `AtomicPtr` per physical slot; null means empty. A slot is
    /// written by exactly one producer and cleared by exactly one
    /// consumer per id cycle.
    slots: Box<[AtomicPtr<T>]>,
    capacity: u64,
    /// Next slot id to write. Advances only by successful CAS.
    write_cursor: CachePadded<AtomicU64>,
    /// Next slot id to read. Advances only by successful CAS; once a
    /// consumer wins the CAS for an id, that element counts as read.
    read_cursor: CachePadded<AtomicU64>,
    /// Waiters blocked because the ring looked full (producers).
    full: WaitQueue,
    /// Waiters blocked because the ring looked empty (consumers).
    empty: WaitQueue,
}

// The auto impls would ignore T because AtomicPtr<T> is unconditionally
// Send + Sync; boxed elements are owned through those pointers, so both
// require T: Send.
unsafe impl<T: Send> Send for BlockingRingBuffer<T> {}
unsafe impl<T: Send> Sync for BlockingRingBuffer<T> {}

impl<T> BlockingRingBuffer<T> {
    /// Create a ring with the given number of slots, all empty.
    ///
    /// Capacity may be any nonzero value; slot addressing is
    /// `id % capacity`, not mask-based.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ChimeError::config("Capacity must be greater than zero"));
        }

        let slots = (0..capacity)
            .map(|_| AtomicPtr::new(ptr::null_mut()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            slots,
            capacity: capacity as u64,
            write_cursor: CachePadded::new(AtomicU64::new(0)),
            read_cursor: CachePadded::new(AtomicU64::new(0)),
            full: WaitQueue::new(),
            empty: WaitQueue::new(),
        })
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Advisory element count, clamped to `[0, capacity]`.
    ///
    /// A snapshot only; the cursors are read in `read`-then-`write`
    /// order so the result can transiently overshoot the true count but
    /// never undershoot it, hence the clamp.
    pub fn len(&self) -> usize {
        let rid = self.read_cursor.load(Ordering::SeqCst);
        let wid = self.write_cursor.load(Ordering::SeqCst);
        (wid - rid).min(self.capacity) as usize
    }

    /// Advisory emptiness check. Snapshot only.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert an element, blocking while the ring is full.
    ///
    /// # Errors
    ///
    /// Returns [`ChimeError::Interrupted`] if the calling thread's
    /// interrupt flag is set on entry or while blocked. In that case no
    /// slot has been claimed and the element is dropped.
    pub fn enqueue(&self, element: T) -> Result<()> {
        loop {
            if interrupt::take_pending() {
                return Err(ChimeError::Interrupted);
            }

            // rid before wid: both cursors only grow, so a wid sampled
            // after rid can only make `remaining` an over-approximation
            // of the true occupancy, never an under-approximation.
            let mut rid = self.read_cursor.load(Ordering::SeqCst);
            let mut wid = self.write_cursor.load(Ordering::SeqCst);
            let mut remaining = wid - rid;

            if remaining >= self.capacity {
                insights::record_enqueue_wait(remaining);
                loop {
                    let wn = self.full.prepare_wait();
                    rid = self.read_cursor.load(Ordering::SeqCst);
                    wid = self.write_cursor.load(Ordering::SeqCst);
                    remaining = wid - rid;
                    if remaining < self.capacity {
                        break;
                    }
                    wn.wait()?;
                }
            }
            assert!(
                remaining < self.capacity,
                "occupancy bound violated after full-wait loop"
            );

            let idx = self.index_of(wid);
            // A non-null slot here means either another producer beat us
            // to wid, or the previous cycle's element has not been
            // cleared yet. Yield rather than spin: the first case needs
            // a fresh wid, not this slot.
            if !self.slots[idx].load(Ordering::SeqCst).is_null() {
                thread::yield_now();
                continue;
            }

            if self
                .write_cursor
                .compare_exchange(wid, wid + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                // Exclusive claim on wid: the slot was observed null and
                // nothing else may write this slot until the next cycle.
                self.slots[idx].store(Box::into_raw(Box::new(element)), Ordering::SeqCst);
                // A consumer may already be suspended (or about to be).
                self.empty.signal();
                return Ok(());
            }
        }
    }

    /// Remove the element with the lowest unread slot id, blocking while
    /// the ring is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ChimeError::Interrupted`] if the calling thread's
    /// interrupt flag is set on entry or while blocked; no element is
    /// consumed in that case.
    pub fn dequeue(&self) -> Result<T> {
        loop {
            if interrupt::take_pending() {
                return Err(ChimeError::Interrupted);
            }

            // rid before wid, as in enqueue; with this order `remaining`
            // can never appear below its true value, so an apparent 0
            // really means nothing is claimable right now.
            let mut rid = self.read_cursor.load(Ordering::SeqCst);
            let mut wid = self.write_cursor.load(Ordering::SeqCst);
            let mut remaining = wid - rid;

            if remaining == 0 {
                insights::record_dequeue_wait();
                loop {
                    let wn = self.empty.prepare_wait();
                    rid = self.read_cursor.load(Ordering::SeqCst);
                    wid = self.write_cursor.load(Ordering::SeqCst);
                    remaining = wid - rid;
                    if remaining > 0 {
                        break;
                    }
                    wn.wait()?;
                }
            }
            assert!(remaining > 0, "occupancy bound violated after empty-wait loop");

            let idx = self.index_of(rid);
            // Read the candidate before attempting the claim. The
            // pointer is stable across the CAS: no producer may store
            // into an occupied slot, and only the CAS winner for rid may
            // consume it. A null here means either another consumer
            // already took rid and cleared the slot (retry with a fresh
            // rid), or the producer that claimed rid has not stored yet
            // (retry until it lands). Yield rather than spin.
            let candidate = self.slots[idx].load(Ordering::SeqCst);
            if candidate.is_null() {
                thread::yield_now();
                continue;
            }

            if self
                .read_cursor
                .compare_exchange(rid, rid + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                // Plain store, not CAS: exactly one consumer holds the
                // winning claim for rid, and no producer can reuse the
                // slot before observing it null.
                self.slots[idx].store(ptr::null_mut(), Ordering::SeqCst);
                // A producer may already be suspended (or about to be).
                self.full.signal();
                // Exclusive ownership of the pointee follows from the
                // winning claim.
                return Ok(unsafe { *Box::from_raw(candidate) });
            }
        }
    }

    fn index_of(&self, id: u64) -> usize {
        (id % self.capacity) as usize
    }
}

impl<T> Drop for BlockingRingBuffer<T> {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            let p = *slot.get_mut();
            if !p.is_null() {
                // Still-resident element; sole owner by &mut self.
                unsafe { drop(Box::from_raw(p)) };
            }
        }
    }
}

impl<T> fmt::Debug for BlockingRingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingRingBuffer")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("read_cursor", &self.read_cursor.load(Ordering::SeqCst))
            .field("write_cursor", &self.write_cursor.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            BlockingRingBuffer::<u32>::new(0),
            Err(ChimeError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_single_thread_fifo_order() {
        let ring = BlockingRingBuffer::new(4).unwrap();
        for i in 0..4 {
            ring.enqueue(i).unwrap();
        }
        assert_eq!(ring.len(), 4);
        for i in 0..4 {
            assert_eq!(ring.dequeue().unwrap(), i);
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn test_wraparound_reuses_slots() {
        let ring = BlockingRingBuffer::new(3).unwrap();
        for i in 0..10 {
            ring.enqueue(i).unwrap();
            assert_eq!(ring.dequeue().unwrap(), i);
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn test_len_clamped_to_capacity() {
        let ring = BlockingRingBuffer::new(2).unwrap();
        ring.enqueue('a').unwrap();
        ring.enqueue('b').unwrap();
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.capacity(), 2);
    }

    #[test]
    fn test_capacity_one_blocks_and_alternates() {
        let ring = Arc::new(BlockingRingBuffer::new(1).unwrap());
        const COUNT: u64 = 1000;

        let producer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for i in 0..COUNT {
                    ring.enqueue(i).unwrap();
                }
            })
        };

        // At most one element is ever resident, and slot-id order makes
        // the single-producer stream come out in order.
        for i in 0..COUNT {
            assert_eq!(ring.dequeue().unwrap(), i);
        }
        producer.join().unwrap();
        assert!(ring.is_empty());
    }

    #[test]
    fn test_interrupt_unblocks_empty_dequeue() {
        let ring = Arc::new(BlockingRingBuffer::<u32>::new(4).unwrap());
        let (tx, rx) = mpsc::channel();

        let consumer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                tx.send(interrupt::current()).unwrap();
                ring.dequeue()
            })
        };

        let handle = rx.recv().unwrap();
        thread::sleep(Duration::from_millis(50));
        handle.interrupt();
        assert_eq!(consumer.join().unwrap(), Err(ChimeError::Interrupted));
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn test_drop_frees_resident_elements() {
        struct Counted(Arc<AtomicUsize>);
        impl Drop for Counted {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        {
            let ring = BlockingRingBuffer::new(8).unwrap();
            for _ in 0..3 {
                ring.enqueue(Counted(Arc::clone(&drops))).unwrap();
            }
            drop(ring.dequeue().unwrap());
            assert_eq!(drops.load(Ordering::SeqCst), 1);
        }
        assert_eq!(drops.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_debug_snapshot() {
        let ring = BlockingRingBuffer::new(4).unwrap();
        ring.enqueue(7u8).unwrap();
        let s = format!("{ring:?}");
        assert!(s.contains("capacity: 4"));
        assert!(s.contains("len: 1"));
    }
}
