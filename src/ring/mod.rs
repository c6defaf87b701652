//! Bounded blocking ring buffers.

pub mod blocking_ring_buffer;

pub use blocking_ring_buffer::BlockingRingBuffer;
