//! Insights - Observability for chime.
//!
//! Unified tracing and profiling hooks. Zero-cost when disabled.
//!
//! # Usage
//!
//! ## Basic tracing (console output)
//! ```toml
//! chime = { version = "0.1", features = ["tracing"] }
//! ```
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! ## Tracy profiler (real-time visualization)
//! ```toml
//! chime = { version = "0.1", features = ["tracy"] }
//! ```
//! ```rust,ignore
//! chime::init_tracy();
//! ```

/// Initialize Tracy profiler (call once at startup)
#[cfg(feature = "tracy")]
pub fn init_tracy() {
    use tracing_subscriber::layer::SubscriberExt;
    tracing::subscriber::set_global_default(
        tracing_subscriber::registry().with(tracing_tracy::TracyLayer::default()),
    )
    .expect("setup tracy layer");
}

#[cfg(not(feature = "tracy"))]
pub fn init_tracy() {}

/// Record a thread suspending on a wait node
#[cfg(feature = "tracing")]
#[inline]
pub(crate) fn record_park() {
    let _span = tracing::trace_span!("park").entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub(crate) fn record_park() {}

/// Record a wake being issued to a waiting thread
#[cfg(feature = "tracing")]
#[inline]
pub(crate) fn record_unpark() {
    tracing::trace!("unpark");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub(crate) fn record_unpark() {}

/// Record a producer entering the blocked-on-full path
#[cfg(feature = "tracing")]
#[inline]
pub(crate) fn record_enqueue_wait(remaining: u64) {
    tracing::trace!(remaining, "enqueue blocked, ring full");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub(crate) fn record_enqueue_wait(_remaining: u64) {}

/// Record a consumer entering the blocked-on-empty path
#[cfg(feature = "tracing")]
#[inline]
pub(crate) fn record_dequeue_wait() {
    tracing::trace!("dequeue blocked, ring empty");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub(crate) fn record_dequeue_wait() {}
