//! Per-client request admission.
//!
//! The orchestrator only sees the `RateLimiter` trait, so deployments can
//! swap the in-process window for a shared store. `FixedWindowLimiter` is
//! per-process and resets on restart; it is a fairness measure, not a
//! security boundary.

mod window;

pub use window::FixedWindowLimiter;

/// Decides whether a client may start another analysis.
pub trait RateLimiter: Send + Sync {
    /// Counts one request for `key` and returns whether it is admitted.
    fn allow(&self, key: &str) -> bool;
}

impl<L: RateLimiter + ?Sized> RateLimiter for std::sync::Arc<L> {
    fn allow(&self, key: &str) -> bool {
        (**self).allow(key)
    }
}
