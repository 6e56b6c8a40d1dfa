pub mod observer;
pub mod sentinel;

pub use observer::{IntersectionWatcher, ObserverOptions};
pub use sentinel::{SentinelId, SentinelState, SentinelTracker};

/// Something that reports when registered targets enter the viewport.
pub trait ViewportObserver {
    type Target: Clone + PartialEq;

    /// Sentinel id previously assigned to `target` by [`observe`](Self::observe).
    fn sentinel_of(target: &Self::Target) -> Option<SentinelId>;

    fn observe(&mut self, id: SentinelId, target: &Self::Target);
    fn unobserve(&mut self, id: SentinelId);
    fn disconnect(&mut self);
}
