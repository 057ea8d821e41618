//! Cooperative suspension seams between batches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Hook invoked at every batch boundary.
///
/// Implementations map the boundary onto the host's concurrency primitive:
/// yielding the thread, pumping a UI loop, or doing nothing at all.
pub trait YieldPoint {
    /// Give control back to the host before the next batch runs.
    fn yield_now(&mut self);
}

/// Runs batches back to back.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoYield;

impl YieldPoint for NoYield {
    fn yield_now(&mut self) {}
}

/// Yields the OS thread between batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadYield;

impl YieldPoint for ThreadYield {
    fn yield_now(&mut self) {
        std::thread::yield_now();
    }
}

impl<F: FnMut()> YieldPoint for F {
    fn yield_now(&mut self) {
        self()
    }
}

/// Shared flag requesting that a computation stop at its next batch boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
