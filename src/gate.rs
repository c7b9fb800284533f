//! Counting admission gate
//!
//! Bounds the number of simultaneously in-flight network operations. Both the
//! crawler's sub-prefix listings and the downloader's per-URL fetches pass
//! through a gate; a permit is held for the whole operation and released on
//! drop, whatever the outcome.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// The gate's semaphore was closed
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("admission gate closed")]
pub struct GateClosed;

/// Semaphore-backed admission gate with in-flight instrumentation
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    limit: usize,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl AdmissionGate {
    /// Create a gate admitting at most `limit` operations at once (minimum 1)
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free slot
    pub async fn admit(&self) -> Result<GatePermit, GateClosed> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GateClosed)?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        Ok(GatePermit {
            _permit: permit,
            in_flight: self.in_flight.clone(),
        })
    }

    /// Configured bound
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Operations currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous permits observed
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Slot held for the duration of one operation
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
