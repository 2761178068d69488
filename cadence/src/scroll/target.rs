//! Scrollable surfaces.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// A host surface whose scroll offset can be read and written.
///
/// `offset` returns `None` once the surface is unmounted. Writers must treat
/// that as a soft stop, not an error.
pub trait ScrollTarget: Send + Sync + 'static {
    /// Current offset, or `None` if the surface is gone.
    fn offset(&self) -> Option<f64>;

    /// Move the surface. Ignored if the surface is gone.
    fn set_offset(&self, offset: f64);
}

/// In-memory scroll surface.
///
/// Backs headless hosts and tests; counts every write so callers can check
/// that a stopped animation no longer touches it.
#[derive(Debug, Default)]
pub struct ScrollPosition {
    offset: Mutex<Option<f64>>,
    writes: AtomicU64,
}

impl ScrollPosition {
    /// A mounted surface at `offset`.
    pub fn new(offset: f64) -> Self {
        Self {
            offset: Mutex::new(Some(offset)),
            writes: AtomicU64::new(0),
        }
    }

    /// Detach the surface; later reads return `None`.
    pub fn unmount(&self) {
        *self.offset.lock() = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.offset.lock().is_some()
    }

    /// Number of accepted writes.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl ScrollTarget for ScrollPosition {
    fn offset(&self) -> Option<f64> {
        *self.offset.lock()
    }

    fn set_offset(&self, offset: f64) {
        let mut current = self.offset.lock();
        if current.is_some() {
            *current = Some(offset);
            self.writes.fetch_add(1, Ordering::Relaxed);
        }
    }
}
