//! Scroll-position polling tracker.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;

use super::host::ViewportHost;
use super::model::{NamedRegion, SectionTrackerState, StatePublisher, TrackerConfig, TrackingStrategy};
use super::VisibilityTracker;
use crate::scheduler::{Disposer, Throttle};

/// Pick the active region from measured region tops.
///
/// `region_tops` is in document order; `None` marks a region that is not
/// mounted and is skipped. Returns the index of the last region whose top is
/// at or above `scroll_position + offset`, or the first mounted region if
/// none qualifies. Returns `None` only when no region is mounted.
pub fn select_active_region(
    region_tops: &[Option<f64>],
    scroll_position: f64,
    offset: f64,
) -> Option<usize> {
    let probe = scroll_position + offset;
    let mounted = || {
        region_tops
            .iter()
            .enumerate()
            .filter_map(|(index, top)| top.map(|top| (index, top)))
    };

    mounted()
        .filter(|(_, top)| *top <= probe)
        .last()
        .or_else(|| mounted().next())
        .map(|(index, _)| index)
}

type PassThrough = fn(f64) -> f64;

struct PollingShared {
    host: Arc<dyn ViewportHost>,
    regions: Vec<NamedRegion>,
    offset: f64,
    throttle: Mutex<Throttle<PassThrough>>,
    publisher: StatePublisher,
    destroyed: AtomicBool,
}

impl PollingShared {
    fn on_scroll(&self, position: f64) {
        if self.destroyed.load(Ordering::Acquire) {
            return;
        }
        let accepted = self.throttle.lock().call(position);
        if let Some(position) = accepted {
            self.measure(position);
        }
    }

    fn measure(&self, position: f64) {
        let tops: Vec<Option<f64>> = self
            .regions
            .iter()
            .map(|region| {
                let top = self.host.region_top(&region.reference);
                if top.is_none() {
                    tracing::trace!(region = %region.id, "Region not mounted, skipping");
                }
                top
            })
            .collect();

        let Some(index) = select_active_region(&tops, position, self.offset) else {
            return;
        };
        let id = self.regions[index].id.clone();
        self.publisher
            .update(|state| state.active_region_id = Some(id));
    }
}

/// Tracks the active region by measuring region offsets on scroll.
///
/// Scroll events are throttled; a burst's trailing events are dropped, so
/// call [`refresh`](Self::refresh) after programmatic jumps.
pub struct PollingTracker {
    shared: Arc<PollingShared>,
    subscription: Mutex<Option<Disposer>>,
}

impl PollingTracker {
    /// Subscribe to `host` scroll events and take the first measurement.
    pub fn new(host: Arc<dyn ViewportHost>, regions: Vec<NamedRegion>, config: &TrackerConfig) -> Self {
        let shared = Arc::new(PollingShared {
            host: Arc::clone(&host),
            regions,
            offset: config.offset_px,
            throttle: Mutex::new(Throttle::new(config.throttle, std::convert::identity as PassThrough)),
            publisher: StatePublisher::new(),
            destroyed: AtomicBool::new(false),
        });

        let weak: Weak<PollingShared> = Arc::downgrade(&shared);
        let subscription = host.subscribe_scroll(Box::new(move |position| {
            if let Some(shared) = weak.upgrade() {
                shared.on_scroll(position);
            }
        }));

        shared.measure(host.scroll_position());
        tracing::debug!(regions = shared.regions.len(), "Polling section tracker started");

        Self {
            shared,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    /// Measure immediately, bypassing the throttle.
    pub fn refresh(&self) {
        if !self.is_destroyed() {
            self.shared.measure(self.shared.host.scroll_position());
        }
    }

    /// Scroll events dropped by the throttle so far.
    pub fn suppressed_events(&self) -> u64 {
        self.shared.throttle.lock().suppressed()
    }

    /// Configured regions in document order.
    pub fn regions(&self) -> &[NamedRegion] {
        &self.shared.regions
    }
}

impl VisibilityTracker for PollingTracker {
    fn active_region_id(&self) -> Option<String> {
        self.shared.publisher.active_region_id()
    }

    fn subscribe(&self) -> watch::Receiver<SectionTrackerState> {
        self.shared.publisher.subscribe()
    }

    fn state(&self) -> SectionTrackerState {
        self.shared.publisher.snapshot()
    }

    fn strategy(&self) -> TrackingStrategy {
        TrackingStrategy::Polling
    }

    fn destroy(&self) {
        if self.shared.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.dispose();
        }
        tracing::debug!("Polling section tracker destroyed");
    }

    fn is_destroyed(&self) -> bool {
        self.shared.destroyed.load(Ordering::Acquire)
    }
}

impl Drop for PollingTracker {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for PollingTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingTracker")
            .field("regions", &self.shared.regions.len())
            .field("offset", &self.shared.offset)
            .field("active", &self.active_region_id())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
