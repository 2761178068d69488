//! Visibility-notification driven tracker.
//!
//! Priority rule: a region crossing into view becomes active unless the
//! current active region is visible with a higher ratio (ties go to the
//! region earlier in document order). When the active region leaves view,
//! the most visible remaining region takes over. With nothing visible, the
//! last active region is kept.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;

use super::host::ViewportHost;
use super::model::{
    NamedRegion, SectionTrackerState, StatePublisher, TrackerConfig, TrackingStrategy,
    VisibilityEntry,
};
use super::VisibilityTracker;
use crate::scheduler::Disposer;

struct VisibilityShared {
    regions: Vec<NamedRegion>,
    /// Visible regions by document index, with their latest ratio.
    visible: Mutex<BTreeMap<usize, f64>>,
    publisher: StatePublisher,
    destroyed: AtomicBool,
}

impl VisibilityShared {
    fn index_of(&self, id: &str) -> Option<usize> {
        self.regions.iter().position(|region| region.id == id)
    }

    fn on_entry(&self, index: usize, entry: VisibilityEntry) {
        if self.destroyed.load(Ordering::Acquire) {
            return;
        }
        let Some(region) = self.regions.get(index) else {
            return;
        };

        let mut visible = self.visible.lock();
        if entry.is_intersecting {
            visible.insert(index, entry.ratio);
        } else {
            visible.remove(&index);
        }

        let active = self
            .publisher
            .active_region_id()
            .and_then(|id| self.index_of(&id));
        let next = if entry.is_intersecting {
            match active.and_then(|a| visible.get(&a).map(|ratio| (a, *ratio))) {
                Some((holder, ratio)) if holder != index && outranks((holder, ratio), (index, entry.ratio)) => {
                    Some(holder)
                }
                _ => Some(index),
            }
        } else if active == Some(index) || active.is_none() {
            most_visible(&visible).or(active)
        } else {
            active
        };

        let ratio = if entry.is_intersecting { entry.ratio } else { 0.0 };
        let id = region.id.clone();
        let next_id = next.map(|i| self.regions[i].id.clone());
        drop(visible);

        self.publisher.update(|state| {
            state.visibility_ratios.insert(id, ratio);
            if next_id.is_some() {
                state.active_region_id = next_id;
            }
        });
    }
}

/// Whether `a` beats `b`: higher ratio first, then earlier document order.
fn outranks(a: (usize, f64), b: (usize, f64)) -> bool {
    a.1 > b.1 || (a.1 == b.1 && a.0 < b.0)
}

fn most_visible(visible: &BTreeMap<usize, f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (&index, &ratio) in visible {
        if best.map_or(true, |current| outranks((index, ratio), current)) {
            best = Some((index, ratio));
        }
    }
    best.map(|(index, _)| index)
}

/// Tracks the active region from host visibility notifications.
pub struct VisibilityDrivenTracker {
    shared: Arc<VisibilityShared>,
    subscriptions: Mutex<Vec<Disposer>>,
}

impl VisibilityDrivenTracker {
    /// Observe every region. Regions the host cannot observe are skipped.
    pub fn new(host: Arc<dyn ViewportHost>, regions: Vec<NamedRegion>, config: &TrackerConfig) -> Self {
        let shared = Arc::new(VisibilityShared {
            regions,
            visible: Mutex::new(BTreeMap::new()),
            publisher: StatePublisher::new(),
            destroyed: AtomicBool::new(false),
        });

        let mut subscriptions = Vec::with_capacity(shared.regions.len());
        for (index, region) in shared.regions.iter().enumerate() {
            let weak: Weak<VisibilityShared> = Arc::downgrade(&shared);
            let listener = Box::new(move |entry: VisibilityEntry| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_entry(index, entry);
                }
            });
            match host.observe_visibility(&region.reference, &config.visibility, listener) {
                Some(disposer) => subscriptions.push(disposer),
                None => {
                    tracing::debug!(region = %region.id, "Region not observable, skipping");
                }
            }
        }

        tracing::debug!(
            regions = shared.regions.len(),
            observed = subscriptions.len(),
            margin = %config.visibility.root_margin,
            "Visibility section tracker started"
        );

        Self {
            shared,
            subscriptions: Mutex::new(subscriptions),
        }
    }

    /// Number of live host subscriptions.
    pub fn observed_regions(&self) -> usize {
        self.subscriptions.lock().len()
    }
}

impl VisibilityTracker for VisibilityDrivenTracker {
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
        TrackingStrategy::Visibility
    }

    fn destroy(&self) {
        if self.shared.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        for subscription in &subscriptions {
            subscription.dispose();
        }
        tracing::debug!(released = subscriptions.len(), "Visibility section tracker destroyed");
    }

    fn is_destroyed(&self) -> bool {
        self.shared.destroyed.load(Ordering::Acquire)
    }
}

impl Drop for VisibilityDrivenTracker {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for VisibilityDrivenTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityDrivenTracker")
            .field("regions", &self.shared.regions.len())
            .field("observed", &self.observed_regions())
            .field("active", &self.active_region_id())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
