//! Integration tests for section tracking.
//!
//! These tests drive both tracker variants through the public API with a
//! scripted viewport:
//! - scroll events → polling tracker → active region
//! - visibility notifications → visibility tracker → active region
//! - navigation clicks → scroll animation → tracker follows
//!
//! Run with: `cargo test --test section_tracker_integration`

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use cadence::scheduler::{ChannelFrameSource, Disposer, FrameLoop};
use cadence::scroll::{AnimateOptions, AnimationOutcome, ScrollAnimator, ScrollConfig, ScrollTarget};
use cadence::section_tracker::{
    create_tracker, scroll_to_region, NamedRegion, ScrollListener, TrackerConfig,
    TrackingStrategy, ViewportHost, VisibilityEntry, VisibilityListener, VisibilityOptions,
};

// ============================================================================
// Test Host
// ============================================================================

/// A page whose scroll position is also the scroll target.
#[derive(Default)]
struct Page {
    position: Mutex<f64>,
    tops: HashMap<String, f64>,
    observe: bool,
    scroll_listeners: Arc<Mutex<Vec<Arc<dyn Fn(f64) + Send + Sync>>>>,
    visibility_listeners: Arc<Mutex<Vec<(String, Arc<dyn Fn(VisibilityEntry) + Send + Sync>)>>>,
    released: Arc<AtomicUsize>,
}

impl Page {
    fn new(observe: bool) -> Arc<Self> {
        let tops = LANDING_PAGE
            .iter()
            .map(|(id, top)| (id.to_string(), *top))
            .collect();
        Arc::new(Self {
            tops,
            observe,
            ..Self::default()
        })
    }

    fn scroll(&self, position: f64) {
        *self.position.lock() = position;
        let listeners = self.scroll_listeners.lock().clone();
        for listener in listeners {
            listener(position);
        }
    }

    fn notify(&self, reference: &str, entry: VisibilityEntry) {
        let listeners: Vec<_> = self
            .visibility_listeners
            .lock()
            .iter()
            .filter(|(r, _)| r == reference)
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(entry);
        }
    }

    fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn counted_disposer(&self) -> Disposer {
        let released = Arc::clone(&self.released);
        Disposer::new(move || {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }
}

impl ViewportHost for Page {
    fn scroll_position(&self) -> f64 {
        *self.position.lock()
    }

    fn region_top(&self, reference: &str) -> Option<f64> {
        self.tops.get(reference).copied()
    }

    fn subscribe_scroll(&self, listener: ScrollListener) -> Disposer {
        self.scroll_listeners.lock().push(Arc::from(listener));
        self.counted_disposer()
    }

    fn supports_visibility(&self) -> bool {
        self.observe
    }

    fn observe_visibility(
        &self,
        reference: &str,
        _options: &VisibilityOptions,
        listener: VisibilityListener,
    ) -> Option<Disposer> {
        if !self.observe || !self.tops.contains_key(reference) {
            return None;
        }
        self.visibility_listeners
            .lock()
            .push((reference.to_string(), Arc::from(listener)));
        Some(self.counted_disposer())
    }
}

impl ScrollTarget for Page {
    fn offset(&self) -> Option<f64> {
        Some(*self.position.lock())
    }

    fn set_offset(&self, offset: f64) {
        self.scroll(offset);
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Region ids and tops of a typical landing page.
const LANDING_PAGE: &[(&str, f64)] = &[
    ("hero", 0.0),
    ("features", 800.0),
    ("pricing", 1600.0),
    ("contact", 2400.0),
];

fn regions() -> Vec<NamedRegion> {
    LANDING_PAGE
        .iter()
        .map(|(id, _)| NamedRegion::new(*id, *id, id.to_uppercase()))
        .collect()
}

fn polling_config() -> TrackerConfig {
    TrackerConfig {
        strategy: TrackingStrategy::Polling,
        throttle: Duration::ZERO,
        ..TrackerConfig::default()
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

/// Scrolling through the whole page visits every region in order.
#[test]
fn test_polling_walks_the_page() {
    let page = Page::new(false);
    let tracker = create_tracker(page.clone(), regions(), &polling_config());

    let mut visited = vec![tracker.active_region_id().unwrap()];
    for position in (0..=2600).step_by(100) {
        page.scroll(f64::from(position));
        let active = tracker.active_region_id().unwrap();
        if visited.last() != Some(&active) {
            visited.push(active);
        }
    }

    assert_eq!(visited, vec!["hero", "features", "pricing", "contact"]);
}

/// Overscroll above the first region keeps the first region active.
#[test]
fn test_polling_overscroll() {
    let page = Page::new(false);
    let tracker = create_tracker(page.clone(), regions(), &polling_config());

    page.scroll(-50.0);
    assert_eq!(tracker.active_region_id().as_deref(), Some("hero"));
}

/// Visibility notifications drive the active region and publish ratios.
#[test]
fn test_visibility_flow() {
    let page = Page::new(true);
    let tracker = create_tracker(page.clone(), regions(), &TrackerConfig::default());
    assert_eq!(tracker.strategy(), TrackingStrategy::Visibility);

    let mut updates = tracker.subscribe();

    page.notify("hero", VisibilityEntry::visible(1.0));
    page.notify("hero", VisibilityEntry::visible(0.5));
    page.notify("features", VisibilityEntry::visible(0.75));
    assert_eq!(tracker.active_region_id().as_deref(), Some("features"));

    page.notify("features", VisibilityEntry::hidden());
    assert_eq!(tracker.active_region_id().as_deref(), Some("hero"));

    assert!(updates.has_changed().unwrap());
    let state = updates.borrow_and_update().clone();
    assert_eq!(state.visibility_ratios["hero"], 0.5);
    assert_eq!(state.visibility_ratios["features"], 0.0);
}

/// Destroying either variant releases every subscription exactly once.
#[test]
fn test_teardown_releases_all_subscriptions() {
    let page = Page::new(true);
    let tracker = create_tracker(page.clone(), regions(), &TrackerConfig::default());
    tracker.destroy();
    tracker.destroy();
    drop(tracker);
    assert_eq!(page.released(), LANDING_PAGE.len());

    let page = Page::new(false);
    let tracker = create_tracker(page.clone(), regions(), &TrackerConfig::default());
    tracker.destroy();
    drop(tracker);
    assert_eq!(page.released(), 1);
}

/// A navigation click animates to the region and the polling tracker follows.
#[tokio::test(start_paused = true)]
async fn test_navigation_scroll_updates_tracker() {
    let page = Page::new(false);
    let tracker = create_tracker(page.clone(), regions(), &polling_config());

    let (sender, source) = ChannelFrameSource::new();
    let frames = FrameLoop::start(source);
    let config = ScrollConfig {
        duration: Duration::from_millis(100),
        ..ScrollConfig::default()
    };
    let animator = ScrollAnimator::new(page.clone(), frames, config);

    let animation = scroll_to_region(
        &animator,
        &*page,
        &regions(),
        "pricing",
        100.0,
        AnimateOptions::new(),
    )
    .expect("pricing is mounted");

    let pump = tokio::spawn(async move {
        for _ in 0..20 {
            sender.tick();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    });

    assert_eq!(animation.await, AnimationOutcome::Completed);
    pump.await.unwrap();

    assert_eq!(page.scroll_position(), 1500.0);
    assert_eq!(tracker.active_region_id().as_deref(), Some("pricing"));
}
