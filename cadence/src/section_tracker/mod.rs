//! Active page-region tracking.
//!
//! Maps viewport movement to a single "active region" signal used for
//! navigation highlighting. Two interchangeable variants implement
//! [`VisibilityTracker`]:
//!
//! | Variant                     | Input                          | Rule                                   |
//! |-----------------------------|--------------------------------|----------------------------------------|
//! | [`PollingTracker`]          | throttled scroll events        | last region with `top <= pos + offset` |
//! | [`VisibilityDrivenTracker`] | host visibility notifications  | most visible region wins               |
//!
//! Callers depend only on the trait and obtain a tracker from
//! [`create_tracker`], which falls back to polling when the host has no
//! visibility primitive.

mod host;
mod model;
mod polling;
mod visibility;

use std::sync::Arc;

use tokio::sync::watch;

pub use host::{ScrollListener, ViewportHost, VisibilityListener};
pub use model::{
    NamedRegion, SectionTrackerState, StrategyParseError, TrackerConfig, TrackingStrategy,
    VisibilityEntry, VisibilityOptions, DEFAULT_TRACKER_OFFSET_PX, DEFAULT_TRACKER_THROTTLE_MS,
    DEFAULT_VISIBILITY_MARGIN, DEFAULT_VISIBILITY_THRESHOLDS,
};
pub use polling::{select_active_region, PollingTracker};
pub use visibility::VisibilityDrivenTracker;

use crate::scroll::{AnimateOptions, ScrollAnimation, ScrollAnimator};

/// Common contract of every section tracker.
pub trait VisibilityTracker: Send + Sync {
    /// Currently active region id.
    fn active_region_id(&self) -> Option<String>;

    /// Receive every state change.
    fn subscribe(&self) -> watch::Receiver<SectionTrackerState>;

    /// Current state.
    fn state(&self) -> SectionTrackerState;

    /// Which variant this is.
    fn strategy(&self) -> TrackingStrategy;

    /// Release every host subscription. Later calls are no-ops.
    fn destroy(&self);

    fn is_destroyed(&self) -> bool;
}

/// Build the tracker variant selected by `config.strategy`.
///
/// `Auto` picks the visibility variant when the host supports it. Requesting
/// `Visibility` from a host without the primitive degrades to polling.
pub fn create_tracker(
    host: Arc<dyn ViewportHost>,
    regions: Vec<NamedRegion>,
    config: &TrackerConfig,
) -> Box<dyn VisibilityTracker> {
    let use_visibility = match config.strategy {
        TrackingStrategy::Polling => false,
        TrackingStrategy::Auto => host.supports_visibility(),
        TrackingStrategy::Visibility => {
            if !host.supports_visibility() {
                tracing::warn!("Host has no visibility notifications; falling back to polling");
            }
            host.supports_visibility()
        }
    };

    if use_visibility {
        Box::new(VisibilityDrivenTracker::new(host, regions, config))
    } else {
        if config.strategy == TrackingStrategy::Auto {
            tracing::debug!("Visibility notifications unavailable, using polling tracker");
        }
        Box::new(PollingTracker::new(host, regions, config))
    }
}

/// Animate to a region's top, leaving `offset_px` of look-ahead above it.
///
/// Returns `None` if the region is unknown or not mounted.
pub fn scroll_to_region(
    animator: &ScrollAnimator,
    host: &dyn ViewportHost,
    regions: &[NamedRegion],
    region_id: &str,
    offset_px: f64,
    options: AnimateOptions,
) -> Option<ScrollAnimation> {
    let Some(region) = regions.iter().find(|region| region.id == region_id) else {
        tracing::debug!(region = region_id, "Unknown region, not scrolling");
        return None;
    };
    let Some(top) = host.region_top(&region.reference) else {
        tracing::debug!(region = region_id, "Region not mounted, not scrolling");
        return None;
    };
    Some(animator.animate_to(top - offset_px, options))
}
