//! Section tracking data types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

/// Default look-ahead added to the scroll position when polling.
pub const DEFAULT_TRACKER_OFFSET_PX: f64 = 100.0;

/// Default scroll-event throttle interval.
pub const DEFAULT_TRACKER_THROTTLE_MS: u64 = 100;

/// Default visibility margin: a region counts once it reaches the upper half
/// of the viewport.
pub const DEFAULT_VISIBILITY_MARGIN: &str = "0px 0px -50% 0px";

/// Default visibility-ratio thresholds that trigger notifications.
pub const DEFAULT_VISIBILITY_THRESHOLDS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// A trackable page region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedRegion {
    /// Stable identifier, published as the active region.
    pub id: String,
    /// Host-side reference used to locate the region (e.g. an element id).
    pub reference: String,
    /// Human-readable label for navigation.
    pub label: String,
}

impl NamedRegion {
    pub fn new(
        id: impl Into<String>,
        reference: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            reference: reference.into(),
            label: label.into(),
        }
    }
}

/// Published tracker state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionTrackerState {
    /// Currently active region. `None` only before the first measurement.
    pub active_region_id: Option<String>,
    /// Last known visibility ratio per region id. Empty for the polling
    /// variant.
    pub visibility_ratios: BTreeMap<String, f64>,
}

/// One visibility notification from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityEntry {
    /// Whether the region intersects the (margin-adjusted) viewport.
    pub is_intersecting: bool,
    /// Visible fraction of the region in `[0, 1]`.
    pub ratio: f64,
}

impl VisibilityEntry {
    pub fn visible(ratio: f64) -> Self {
        Self {
            is_intersecting: true,
            ratio,
        }
    }

    pub fn hidden() -> Self {
        Self {
            is_intersecting: false,
            ratio: 0.0,
        }
    }
}

/// How the host should report visibility changes.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityOptions {
    /// CSS-style margin applied to the viewport.
    pub root_margin: String,
    /// Ratios at which a notification fires.
    pub thresholds: Vec<f64>,
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self {
            root_margin: DEFAULT_VISIBILITY_MARGIN.to_string(),
            thresholds: DEFAULT_VISIBILITY_THRESHOLDS.to_vec(),
        }
    }
}

/// Which tracker variant to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingStrategy {
    /// Visibility-driven when the host supports it, polling otherwise.
    #[default]
    Auto,
    /// Throttled scroll-position polling.
    Polling,
    /// Host visibility notifications.
    Visibility,
}

impl TrackingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingStrategy::Auto => "auto",
            TrackingStrategy::Polling => "polling",
            TrackingStrategy::Visibility => "visibility",
        }
    }
}

impl fmt::Display for TrackingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown tracking strategy name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tracking strategy '{0}' (expected auto, polling or visibility)")]
pub struct StrategyParseError(pub String);

impl FromStr for TrackingStrategy {
    type Err = StrategyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(TrackingStrategy::Auto),
            "polling" => Ok(TrackingStrategy::Polling),
            "visibility" => Ok(TrackingStrategy::Visibility),
            other => Err(StrategyParseError(other.to_string())),
        }
    }
}

/// Tracker configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Look-ahead in pixels added to the scroll position when polling.
    pub offset_px: f64,
    /// Minimum spacing between handled scroll events when polling.
    pub throttle: Duration,
    /// Options passed to the host's visibility notifications.
    pub visibility: VisibilityOptions,
    pub strategy: TrackingStrategy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            offset_px: DEFAULT_TRACKER_OFFSET_PX,
            throttle: Duration::from_millis(DEFAULT_TRACKER_THROTTLE_MS),
            visibility: VisibilityOptions::default(),
            strategy: TrackingStrategy::Auto,
        }
    }
}

/// Publishes tracker state to subscribers.
#[derive(Debug)]
pub(crate) struct StatePublisher {
    state: watch::Sender<SectionTrackerState>,
}

impl StatePublisher {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(SectionTrackerState::default());
        Self { state }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SectionTrackerState> {
        self.state.subscribe()
    }

    pub(crate) fn snapshot(&self) -> SectionTrackerState {
        self.state.borrow().clone()
    }

    pub(crate) fn active_region_id(&self) -> Option<String> {
        self.state.borrow().active_region_id.clone()
    }

    /// Apply `update`, notifying subscribers only if the state changed.
    pub(crate) fn update<F>(&self, update: F)
    where
        F: FnOnce(&mut SectionTrackerState),
    {
        self.state.send_if_modified(|state| {
            let before = state.clone();
            update(state);
            if state.active_region_id != before.active_region_id {
                tracing::debug!(
                    from = before.active_region_id.as_deref().unwrap_or("-"),
                    to = state.active_region_id.as_deref().unwrap_or("-"),
                    "Active region changed"
                );
            }
            *state != before
        });
    }
}
