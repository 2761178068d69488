//! Quality tier selection.
//!
//! Maps measured frame rate to a discrete bucket of animation settings.
//!
//! | Tier    | Condition                               | Duration |
//! |---------|-----------------------------------------|----------|
//! | Minimal | reduced motion requested                | 0 ms     |
//! | High    | capable device AND fps >= 58            | 600 ms   |
//! | Medium  | fps >= 45                               | 400 ms   |
//! | Low     | otherwise                               | 200 ms   |
//!
//! The policy is a pure function of its inputs so it can be table-tested.

use std::fmt;

use serde::Serialize;

use super::sampler::MetricsSnapshot;

/// Default fps at which the highest tier unlocks.
pub const DEFAULT_FPS_GOOD_THRESHOLD: f64 = 58.0;

/// Default fps separating the medium and low tiers.
pub const DEFAULT_FPS_MEDIUM_THRESHOLD: f64 = 45.0;

/// Discrete animation-complexity bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Reduced motion: no animation at all.
    Minimal,
    /// Short, simple transitions only.
    Low,
    /// Standard transitions with blur.
    Medium,
    /// Everything enabled.
    High,
}

impl QualityTier {
    /// Short lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Minimal => "minimal",
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }

    /// Settings bundle for this tier.
    pub fn settings(self) -> QualitySettings {
        QualitySettings::for_tier(self)
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Animation parameters derived from a quality tier.
///
/// Never mutated directly; obtain a new value from [`QualityPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualitySettings {
    /// Tier these settings were derived from.
    pub tier: QualityTier,
    /// Whether complex (multi-layer, physics-like) animations may run.
    pub enable_complex_animations: bool,
    /// Delay between staggered children, in milliseconds.
    pub stagger_delay_ms: u64,
    /// Base animation duration, in milliseconds.
    pub animation_duration_ms: u64,
    /// Whether parallax scrolling effects may run.
    pub enable_parallax: bool,
    /// Whether backdrop blur may be used.
    pub enable_blur: bool,
}

impl QualitySettings {
    /// The fixed settings table.
    pub const fn for_tier(tier: QualityTier) -> Self {
        match tier {
            QualityTier::High => Self {
                tier,
                enable_complex_animations: true,
                stagger_delay_ms: 100,
                animation_duration_ms: 600,
                enable_parallax: true,
                enable_blur: true,
            },
            QualityTier::Medium => Self {
                tier,
                enable_complex_animations: false,
                stagger_delay_ms: 75,
                animation_duration_ms: 400,
                enable_parallax: false,
                enable_blur: true,
            },
            QualityTier::Low => Self {
                tier,
                enable_complex_animations: false,
                stagger_delay_ms: 0,
                animation_duration_ms: 200,
                enable_parallax: false,
                enable_blur: false,
            },
            QualityTier::Minimal => Self {
                tier,
                enable_complex_animations: false,
                stagger_delay_ms: 0,
                animation_duration_ms: 0,
                enable_parallax: false,
                enable_blur: false,
            },
        }
    }

    /// Settings used when reduced motion is requested.
    pub const fn minimal() -> Self {
        Self::for_tier(QualityTier::Minimal)
    }
}

/// Thresholds for tier selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityPolicy {
    /// Minimum fps for the high tier (with a capable device).
    pub fps_good_threshold: f64,
    /// Minimum fps for the medium tier.
    pub fps_medium_threshold: f64,
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            fps_good_threshold: DEFAULT_FPS_GOOD_THRESHOLD,
            fps_medium_threshold: DEFAULT_FPS_MEDIUM_THRESHOLD,
        }
    }
}

impl QualityPolicy {
    /// Select a tier.
    ///
    /// `can_handle_complex` is the sampler's capability verdict (GPU, device
    /// class, sustained fps). Reduced motion always wins.
    pub fn tier(
        &self,
        metrics: &MetricsSnapshot,
        can_handle_complex: bool,
        reduced_motion: bool,
    ) -> QualityTier {
        if reduced_motion {
            QualityTier::Minimal
        } else if can_handle_complex && metrics.fps >= self.fps_good_threshold {
            QualityTier::High
        } else if metrics.fps >= self.fps_medium_threshold {
            QualityTier::Medium
        } else {
            QualityTier::Low
        }
    }

    /// Select a tier and return its settings.
    pub fn settings(
        &self,
        metrics: &MetricsSnapshot,
        can_handle_complex: bool,
        reduced_motion: bool,
    ) -> QualitySettings {
        self.tier(metrics, can_handle_complex, reduced_motion)
            .settings()
    }
}

/// Quality settings under the default thresholds.
pub fn quality_settings(
    metrics: &MetricsSnapshot,
    can_handle_complex: bool,
    reduced_motion: bool,
) -> QualitySettings {
    QualityPolicy::default().settings(metrics, can_handle_complex, reduced_motion)
}
