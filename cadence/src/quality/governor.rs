//! Reactive quality settings.
//!
//! The governor listens to the sampler's metrics stream and republishes the
//! current [`QualitySettings`]. It recomputes only when a new snapshot lands
//! or the reduced-motion preference changes, so the tier moves at most once
//! per sample window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use super::device::DeviceProfile;
use super::policy::{QualityPolicy, QualitySettings};
use super::sampler::{
    can_handle_complex_animations, FrameRateSampler, MetricsSnapshot, SamplerConfig,
};
use crate::scheduler::TaskHandle;

struct GovernorState {
    policy: QualityPolicy,
    sampler_config: SamplerConfig,
    device: DeviceProfile,
    reduced_motion: AtomicBool,
    latest: Mutex<MetricsSnapshot>,
    settings: watch::Sender<QualitySettings>,
}

impl GovernorState {
    fn evaluate(&self, metrics: &MetricsSnapshot) -> QualitySettings {
        let capable = can_handle_complex_animations(&self.device, metrics, &self.sampler_config);
        self.policy
            .settings(metrics, capable, self.reduced_motion.load(Ordering::Relaxed))
    }

    /// Re-evaluate the latest snapshot, e.g. after a preference change.
    fn recompute(&self) {
        let latest = self.latest.lock();
        self.publish(&latest);
    }

    /// Adopt a new snapshot and publish the settings derived from it.
    ///
    /// The snapshot lock is held until the settings are published, so
    /// [`QualityGovernor::basis`] never runs ahead of [`QualityGovernor::current`].
    fn observe(&self, metrics: MetricsSnapshot) {
        let mut latest = self.latest.lock();
        *latest = metrics;
        self.publish(&latest);
    }

    fn publish(&self, metrics: &MetricsSnapshot) {
        let next = self.evaluate(metrics);

        self.settings.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            if current.tier != next.tier {
                tracing::info!(
                    from = %current.tier,
                    to = %next.tier,
                    fps = metrics.fps,
                    frame_drops = metrics.frame_drops,
                    "Quality tier changed"
                );
            }
            *current = next;
            true
        });
    }
}

/// Publishes the quality settings the UI should use right now.
pub struct QualityGovernor {
    state: Arc<GovernorState>,
    task: TaskHandle,
}

impl QualityGovernor {
    /// Start following `sampler`.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(policy: QualityPolicy, sampler: &FrameRateSampler, reduced_motion: bool) -> Self {
        let mut metrics_rx = sampler.subscribe();
        let latest = *metrics_rx.borrow_and_update();

        let (settings, _) = watch::channel(QualitySettings::minimal());
        let state = Arc::new(GovernorState {
            policy,
            sampler_config: sampler.config().clone(),
            device: sampler.device().clone(),
            reduced_motion: AtomicBool::new(reduced_motion),
            latest: Mutex::new(latest),
            settings,
        });
        let initial = state.evaluate(&latest);
        state.settings.send_replace(initial);
        tracing::info!(tier = %initial.tier, reduced_motion, "Quality governor started");

        let worker = Arc::clone(&state);
        let task = TaskHandle::spawn("quality-governor", move |token| async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    changed = metrics_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = *metrics_rx.borrow_and_update();
                        worker.observe(snapshot);
                    }
                }
            }
        });

        Self { state, task }
    }

    /// Settings in effect now.
    pub fn current(&self) -> QualitySettings {
        *self.state.settings.borrow()
    }

    /// Metrics snapshot the current settings were derived from.
    pub fn basis(&self) -> MetricsSnapshot {
        *self.state.latest.lock()
    }

    /// Receive every settings change.
    pub fn subscribe(&self) -> watch::Receiver<QualitySettings> {
        self.state.settings.subscribe()
    }

    /// Update the host's reduced-motion preference and recompute immediately.
    pub fn set_reduced_motion(&self, reduced_motion: bool) {
        let previous = self.state.reduced_motion.swap(reduced_motion, Ordering::Relaxed);
        if previous != reduced_motion {
            tracing::debug!(reduced_motion, "Reduced-motion preference changed");
            self.state.recompute();
        }
    }

    /// Current reduced-motion preference.
    pub fn reduced_motion(&self) -> bool {
        self.state.reduced_motion.load(Ordering::Relaxed)
    }

    /// Stop following the sampler. The last settings stay readable.
    pub fn stop(&self) {
        self.task.cancel();
    }
}

impl std::fmt::Debug for QualityGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityGovernor")
            .field("current", &self.current())
            .field("reduced_motion", &self.reduced_motion())
            .finish_non_exhaustive()
    }
}
