//! Engine bootstrap.
//!
//! Owns the process-wide instances (performance monitor, cache sweeper,
//! frame-rate sampler, quality governor) and hands out the per-view pieces
//! (caches, scroll animators, section trackers) wired to them.
//!
//! ```text
//!              ┌──────────────┐   frames   ┌──────────────────┐
//!  host ──────►│  FrameLoop   │───────────►│ FrameRateSampler │
//!              └──────┬───────┘            └────────┬─────────┘
//!                     │                             │ metrics
//!                     ▼                             ▼
//!              ┌──────────────┐            ┌──────────────────┐
//!              │ScrollAnimator│            │ QualityGovernor  │──► settings
//!              └──────────────┘            └──────────────────┘
//!
//!              ┌──────────────┐  weak refs ┌──────────────────┐
//!              │ DataCache<T> │◄───────────│   CacheSweeper   │
//!              └──────┬───────┘            └──────────────────┘
//!                     │ hits/misses
//!                     ▼
//!              ┌──────────────────┐
//!              │PerformanceMonitor│──► report
//!              └──────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::cache::{CacheSweeper, DataCache};
use crate::config::EngineConfig;
use crate::quality::{DeviceProfile, FrameRateSampler, MetricsSnapshot, QualityGovernor, QualitySettings};
use crate::scheduler::FrameLoop;
use crate::scroll::{ScrollAnimator, ScrollTarget};
use crate::section_tracker::{create_tracker, NamedRegion, ViewportHost, VisibilityTracker};
use crate::telemetry::{PerformanceMonitor, PerformanceReport};

/// A live animator and the address of the target it drives.
///
/// The animator keeps its target alive, so the address cannot be reused
/// while the entry is live.
struct RegisteredAnimator {
    target: usize,
    animator: Weak<ScrollAnimator>,
}

fn target_address(target: &Arc<dyn ScrollTarget>) -> usize {
    Arc::as_ptr(target) as *const () as usize
}

/// Running engine instance.
///
/// Dropping the engine shuts it down.
pub struct Engine {
    config: EngineConfig,
    frames: FrameLoop,
    monitor: Arc<PerformanceMonitor>,
    sweeper: CacheSweeper,
    sampler: FrameRateSampler,
    governor: QualityGovernor,
    animators: Mutex<Vec<RegisteredAnimator>>,
    shut_down: AtomicBool,
}

impl Engine {
    /// Construct and start every shared component.
    ///
    /// Must be called inside a Tokio runtime. A [`FrameLoop::unavailable`]
    /// loop is accepted; the engine then reports the lowest quality tier and
    /// scroll animations jump straight to their target.
    pub fn start(
        config: EngineConfig,
        frames: FrameLoop,
        device: DeviceProfile,
        reduced_motion: bool,
    ) -> Self {
        let monitor = Arc::new(PerformanceMonitor::new(config.monitor.capacity));

        let sweeper = CacheSweeper::new(config.cache.sweep_interval);
        sweeper.start();

        let sampler = FrameRateSampler::new(config.sampler.clone(), device, frames.clone());
        sampler.start();

        let governor = QualityGovernor::start(config.quality, &sampler, reduced_motion);

        tracing::info!(
            frames_available = frames.is_available(),
            form_factor = %sampler.device().form_factor,
            capable_gpu = sampler.device().has_capable_gpu(),
            reduced_motion,
            "Engine started"
        );

        Self {
            config,
            frames,
            monitor,
            sweeper,
            sampler,
            governor,
            animators: Mutex::new(Vec::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Effective configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared frame loop.
    pub fn frames(&self) -> &FrameLoop {
        &self.frames
    }

    /// Shared performance monitor.
    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub fn sampler(&self) -> &FrameRateSampler {
        &self.sampler
    }

    /// Create a cache reporting to the engine's monitor and swept by the
    /// engine's sweeper.
    pub fn create_cache<T>(&self, name: impl Into<String>) -> Arc<DataCache<T>>
    where
        T: Clone + Send + 'static,
    {
        let cache = Arc::new(DataCache::new(
            name,
            self.config.cache.ttl,
            Some(Arc::clone(&self.monitor)),
        ));
        self.sweeper.register(&cache);
        cache
    }

    /// Number of live caches created through [`create_cache`](Self::create_cache).
    pub fn cache_count(&self) -> usize {
        self.sweeper.registered()
    }

    /// Scroll animator for `target` on the shared frame loop.
    ///
    /// At most one animator exists per target, so a new animation on a
    /// target always supersedes the one in flight. Asking again for a target
    /// that already has a live animator returns that animator. The animator
    /// follows the engine's reduced-motion preference.
    pub fn scroll_animator(&self, target: Arc<dyn ScrollTarget>) -> Arc<ScrollAnimator> {
        let address = target_address(&target);

        let mut animators = self.animators.lock();
        animators.retain(|entry| entry.animator.strong_count() > 0);
        let existing = animators
            .iter()
            .filter(|entry| entry.target == address)
            .find_map(|entry| entry.animator.upgrade())
            .filter(|animator| !animator.is_destroyed());
        if let Some(animator) = existing {
            return animator;
        }

        let animator = Arc::new(ScrollAnimator::new(
            target,
            self.frames.clone(),
            self.config.scroll,
        ));
        animator.set_reduced_motion(self.governor.reduced_motion());
        animators.retain(|entry| entry.target != address);
        animators.push(RegisteredAnimator {
            target: address,
            animator: Arc::downgrade(&animator),
        });
        animator
    }

    /// Create a section tracker using the configured strategy.
    pub fn section_tracker(
        &self,
        host: Arc<dyn ViewportHost>,
        regions: Vec<NamedRegion>,
    ) -> Box<dyn VisibilityTracker> {
        create_tracker(host, regions, &self.config.tracker)
    }

    /// Quality settings in effect now.
    pub fn quality(&self) -> QualitySettings {
        self.governor.current()
    }

    /// Metrics snapshot [`quality`](Self::quality) was derived from.
    pub fn quality_basis(&self) -> MetricsSnapshot {
        self.governor.basis()
    }

    /// Receive every quality settings change.
    pub fn subscribe_quality(&self) -> watch::Receiver<QualitySettings> {
        self.governor.subscribe()
    }

    /// Latest frame-rate metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.sampler.metrics()
    }

    /// Propagate the host's reduced-motion preference to the quality tier and
    /// to every live scroll animator.
    pub fn set_reduced_motion(&self, reduced_motion: bool) {
        self.governor.set_reduced_motion(reduced_motion);

        let mut animators = self.animators.lock();
        animators.retain(|entry| match entry.animator.upgrade() {
            Some(animator) => {
                animator.set_reduced_motion(reduced_motion);
                true
            }
            None => false,
        });
    }

    /// Summary of everything the monitor recorded.
    pub fn report(&self) -> PerformanceReport {
        self.monitor.report()
    }

    /// Stop every background task and destroy live animators.
    ///
    /// Idempotent. Caches and the monitor stay readable afterwards.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        self.governor.stop();
        self.sampler.stop();
        self.sweeper.stop();

        let animators = std::mem::take(&mut *self.animators.lock());
        for animator in animators.iter().filter_map(|entry| entry.animator.upgrade()) {
            animator.destroy();
        }

        tracing::info!("Engine shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("quality", &self.quality().tier)
            .field("caches", &self.cache_count())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cache::Fingerprint;
    use crate::quality::{FormFactor, QualityTier};
    use crate::scheduler::ChannelFrameSource;
    use crate::scroll::{AnimateOptions, AnimationOutcome, ScrollPosition, ScrollTarget};

    fn desktop() -> DeviceProfile {
        DeviceProfile::new(Some("NVIDIA GeForce RTX 4070".to_string()), FormFactor::Desktop)
    }

    #[tokio::test(start_paused = true)]
    async fn test_caches_report_to_monitor() {
        let engine = Engine::start(
            EngineConfig::default(),
            FrameLoop::unavailable(),
            desktop(),
            false,
        );
        let cache = engine.create_cache::<Vec<u32>>("totals");
        let key = Fingerprint::from_keys("totals", ["a", "b"]);

        assert!(cache.get(&key).is_none());
        cache.set(key.clone(), vec![1, 2]);
        assert_eq!(cache.get(&key), Some(vec![1, 2]));

        let report = engine.report();
        assert_eq!(report.caches["totals"].hits, 1);
        assert_eq!(report.caches["totals"].misses, 1);
        assert_eq!(engine.cache_count(), 1);

        drop(cache);
        assert_eq!(engine.cache_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_frames_pin_low_tier() {
        let engine = Engine::start(
            EngineConfig::default(),
            FrameLoop::unavailable(),
            desktop(),
            false,
        );

        assert_eq!(engine.metrics().fps, 0.0);
        assert_eq!(engine.quality().tier, QualityTier::Low);

        engine.set_reduced_motion(true);
        assert_eq!(engine.quality().tier, QualityTier::Minimal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_animators_follow_reduced_motion() {
        let engine = Engine::start(
            EngineConfig::default(),
            FrameLoop::unavailable(),
            desktop(),
            true,
        );
        let position = Arc::new(ScrollPosition::new(0.0));
        let animator = engine.scroll_animator(position.clone());

        let outcome = animator.animate_to(500.0, AnimateOptions::new()).await;
        assert_eq!(outcome, AnimationOutcome::Completed);
        assert_eq!(position.offset(), Some(500.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_animation_in_flight_per_target() {
        let (sender, source) = ChannelFrameSource::new();
        let engine = Engine::start(
            EngineConfig::default(),
            FrameLoop::start(source),
            desktop(),
            false,
        );
        let position = Arc::new(ScrollPosition::new(0.0));
        let first = engine.scroll_animator(position.clone());
        let second = engine.scroll_animator(position.clone());
        assert!(Arc::ptr_eq(&first, &second));

        let other = engine.scroll_animator(Arc::new(ScrollPosition::new(0.0)));
        assert!(!Arc::ptr_eq(&first, &other));

        let down = first.animate_to(1000.0, AnimateOptions::new().duration(Duration::from_millis(100)));
        let up = second.animate_to(-1000.0, AnimateOptions::new().duration(Duration::from_millis(100)));

        let pump = tokio::spawn(async move {
            for _ in 0..20 {
                sender.tick();
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        });

        assert_eq!(down.await, AnimationOutcome::Cancelled);
        assert_eq!(up.await, AnimationOutcome::Completed);
        assert_eq!(position.offset(), Some(-1000.0));
        pump.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroyed_animator_is_replaced() {
        let engine = Engine::start(
            EngineConfig::default(),
            FrameLoop::unavailable(),
            desktop(),
            false,
        );
        let position = Arc::new(ScrollPosition::new(0.0));
        let first = engine.scroll_animator(position.clone());
        first.destroy();

        let second = engine.scroll_animator(position.clone());
        assert!(!Arc::ptr_eq(&first, &second));
        let outcome = second.animate_to(250.0, AnimateOptions::new()).await;
        assert_eq!(outcome, AnimationOutcome::Completed);
        assert_eq!(position.offset(), Some(250.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_is_idempotent() {
        let engine = Engine::start(
            EngineConfig::default(),
            FrameLoop::unavailable(),
            desktop(),
            false,
        );
        let animator = engine.scroll_animator(Arc::new(ScrollPosition::new(0.0)));

        engine.shutdown();
        engine.shutdown();

        assert!(engine.is_shut_down());
        assert!(animator.is_destroyed());
        assert!(!engine.sampler().is_running());

        // Still readable after shutdown.
        let _ = engine.report();
        tokio::time::advance(Duration::from_secs(120)).await;
    }
}
