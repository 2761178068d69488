//! Live frame-rate measurement.
//!
//! [`FpsCounter`] is the measurement state machine: it is fed frame
//! timestamps and emits a [`MetricsSnapshot`] once per sample window.
//! [`FrameRateSampler`] drives a counter from the shared [`FrameLoop`] and
//! publishes snapshots to subscribers.
//!
//! # Algorithm
//!
//! ```text
//! every frame:   frame_count += 1
//! elapsed >= W:  fps = round(frame_count * 1000 / elapsed_ms)
//!                if fps < drop_threshold { frame_drops += 1 }
//!                reset frame_count and window start, publish snapshot
//! ```

use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;

use super::device::DeviceProfile;
use crate::scheduler::{FrameLoop, FrameReceiver, TaskHandle};

/// Default length of one measurement window.
pub const DEFAULT_SAMPLE_WINDOW_MS: u64 = 1000;

/// Default fps below which a window counts as a frame drop.
pub const DEFAULT_FPS_DROP_THRESHOLD: f64 = 55.0;

/// Default number of dropped windows after which complex animations are off.
pub const DEFAULT_MAX_FRAME_DROPS: u32 = 5;

/// Frame rate assumed before the first window completes.
const INITIAL_FPS: f64 = 60.0;

/// Sampler configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// Length of one measurement window.
    pub sample_window: Duration,
    /// Windows below this fps increment the frame-drop counter.
    pub fps_drop_threshold: f64,
    /// Complex animations require fewer drops than this.
    pub max_frame_drops: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            sample_window: Duration::from_millis(DEFAULT_SAMPLE_WINDOW_MS),
            fps_drop_threshold: DEFAULT_FPS_DROP_THRESHOLD,
            max_frame_drops: DEFAULT_MAX_FRAME_DROPS,
        }
    }
}

/// Result of one measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Frames per second over the last window.
    pub fps: f64,
    /// Windows so far whose fps fell below the drop threshold.
    pub frame_drops: u32,
    /// Window length in milliseconds.
    pub sample_window_ms: u64,
    /// Memory usage reported by the host, if available.
    pub memory_usage_mb: Option<f64>,
}

impl MetricsSnapshot {
    /// Optimistic snapshot used before the first window completes.
    pub fn initial(config: &SamplerConfig) -> Self {
        Self {
            fps: INITIAL_FPS,
            frame_drops: 0,
            sample_window_ms: config.sample_window.as_millis() as u64,
            memory_usage_mb: None,
        }
    }

    /// Snapshot reported when the host cannot deliver frames at all.
    ///
    /// Zero fps pins the policy to its lowest animated tier.
    pub fn unavailable(config: &SamplerConfig) -> Self {
        Self {
            fps: 0.0,
            frame_drops: config.max_frame_drops,
            sample_window_ms: config.sample_window.as_millis() as u64,
            memory_usage_mb: None,
        }
    }
}

/// Whether the device can afford complex animations.
///
/// True iff the GPU heuristic holds, the device is not mobile, and the
/// measured rate is sustained (`fps >= drop threshold` with fewer than
/// `max_frame_drops` dropped windows).
pub fn can_handle_complex_animations(
    device: &DeviceProfile,
    metrics: &MetricsSnapshot,
    config: &SamplerConfig,
) -> bool {
    device.has_capable_gpu()
        && !device.is_mobile()
        && metrics.fps >= config.fps_drop_threshold
        && metrics.frame_drops < config.max_frame_drops
}

/// Frame counting state machine.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    config: SamplerConfig,
    frame_count: u32,
    window_start: Instant,
    frame_drops: u32,
}

impl FpsCounter {
    /// Start counting from `started_at`.
    pub fn new(config: SamplerConfig, started_at: Instant) -> Self {
        Self::resume(config, started_at, 0)
    }

    /// Start counting while keeping a previous frame-drop total.
    pub fn resume(config: SamplerConfig, started_at: Instant, frame_drops: u32) -> Self {
        Self {
            config,
            frame_count: 0,
            window_start: started_at,
            frame_drops,
        }
    }

    /// Record a frame rendered at `now`.
    ///
    /// Returns a snapshot when this frame closes a sample window.
    pub fn record_frame(&mut self, now: Instant) -> Option<MetricsSnapshot> {
        self.frame_count += 1;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.config.sample_window || elapsed.is_zero() {
            return None;
        }

        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let fps = (f64::from(self.frame_count) * 1000.0 / elapsed_ms).round();
        if fps < self.config.fps_drop_threshold {
            self.frame_drops = self.frame_drops.saturating_add(1);
        }

        self.frame_count = 0;
        self.window_start = now;

        Some(MetricsSnapshot {
            fps,
            frame_drops: self.frame_drops,
            sample_window_ms: self.config.sample_window.as_millis() as u64,
            memory_usage_mb: None,
        })
    }

    /// Frames counted in the current window.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Dropped windows so far.
    pub fn frame_drops(&self) -> u32 {
        self.frame_drops
    }
}

/// Continuous frame-rate sampler.
///
/// Subscribes to the shared frame loop while running. If the host has no
/// frame primitive, the sampler permanently reports
/// [`MetricsSnapshot::unavailable`] instead of failing.
pub struct FrameRateSampler {
    config: SamplerConfig,
    device: DeviceProfile,
    frames: FrameLoop,
    metrics: watch::Sender<MetricsSnapshot>,
    task: Mutex<Option<TaskHandle>>,
}

impl FrameRateSampler {
    /// Create a stopped sampler.
    pub fn new(config: SamplerConfig, device: DeviceProfile, frames: FrameLoop) -> Self {
        let initial = if frames.is_available() {
            MetricsSnapshot::initial(&config)
        } else {
            MetricsSnapshot::unavailable(&config)
        };
        let (metrics, _) = watch::channel(initial);

        Self {
            config,
            device,
            frames,
            metrics,
            task: Mutex::new(None),
        }
    }

    /// Start sampling. Calling this while already running is a no-op.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let Some(receiver) = self.frames.subscribe() else {
            tracing::warn!(
                "Host has no per-frame callback; reporting lowest quality tier permanently"
            );
            self.metrics
                .send_replace(MetricsSnapshot::unavailable(&self.config));
            return;
        };

        let counter = FpsCounter::resume(
            self.config.clone(),
            Instant::now(),
            self.metrics.borrow().frame_drops,
        );
        let metrics = self.metrics.clone();
        let device = self.device.clone();
        let config = self.config.clone();

        *task = Some(TaskHandle::spawn("frame-rate-sampler", move |token| async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = sample_frames(counter, receiver, metrics, device, config) => {}
            }
        }));

        tracing::debug!(
            window_ms = self.config.sample_window.as_millis() as u64,
            "Frame-rate sampler started"
        );
    }

    /// Stop sampling. Calling this while stopped is a no-op.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.cancel();
            tracing::debug!("Frame-rate sampler stopped");
        }
    }

    /// Whether the sampling task is alive.
    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Receive every new snapshot.
    pub fn subscribe(&self) -> watch::Receiver<MetricsSnapshot> {
        self.metrics.subscribe()
    }

    /// Latest snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        *self.metrics.borrow()
    }

    /// Capability verdict for the latest snapshot.
    pub fn can_handle_complex_animations(&self) -> bool {
        can_handle_complex_animations(&self.device, &self.metrics(), &self.config)
    }

    /// Sampler configuration.
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Device profile used for the capability verdict.
    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }
}

impl std::fmt::Debug for FrameRateSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRateSampler")
            .field("config", &self.config)
            .field("device", &self.device)
            .field("metrics", &self.metrics())
            .finish_non_exhaustive()
    }
}

impl Drop for FrameRateSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sample_frames(
    mut counter: FpsCounter,
    mut frames: FrameReceiver,
    metrics: watch::Sender<MetricsSnapshot>,
    device: DeviceProfile,
    config: SamplerConfig,
) {
    while let Some(now) = frames.next().await {
        if let Some(mut snapshot) = counter.record_frame(now) {
            snapshot.memory_usage_mb = device.memory_usage_mb();
            tracing::trace!(
                fps = snapshot.fps,
                frame_drops = snapshot.frame_drops,
                "Frame-rate window closed"
            );
            metrics.send_replace(snapshot);
        }
    }
    tracing::warn!("Frame loop closed; reporting lowest quality tier until restarted");
    metrics.send_replace(MetricsSnapshot::unavailable(&config));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::device::FormFactor;
    use crate::scheduler::ChannelFrameSource;

    /// Feed `ticks` evenly spaced frames spanning exactly one second.
    fn run_window(counter: &mut FpsCounter, start: Instant, ticks: u32) -> Option<MetricsSnapshot> {
        let mut last = None;
        for k in 1..=ticks {
            let at = start + Duration::from_secs_f64(f64::from(k) / f64::from(ticks));
            if let Some(snapshot) = counter.record_frame(at) {
                last = Some(snapshot);
            }
        }
        last
    }

    fn capable_desktop() -> DeviceProfile {
        DeviceProfile::new(Some("Apple M2".to_string()), FormFactor::Desktop)
    }

    #[test]
    fn test_sixty_ticks_per_second() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(SamplerConfig::default(), start);

        let snapshot = run_window(&mut counter, start, 60).expect("window should close");
        assert_eq!(snapshot.fps, 60.0);
        assert_eq!(snapshot.frame_drops, 0);
        assert_eq!(snapshot.sample_window_ms, 1000);
    }

    #[test]
    fn test_forty_ticks_per_second_counts_drop() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(SamplerConfig::default(), start);

        let snapshot = run_window(&mut counter, start, 40).expect("window should close");
        assert_eq!(snapshot.fps, 40.0);
        assert_eq!(snapshot.frame_drops, 1);
    }

    #[test]
    fn test_no_snapshot_before_window_closes() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(SamplerConfig::default(), start);

        for k in 1..60u32 {
            let at = start + Duration::from_secs_f64(f64::from(k) / 60.0);
            assert!(counter.record_frame(at).is_none());
        }
        assert_eq!(counter.frame_count(), 59);
    }

    #[test]
    fn test_drops_accumulate_across_windows() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(SamplerConfig::default(), start);

        run_window(&mut counter, start, 30);
        let second = start + Duration::from_secs(1);
        run_window(&mut counter, second, 60);
        let third = start + Duration::from_secs(2);
        let snapshot = run_window(&mut counter, third, 30).unwrap();

        assert_eq!(snapshot.frame_drops, 2);
        assert_eq!(counter.frame_drops(), 2);
    }

    #[test]
    fn test_uneven_gap_uses_real_elapsed_time() {
        // Host was backgrounded: one frame after 2.5s.
        let start = Instant::now();
        let mut counter = FpsCounter::new(SamplerConfig::default(), start);

        let snapshot = counter
            .record_frame(start + Duration::from_millis(2500))
            .unwrap();
        assert_eq!(snapshot.fps, 0.0);
        assert_eq!(snapshot.frame_drops, 1);
    }

    #[test]
    fn test_capability_requires_all_conditions() {
        let config = SamplerConfig::default();
        let good = MetricsSnapshot {
            fps: 60.0,
            frame_drops: 0,
            sample_window_ms: 1000,
            memory_usage_mb: None,
        };

        assert!(can_handle_complex_animations(&capable_desktop(), &good, &config));

        let phone = DeviceProfile::new(Some("Apple A17 GPU".to_string()), FormFactor::Mobile);
        assert!(!can_handle_complex_animations(&phone, &good, &config));

        let software = DeviceProfile::new(Some("SwiftShader".to_string()), FormFactor::Desktop);
        assert!(!can_handle_complex_animations(&software, &good, &config));

        let slow = MetricsSnapshot { fps: 54.0, ..good };
        assert!(!can_handle_complex_animations(&capable_desktop(), &slow, &config));

        let droppy = MetricsSnapshot {
            frame_drops: 5,
            ..good
        };
        assert!(!can_handle_complex_animations(&capable_desktop(), &droppy, &config));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_publishes_from_frame_loop() {
        let (sender, source) = ChannelFrameSource::new();
        let frames = FrameLoop::start(source);
        let device = capable_desktop().with_memory_probe(|| Some(64.0));
        let sampler = FrameRateSampler::new(SamplerConfig::default(), device, frames);
        let mut updates = sampler.subscribe();

        sampler.start();
        sampler.start();
        assert!(sampler.is_running());

        let start = Instant::now();
        for k in 1..=60u32 {
            sender.send(start + Duration::from_secs_f64(f64::from(k) / 60.0));
        }

        updates.changed().await.unwrap();
        let snapshot = *updates.borrow();
        assert_eq!(snapshot.fps, 60.0);
        assert_eq!(snapshot.memory_usage_mb, Some(64.0));
        assert!(sampler.can_handle_complex_animations());

        sampler.stop();
        sampler.stop();
        assert!(!sampler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_falls_back_when_source_ends() {
        let (sender, source) = ChannelFrameSource::new();
        let frames = FrameLoop::start(source);
        let sampler = FrameRateSampler::new(SamplerConfig::default(), capable_desktop(), frames.clone());
        let mut updates = sampler.subscribe();
        sampler.start();

        drop(sender);
        updates.changed().await.unwrap();

        assert_eq!(updates.borrow().fps, 0.0);
        assert!(!sampler.can_handle_complex_animations());
        assert!(!frames.is_available());

        // Restarting against an ended loop stays on the fallback.
        sampler.stop();
        sampler.start();
        assert!(!sampler.is_running());
        assert_eq!(sampler.metrics().fps, 0.0);
    }

    #[tokio::test]
    async fn test_sampler_without_frame_primitive_reports_lowest() {
        let sampler = FrameRateSampler::new(
            SamplerConfig::default(),
            capable_desktop(),
            FrameLoop::unavailable(),
        );

        sampler.start();
        assert!(!sampler.is_running());
        assert_eq!(sampler.metrics().fps, 0.0);
        assert!(!sampler.can_handle_complex_animations());
    }
}
