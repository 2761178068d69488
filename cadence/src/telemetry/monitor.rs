//! Bounded recorder for render timings and cache accesses.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::report::PerformanceReport;

/// Default ring buffer size.
pub const DEFAULT_MONITOR_CAPACITY: usize = 1000;

/// Renders slower than one 60 Hz frame are logged.
pub const FRAME_BUDGET: Duration = Duration::from_millis(16);

/// One recorded observation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Sample {
    Render { name: Arc<str>, duration: Duration },
    CacheAccess { name: Arc<str>, hit: bool },
}

/// Aggregates render durations and cache hit/miss counts.
///
/// Samples go into a fixed-capacity ring buffer; once full, the oldest sample
/// is evicted. Every recorder holds the lock only for one O(1) push, and
/// `report()` copies the buffer out before aggregating, so no sample is lost
/// to contention.
pub struct PerformanceMonitor {
    capacity: usize,
    samples: Mutex<VecDeque<Sample>>,
    evicted: AtomicU64,
}

impl PerformanceMonitor {
    /// Create a monitor keeping at most `capacity` samples (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            evicted: AtomicU64::new(0),
        }
    }

    /// Record how long a named render took.
    pub fn record_render(&self, name: &str, duration: Duration) {
        if duration > FRAME_BUDGET {
            tracing::debug!(
                operation = name,
                duration_ms = duration.as_secs_f64() * 1000.0,
                "Render exceeded frame budget"
            );
        }
        self.push(Sample::Render {
            name: Arc::from(name),
            duration,
        });
    }

    /// Record a hit or miss on a named cache.
    pub fn record_cache_access(&self, name: &str, hit: bool) {
        self.push(Sample::CacheAccess {
            name: Arc::from(name),
            hit,
        });
    }

    /// Start timing a render; the duration is recorded when the guard drops.
    pub fn time(&self, name: impl Into<String>) -> RenderTimer<'_> {
        RenderTimer {
            monitor: self,
            name: name.into(),
            started: Instant::now(),
            finished: false,
        }
    }

    /// Summarize the samples currently in the buffer.
    pub fn report(&self) -> PerformanceReport {
        let (samples, evicted) = {
            let samples = self.samples.lock();
            (samples.clone(), self.evicted.load(Ordering::Relaxed))
        };
        PerformanceReport::from_samples(samples.iter(), evicted)
    }

    /// Discard every sample and counter.
    pub fn reset(&self) {
        self.samples.lock().clear();
        self.evicted.store(0, Ordering::Relaxed);
    }

    /// Samples currently buffered.
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    /// Whether no samples are buffered.
    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Maximum samples kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn push(&self, sample: Sample) {
        let mut samples = self.samples.lock();
        if samples.len() >= self.capacity {
            samples.pop_front();
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        samples.push_back(sample);
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_MONITOR_CAPACITY)
    }
}

impl fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("evicted", &self.evicted.load(Ordering::Relaxed))
            .finish()
    }
}

/// Guard returned by [`PerformanceMonitor::time`].
#[must_use = "the render is recorded when the timer is dropped"]
pub struct RenderTimer<'a> {
    monitor: &'a PerformanceMonitor,
    name: String,
    started: Instant,
    finished: bool,
}

impl RenderTimer<'_> {
    /// Record now and return the measured duration.
    pub fn finish(mut self) -> Duration {
        self.record()
    }

    fn record(&mut self) -> Duration {
        let elapsed = self.started.elapsed();
        if !self.finished {
            self.finished = true;
            self.monitor.record_render(&self.name, elapsed);
        }
        elapsed
    }
}

impl Drop for RenderTimer<'_> {
    fn drop(&mut self) {
        self.record();
    }
}

impl fmt::Debug for RenderTimer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTimer")
            .field("name", &self.name)
            .field("started", &self.started)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_report_after_recording() {
        let monitor = PerformanceMonitor::default();
        monitor.record_render("dashboard", Duration::from_millis(8));
        monitor.record_render("dashboard", Duration::from_millis(12));
        monitor.record_cache_access("leads", true);
        monitor.record_cache_access("leads", false);

        let report = monitor.report();
        assert_eq!(report.total_renders, 2);
        assert_eq!(report.operations["dashboard"].avg_ms, 10.0);
        assert_eq!(report.cache_hit_rate, 0.5);
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let monitor = PerformanceMonitor::new(3);
        for ms in [1, 2, 3, 4, 5] {
            monitor.record_render("op", Duration::from_millis(ms));
        }

        assert_eq!(monitor.len(), 3);
        let report = monitor.report();
        assert_eq!(report.operations["op"].min_ms, 3.0);
        assert_eq!(report.samples_evicted, 2);
    }

    #[test]
    fn test_reset_clears_everything() {
        let monitor = PerformanceMonitor::new(1);
        monitor.record_render("op", Duration::from_millis(1));
        monitor.record_render("op", Duration::from_millis(1));
        monitor.reset();

        assert!(monitor.is_empty());
        assert_eq!(monitor.report(), PerformanceReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_timer_records_on_drop() {
        let monitor = PerformanceMonitor::default();
        {
            let _timer = monitor.time("chart");
            tokio::time::advance(Duration::from_millis(20)).await;
        }

        let report = monitor.report();
        assert_eq!(report.operations["chart"].count, 1);
        assert_eq!(report.operations["chart"].max_ms, 20.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_timer_finish_records_once() {
        let monitor = PerformanceMonitor::default();
        let timer = monitor.time("chart");
        tokio::time::advance(Duration::from_millis(5)).await;

        assert_eq!(timer.finish(), Duration::from_millis(5));
        assert_eq!(monitor.len(), 1);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let monitor = PerformanceMonitor::new(0);
        monitor.record_cache_access("leads", true);
        assert_eq!(monitor.capacity(), 1);
        assert_eq!(monitor.len(), 1);
    }

    #[test]
    fn test_concurrent_recording_keeps_every_sample() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 10_000;

        let monitor = Arc::new(PerformanceMonitor::new(THREADS * PER_THREAD));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let monitor = Arc::clone(&monitor);
                std::thread::spawn(move || {
                    for _ in 0..PER_THREAD {
                        monitor.record_cache_access("leads", true);
                    }
                })
            })
            .collect();

        // Reports taken mid-flight must not cost samples either.
        for _ in 0..10 {
            let _ = monitor.report();
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(monitor.len(), THREADS * PER_THREAD);
        let report = monitor.report();
        assert_eq!(report.caches["leads"].hits, (THREADS * PER_THREAD) as u64);
        assert_eq!(report.samples_evicted, 0);
    }

    proptest! {
        #[test]
        fn prop_buffer_never_exceeds_capacity(capacity in 1usize..64, records in 0usize..256) {
            let monitor = PerformanceMonitor::new(capacity);
            for i in 0..records {
                monitor.record_cache_access("c", i % 2 == 0);
            }
            prop_assert_eq!(monitor.len(), records.min(capacity));
            let report = monitor.report();
            prop_assert_eq!(
                report.samples_evicted as usize,
                records.saturating_sub(capacity)
            );
        }
    }
}
