//! Single periodic cleanup pass shared by every cache.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant as StdInstant};

use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;

use super::data_cache::Sweepable;
use crate::scheduler::TaskHandle;

/// Default sweep period (1 minute).
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;

/// Result of one sweep over all registered caches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepResult {
    /// Expired entries removed across all caches.
    pub entries_removed: usize,
    /// Caches that were still alive and got swept.
    pub caches_swept: usize,
    /// Wall-clock duration of the sweep in milliseconds.
    pub duration_ms: u64,
}

impl fmt::Display for SweepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sweep: removed {} entries from {} caches in {}ms",
            self.entries_removed, self.caches_swept, self.duration_ms
        )
    }
}

/// Owns the one cleanup timer for all caches.
///
/// Caches are held weakly; a dropped cache is pruned on the next sweep
/// instead of being kept alive by the registry.
pub struct CacheSweeper {
    interval: Duration,
    caches: Arc<Mutex<Vec<Weak<dyn Sweepable>>>>,
    task: Mutex<Option<TaskHandle>>,
}

impl CacheSweeper {
    /// Create a stopped sweeper.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            caches: Arc::new(Mutex::new(Vec::new())),
            task: Mutex::new(None),
        }
    }

    /// Add a cache to the sweep set.
    pub fn register<C>(&self, cache: &Arc<C>)
    where
        C: Sweepable + 'static,
    {
        let cache: Arc<dyn Sweepable> = Arc::clone(cache) as Arc<dyn Sweepable>;
        tracing::debug!(cache = cache.name(), "Cache registered for sweeping");
        self.caches.lock().push(Arc::downgrade(&cache));
    }

    /// Number of live registered caches.
    pub fn registered(&self) -> usize {
        self.caches
            .lock()
            .iter()
            .filter(|cache| cache.strong_count() > 0)
            .count()
    }

    /// Sweep every live cache now.
    pub fn sweep(&self) -> SweepResult {
        sweep_all(&self.caches)
    }

    /// Start the periodic sweep. Calling this while running is a no-op.
    ///
    /// The first sweep happens one full interval after start. Must be called
    /// inside a Tokio runtime.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }

        let caches = Arc::clone(&self.caches);
        let period = self.interval;
        *task = Some(TaskHandle::spawn("cache-sweeper", move |token| async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let result = sweep_all(&caches);
                        if result.entries_removed > 0 {
                            tracing::debug!(
                                entries_removed = result.entries_removed,
                                caches = result.caches_swept,
                                duration_ms = result.duration_ms,
                                "Cache sweep complete"
                            );
                        }
                    }
                }
            }
        }));

        tracing::debug!(interval_ms = period.as_millis() as u64, "Cache sweeper started");
    }

    /// Stop the periodic sweep. Calling this while stopped is a no-op.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.cancel();
            tracing::debug!("Cache sweeper stopped");
        }
    }

    /// Whether the periodic sweep is running.
    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Configured sweep period.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for CacheSweeper {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_SWEEP_INTERVAL_MS))
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for CacheSweeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSweeper")
            .field("interval", &self.interval)
            .field("registered", &self.registered())
            .field("running", &self.is_running())
            .finish()
    }
}

fn sweep_all(caches: &Mutex<Vec<Weak<dyn Sweepable>>>) -> SweepResult {
    let started = StdInstant::now();

    // Upgrade under the lock, clean outside it.
    let live: Vec<Arc<dyn Sweepable>> = {
        let mut caches = caches.lock();
        caches.retain(|cache| cache.strong_count() > 0);
        caches.iter().filter_map(Weak::upgrade).collect()
    };

    let mut result = SweepResult {
        caches_swept: live.len(),
        ..SweepResult::default()
    };
    for cache in &live {
        let removed = cache.cleanup();
        if removed > 0 {
            tracing::trace!(cache = cache.name(), removed, "Expired entries removed");
        }
        result.entries_removed += removed;
    }
    result.duration_ms = started.elapsed().as_millis() as u64;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DataCache, Fingerprint};

    const TTL: Duration = Duration::from_secs(300);

    fn key(label: &str) -> Fingerprint {
        Fingerprint::from_keys(label, ["x"])
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_sweep_removes_expired() {
        let sweeper = CacheSweeper::default();
        let cache = Arc::new(DataCache::unmonitored("leads", TTL));
        sweeper.register(&cache);

        cache.set(key("a"), 1u32);
        tokio::time::advance(TTL + Duration::from_millis(1)).await;
        cache.set(key("b"), 2u32);

        let result = sweeper.sweep();
        assert_eq!(result.entries_removed, 1);
        assert_eq!(result.caches_swept, 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_cache_is_pruned() {
        let sweeper = CacheSweeper::default();
        let kept = Arc::new(DataCache::<u32>::unmonitored("kept", TTL));
        let dropped = Arc::new(DataCache::<u32>::unmonitored("dropped", TTL));
        sweeper.register(&kept);
        sweeper.register(&dropped);
        assert_eq!(sweeper.registered(), 2);

        drop(dropped);
        assert_eq!(sweeper.registered(), 1);
        assert_eq!(sweeper.sweep().caches_swept, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sweep() {
        let sweeper = CacheSweeper::new(Duration::from_secs(60));
        let cache = Arc::new(DataCache::unmonitored("leads", Duration::from_secs(30)));
        sweeper.register(&cache);
        cache.set(key("a"), 1u32);

        sweeper.start();
        sweeper.start();
        assert!(sweeper.is_running());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(cache.is_empty());

        sweeper.stop();
        sweeper.stop();
        assert!(!sweeper.is_running());
    }

    #[test]
    fn test_sweep_result_display() {
        let result = SweepResult {
            entries_removed: 3,
            caches_swept: 2,
            duration_ms: 0,
        };
        assert_eq!(
            result.to_string(),
            "Sweep: removed 3 entries from 2 caches in 0ms"
        );
    }
}
