//! Leading-edge throttle.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// Caps how often a wrapped function runs.
///
/// The first call of a burst runs immediately. Any call arriving less than
/// `interval` after the last execution is **dropped**: it is not queued and
/// no trailing call happens when the interval expires. A consumer that needs
/// the final value of a burst must use a [`Debouncer`](super::Debouncer) or
/// re-measure on its own.
///
/// # Example
///
/// ```
/// use cadence::scheduler::Throttle;
/// use std::time::Duration;
///
/// let mut runs = 0;
/// let mut throttle = Throttle::new(Duration::from_millis(16), |_: ()| runs += 1);
///
/// assert!(throttle.call(()).is_some());
/// assert!(throttle.call(()).is_none()); // dropped, not deferred
/// ```
pub struct Throttle<F> {
    interval: Duration,
    last_run: Option<Instant>,
    suppressed: u64,
    f: F,
}

impl<F> Throttle<F> {
    /// Wrap `f` so it runs at most once per `interval`.
    pub fn new(interval: Duration, f: F) -> Self {
        Self {
            interval,
            last_run: None,
            suppressed: 0,
            f,
        }
    }

    /// Call the wrapped function if the interval has elapsed.
    ///
    /// Returns the function's result, or `None` if the call was dropped.
    pub fn call<A, R>(&mut self, arg: A) -> Option<R>
    where
        F: FnMut(A) -> R,
    {
        self.call_at(Instant::now(), arg)
    }

    /// Same as [`call`](Self::call) with an explicit timestamp.
    pub fn call_at<A, R>(&mut self, now: Instant, arg: A) -> Option<R>
    where
        F: FnMut(A) -> R,
    {
        if let Some(last) = self.last_run {
            if now.saturating_duration_since(last) < self.interval {
                self.suppressed += 1;
                return None;
            }
        }

        self.last_run = Some(now);
        Some((self.f)(arg))
    }

    /// Number of calls dropped since creation or the last reset.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// Configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Forget the last execution so the next call runs immediately.
    pub fn reset(&mut self) {
        self.last_run = None;
        self.suppressed = 0;
    }
}

impl<F> fmt::Debug for Throttle<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttle")
            .field("interval", &self.interval)
            .field("last_run", &self.last_run)
            .field("suppressed", &self.suppressed)
            .finish_non_exhaustive()
    }
}
