//! Cancellable eased scroll animations.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::animation::ScrollAnimationTask;
use super::easing::Easing;
use super::target::ScrollTarget;
use crate::scheduler::{FrameLoop, FrameReceiver, TaskHandle};

/// Default animation length.
pub const DEFAULT_SCROLL_DURATION_MS: u64 = 800;

type ProgressCallback = Box<dyn FnMut(f64) + Send>;

/// Defaults applied when [`AnimateOptions`] leaves a field unset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollConfig {
    pub duration: Duration,
    pub easing: Easing,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(DEFAULT_SCROLL_DURATION_MS),
            easing: Easing::EaseInOutCubic,
        }
    }
}

/// Per-call animation options.
#[derive(Default)]
pub struct AnimateOptions {
    duration: Option<Duration>,
    easing: Option<Easing>,
    on_progress: Option<ProgressCallback>,
}

impl AnimateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }

    /// Called with linear progress in `[0, 1]` after every applied frame.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(f64) + Send + 'static,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for AnimateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimateOptions")
            .field("duration", &self.duration)
            .field("easing", &self.easing)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

/// How an animation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationOutcome {
    /// The target reached its destination.
    Completed,
    /// Superseded, cancelled, or the target went away.
    Cancelled,
}

/// Awaitable handle to one animation.
///
/// Resolves exactly once. Polling again after resolution returns the same
/// outcome.
#[must_use = "dropping the handle does not cancel the animation; await it or call cancel()"]
pub struct ScrollAnimation {
    id: u64,
    outcome: Option<oneshot::Receiver<AnimationOutcome>>,
    resolved: Option<AnimationOutcome>,
    token: CancellationToken,
}

impl ScrollAnimation {
    fn pending(id: u64, outcome: oneshot::Receiver<AnimationOutcome>, token: CancellationToken) -> Self {
        Self {
            id,
            outcome: Some(outcome),
            resolved: None,
            token,
        }
    }

    fn settled(id: u64, outcome: AnimationOutcome) -> Self {
        Self {
            id,
            outcome: None,
            resolved: Some(outcome),
            token: CancellationToken::new(),
        }
    }

    /// Identifier, unique per animator.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop this animation. It resolves as [`AnimationOutcome::Cancelled`]
    /// unless it already finished.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Future for ScrollAnimation {
    type Output = AnimationOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.resolved {
            return Poll::Ready(outcome);
        }
        let Some(receiver) = self.outcome.as_mut() else {
            return Poll::Ready(AnimationOutcome::Cancelled);
        };
        let outcome = match Pin::new(receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => outcome,
            // The task went away without reporting.
            Poll::Ready(Err(_)) => AnimationOutcome::Cancelled,
            Poll::Pending => return Poll::Pending,
        };
        self.outcome = None;
        self.resolved = Some(outcome);
        Poll::Ready(outcome)
    }
}

impl fmt::Debug for ScrollAnimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollAnimation")
            .field("id", &self.id)
            .field("resolved", &self.resolved)
            .finish_non_exhaustive()
    }
}

struct ActiveAnimation {
    id: u64,
    task: TaskHandle,
    settled: Arc<AtomicBool>,
}

/// Runs scroll animations against one target, at most one at a time.
///
/// Starting a new animation cancels the one in flight. A cancelled animation
/// never writes to the target again: the cancel and every frame's
/// check-then-write happen under the same gate.
pub struct ScrollAnimator {
    target: Arc<dyn ScrollTarget>,
    frames: FrameLoop,
    config: ScrollConfig,
    reduced_motion: AtomicBool,
    destroyed: AtomicBool,
    next_id: AtomicU64,
    gate: Arc<Mutex<()>>,
    current: Mutex<Option<ActiveAnimation>>,
}

impl ScrollAnimator {
    pub fn new(target: Arc<dyn ScrollTarget>, frames: FrameLoop, config: ScrollConfig) -> Self {
        Self {
            target,
            frames,
            config,
            reduced_motion: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            gate: Arc::new(Mutex::new(())),
            current: Mutex::new(None),
        }
    }

    /// Animate the target to `target_offset`.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn animate_to(&self, target_offset: f64, options: AnimateOptions) -> ScrollAnimation {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let AnimateOptions {
            duration,
            easing,
            mut on_progress,
        } = options;

        // Supersede whatever is running before touching the target.
        self.cancel();

        if self.destroyed.load(Ordering::Acquire) {
            tracing::debug!(animation = id, "Animator destroyed, ignoring animate_to");
            return ScrollAnimation::settled(id, AnimationOutcome::Cancelled);
        }

        if self.target.offset().is_none() {
            tracing::debug!(animation = id, "Scroll target unmounted, not animating");
            return ScrollAnimation::settled(id, AnimationOutcome::Cancelled);
        }

        let Some(frames) = self.frames.subscribe() else {
            tracing::warn!(
                animation = id,
                "No per-frame callback available; jumping to scroll target"
            );
            self.target.set_offset(target_offset);
            if let Some(callback) = on_progress.as_mut() {
                callback(1.0);
            }
            return ScrollAnimation::settled(id, AnimationOutcome::Completed);
        };

        let duration = if self.reduced_motion.load(Ordering::Relaxed) {
            Duration::ZERO
        } else {
            duration.unwrap_or(self.config.duration)
        };
        let task = ScrollAnimationTask::new(
            target_offset,
            duration,
            easing.unwrap_or(self.config.easing),
        );

        let (tx, rx) = oneshot::channel();
        let settled = Arc::new(AtomicBool::new(false));
        let run = AnimationRun {
            id,
            task,
            frames,
            target: Arc::clone(&self.target),
            gate: Arc::clone(&self.gate),
            on_progress,
        };

        let task_settled = Arc::clone(&settled);
        let handle = TaskHandle::spawn("scroll-animation", move |token| async move {
            let outcome = run.execute(token).await;
            task_settled.store(true, Ordering::Release);
            let _ = tx.send(outcome);
        });
        let token = handle.cancellation_token();

        tracing::debug!(
            animation = id,
            target_offset,
            duration_ms = duration.as_millis() as u64,
            "Scroll animation started"
        );

        *self.current.lock() = Some(ActiveAnimation {
            id,
            task: handle,
            settled,
        });
        ScrollAnimation::pending(id, rx, token)
    }

    /// Cancel the animation in flight, if any.
    ///
    /// Returns `true` if a running animation was cancelled.
    pub fn cancel(&self) -> bool {
        let Some(active) = self.current.lock().take() else {
            return false;
        };
        let _gate = self.gate.lock();
        let was_running = !active.settled.load(Ordering::Acquire) && active.task.cancel();
        if was_running {
            tracing::debug!(animation = active.id, "Scroll animation cancelled");
        }
        was_running
    }

    /// Cancel any animation and refuse new ones. Safe to call repeatedly.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cancel();
        tracing::debug!("Scroll animator destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Whether an animation is in flight.
    pub fn is_animating(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|active| !active.settled.load(Ordering::Acquire) && !active.task.is_cancelled())
    }

    /// With reduced motion on, animations jump to their target on the first frame.
    pub fn set_reduced_motion(&self, reduced_motion: bool) {
        self.reduced_motion.store(reduced_motion, Ordering::Relaxed);
    }

    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    /// The surface this animator drives.
    pub fn target(&self) -> &Arc<dyn ScrollTarget> {
        &self.target
    }
}

impl Drop for ScrollAnimator {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for ScrollAnimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollAnimator")
            .field("config", &self.config)
            .field("animating", &self.is_animating())
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

struct AnimationRun {
    id: u64,
    task: ScrollAnimationTask,
    frames: FrameReceiver,
    target: Arc<dyn ScrollTarget>,
    gate: Arc<Mutex<()>>,
    on_progress: Option<ProgressCallback>,
}

impl AnimationRun {
    async fn execute(mut self, token: CancellationToken) -> AnimationOutcome {
        loop {
            let now = tokio::select! {
                biased;
                _ = token.cancelled() => return AnimationOutcome::Cancelled,
                frame = self.frames.next() => match frame {
                    Some(now) => now,
                    None => {
                        tracing::debug!(animation = self.id, "Frame loop stopped mid-animation");
                        return AnimationOutcome::Cancelled;
                    }
                },
            };

            let step = {
                let _gate = self.gate.lock();
                if token.is_cancelled() {
                    return AnimationOutcome::Cancelled;
                }
                let Some(current) = self.target.offset() else {
                    tracing::debug!(animation = self.id, "Scroll target unmounted mid-animation");
                    return AnimationOutcome::Cancelled;
                };
                let step = self.task.step(now, current);
                self.target.set_offset(step.offset);
                step
            };

            tracing::trace!(
                animation = self.id,
                progress = step.progress,
                offset = step.offset,
                "Scroll frame"
            );
            if let Some(callback) = self.on_progress.as_mut() {
                callback(step.progress);
            }
            if step.finished {
                return AnimationOutcome::Completed;
            }
        }
    }
}
