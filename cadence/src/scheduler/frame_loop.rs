//! Shared per-frame tick fan-out.
//!
//! The host's per-frame callback is abstracted as a [`FrameSource`]. A single
//! [`FrameLoop`] pumps it and broadcasts each frame timestamp to every
//! subscriber, so the sampler and any running animation share one loop.
//!
//! A host without a per-frame primitive is modelled by
//! [`FrameLoop::unavailable`]; consumers check [`FrameLoop::is_available`]
//! and fall back to degraded behavior instead of failing.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::task::TaskHandle;

/// Buffered frames per subscriber before a slow subscriber starts skipping.
pub const FRAME_CHANNEL_CAPACITY: usize = 64;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Host primitive delivering one timestamp per rendered frame.
pub trait FrameSource: Send + 'static {
    /// Wait for the next frame.
    ///
    /// Returns `None` once the host stops delivering frames for good.
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Instant>>;
}

/// Frame source ticking at a fixed rate on the Tokio timer.
///
/// Used by headless hosts. Missed ticks are skipped rather than replayed, the
/// way a display skips frames it could not render.
#[derive(Debug)]
pub struct IntervalFrameSource {
    interval: Interval,
}

impl IntervalFrameSource {
    /// Tick `rate_hz` times per second. Rates below 1 Hz are raised to 1 Hz.
    pub fn new(rate_hz: f64) -> Self {
        let rate = if rate_hz.is_finite() { rate_hz.max(1.0) } else { 60.0 };
        let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / rate));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    /// Tick at a 60 Hz display rate.
    pub fn sixty_hz() -> Self {
        Self::new(60.0)
    }
}

impl FrameSource for IntervalFrameSource {
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Instant>> {
        Box::pin(async move { Some(self.interval.tick().await) })
    }
}

/// Frame source fed by the host through a [`FrameSender`].
///
/// Lets an embedding application forward its own frame callback, and lets
/// tests script exact frame timestamps.
#[derive(Debug)]
pub struct ChannelFrameSource {
    frames: mpsc::UnboundedReceiver<Instant>,
}

impl ChannelFrameSource {
    /// Create a connected sender/source pair.
    pub fn new() -> (FrameSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (FrameSender { frames: tx }, Self { frames: rx })
    }
}

impl FrameSource for ChannelFrameSource {
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Instant>> {
        Box::pin(async move { self.frames.recv().await })
    }
}

/// Host side of a [`ChannelFrameSource`]. Dropping it ends the source.
#[derive(Debug, Clone)]
pub struct FrameSender {
    frames: mpsc::UnboundedSender<Instant>,
}

impl FrameSender {
    /// Deliver a frame rendered at `at`. Returns `false` if the loop is gone.
    pub fn send(&self, at: Instant) -> bool {
        self.frames.send(at).is_ok()
    }

    /// Deliver a frame stamped with the current time.
    pub fn tick(&self) -> bool {
        self.send(Instant::now())
    }
}

struct FrameLoopInner {
    /// Template receiver used to mint new subscriptions. `None` once stopped,
    /// once the source ended, or when the host has no frame primitive.
    template: Arc<Mutex<Option<broadcast::Receiver<Instant>>>>,
    task: Option<TaskHandle>,
}

/// Cloneable handle to the shared frame loop.
#[derive(Clone)]
pub struct FrameLoop {
    inner: Arc<FrameLoopInner>,
}

impl FrameLoop {
    /// Start pumping `source`. Must be called inside a Tokio runtime.
    pub fn start<S: FrameSource>(mut source: S) -> Self {
        let (sender, receiver) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        let template = Arc::new(Mutex::new(Some(receiver)));
        let pump_template = Arc::clone(&template);

        let task = TaskHandle::spawn("frame-loop", move |token| async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    frame = source.next_frame() => match frame {
                        Some(at) => {
                            // No subscribers is fine; the frame is simply unobserved.
                            let _ = sender.send(at);
                        }
                        None => {
                            tracing::info!("Frame source ended, stopping frame loop");
                            // Later subscribers see the loop as unavailable.
                            pump_template.lock().take();
                            break;
                        }
                    },
                }
            }
        });

        Self {
            inner: Arc::new(FrameLoopInner {
                template,
                task: Some(task),
            }),
        }
    }

    /// A loop for a host that has no per-frame callback primitive.
    pub fn unavailable() -> Self {
        Self {
            inner: Arc::new(FrameLoopInner {
                template: Arc::new(Mutex::new(None)),
                task: None,
            }),
        }
    }

    /// Whether frames can be delivered at all.
    ///
    /// Turns `false` once the loop is stopped or its source ends.
    pub fn is_available(&self) -> bool {
        self.inner.template.lock().is_some()
    }

    /// Subscribe to frame timestamps.
    ///
    /// Returns `None` if the host has no frame primitive or the loop was
    /// stopped.
    pub fn subscribe(&self) -> Option<FrameReceiver> {
        self.inner
            .template
            .lock()
            .as_ref()
            .map(|template| FrameReceiver {
                frames: template.resubscribe(),
            })
    }

    /// Stop the loop. Existing receivers drain and then see the end of the
    /// stream. Calling this more than once is a no-op.
    pub fn stop(&self) {
        let template = self.inner.template.lock().take();
        if template.is_some() {
            tracing::debug!("Frame loop stopped");
        }
        if let Some(task) = &self.inner.task {
            task.cancel();
        }
    }
}

impl fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameLoop")
            .field("available", &self.is_available())
            .finish()
    }
}

/// Subscription to a [`FrameLoop`].
#[derive(Debug)]
pub struct FrameReceiver {
    frames: broadcast::Receiver<Instant>,
}

impl FrameReceiver {
    /// Wait for the next frame timestamp.
    ///
    /// A subscriber that fell behind (for example while the host was
    /// backgrounded) skips the frames it missed. Returns `None` once the loop
    /// has stopped.
    pub async fn next(&mut self) -> Option<Instant> {
        loop {
            match self.frames.recv().await {
                Ok(at) => return Some(at),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::trace!(skipped, "Frame subscriber lagged, skipping frames");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
