//! Per-frame scroll interpolation.

use std::time::Duration;

use tokio::time::Instant;

use super::easing::Easing;

/// Linear interpolation from `from` to `to` by `t`.
#[inline]
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Output of one animation frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStep {
    /// Offset to apply to the scroll target.
    pub offset: f64,
    /// Linear progress in `[0, 1]`.
    pub progress: f64,
    /// Whether this frame completes the animation.
    pub finished: bool,
}

/// State of one scroll animation.
///
/// Start offset and start time are captured on the first frame, not at
/// construction, so an animation queued between frames starts from where the
/// target actually is.
#[derive(Debug, Clone)]
pub struct ScrollAnimationTask {
    target_offset: f64,
    duration: Duration,
    easing: Easing,
    start: Option<(f64, Instant)>,
    cancelled: bool,
}

impl ScrollAnimationTask {
    pub fn new(target_offset: f64, duration: Duration, easing: Easing) -> Self {
        Self {
            target_offset,
            duration,
            easing,
            start: None,
            cancelled: false,
        }
    }

    /// Advance to the frame rendered at `now`.
    ///
    /// `current_offset` is only read on the first frame. Once progress reaches
    /// 1 the returned offset is exactly the target.
    pub fn step(&mut self, now: Instant, current_offset: f64) -> FrameStep {
        let (start_offset, start_time) = *self.start.get_or_insert((current_offset, now));

        let progress = if self.duration.is_zero() {
            1.0
        } else {
            let elapsed = now.saturating_duration_since(start_time);
            (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
        };

        if progress >= 1.0 {
            return FrameStep {
                offset: self.target_offset,
                progress: 1.0,
                finished: true,
            };
        }

        let eased = self.easing.apply(progress);
        FrameStep {
            offset: lerp(start_offset, self.target_offset, eased),
            progress,
            finished: false,
        }
    }

    /// Mark the task cancelled. It must not be stepped afterwards.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Whether the first frame has been processed.
    pub fn has_started(&self) -> bool {
        self.start.is_some()
    }

    /// Offset captured on the first frame.
    pub fn start_offset(&self) -> Option<f64> {
        self.start.map(|(offset, _)| offset)
    }

    pub fn target_offset(&self) -> f64 {
        self.target_offset
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }
}
