//! Eased scroll animations.
//!
//! ```text
//! animate_to(target) ──► ScrollAnimationTask ◄── frame ticks (FrameLoop)
//!                               │
//!                  progress = clamp(elapsed / duration, 0, 1)
//!                  offset   = lerp(start, target, easing(progress))
//!                               │
//!                               ▼
//!                         ScrollTarget::set_offset
//! ```
//!
//! A [`ScrollAnimator`] owns at most one running animation per target and
//! hands out a [`ScrollAnimation`] future that resolves to
//! [`AnimationOutcome::Completed`] or [`AnimationOutcome::Cancelled`].

mod animation;
mod animator;
mod easing;
mod target;

pub use animation::{lerp, FrameStep, ScrollAnimationTask};
pub use animator::{
    AnimateOptions, AnimationOutcome, ScrollAnimation, ScrollAnimator, ScrollConfig,
    DEFAULT_SCROLL_DURATION_MS,
};
pub use easing::{
    ease_in_cubic, ease_in_out_cubic, ease_in_out_quad, ease_in_out_quart, ease_in_quad,
    ease_in_quart, ease_out_cubic, ease_out_quad, ease_out_quart, linear, Easing,
    EasingParseError,
};
pub use target::{ScrollPosition, ScrollTarget};
