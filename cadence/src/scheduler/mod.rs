//! Event coalescing and frame scheduling primitives.
//!
//! Everything time-driven in the engine goes through this module:
//!
//! ```text
//! host frames ──► FrameLoop ──► FrameReceiver (sampler, animator, ...)
//! input burst ──► Debouncer ──► one trailing update after quiescence
//! input burst ──► Throttle  ──► leading call only, rest dropped
//! ```
//!
//! Long-lived work is owned through explicit handles: a [`TaskHandle`] for
//! spawned tasks and a [`Disposer`] for host subscriptions. Both release
//! their resource exactly once, no matter how many times teardown is
//! requested.

mod debounce;
mod frame_loop;
mod task;
mod throttle;

pub use debounce::{debounce, Debouncer};
pub use frame_loop::{
    BoxFuture, ChannelFrameSource, FrameLoop, FrameReceiver, FrameSender, FrameSource,
    IntervalFrameSource, FRAME_CHANNEL_CAPACITY,
};
pub use task::{Disposer, TaskHandle};
pub use throttle::Throttle;
