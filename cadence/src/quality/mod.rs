//! Frame-rate measurement and animation quality selection.
//!
//! ```text
//!  FrameLoop ──► FrameRateSampler ──► MetricsSnapshot (watch)
//!                      │                     │
//!                DeviceProfile               ▼
//!                      └──────────► QualityGovernor ──► QualitySettings (watch)
//!                                           ▲
//!                                  reduced-motion flag
//! ```
//!
//! [`QualityPolicy`] is the pure decision function. The sampler and governor
//! are the async plumbing around it.

mod device;
mod governor;
mod policy;
mod sampler;

pub use device::{DeviceProfile, FormFactor};
pub use governor::QualityGovernor;
pub use policy::{
    quality_settings, QualityPolicy, QualitySettings, QualityTier, DEFAULT_FPS_GOOD_THRESHOLD,
    DEFAULT_FPS_MEDIUM_THRESHOLD,
};
pub use sampler::{
    can_handle_complex_animations, FpsCounter, FrameRateSampler, MetricsSnapshot, SamplerConfig,
    DEFAULT_FPS_DROP_THRESHOLD, DEFAULT_MAX_FRAME_DROPS, DEFAULT_SAMPLE_WINDOW_MS,
};
