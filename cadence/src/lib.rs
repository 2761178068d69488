//! Cadence - adaptive rendering-performance engine
//!
//! Keeps an interactive view smooth on whatever device it runs on. The
//! engine measures the frame rate the host actually delivers, picks a
//! quality tier for animations from it, memoizes expensive derived data,
//! animates programmatic scrolling and tracks which page region the user is
//! looking at.
//!
//! # Modules
//!
//! - [`scheduler`]: frame loop, debounce/throttle, task and disposer handles
//! - [`quality`]: frame-rate sampling and quality tier selection
//! - [`cache`]: TTL memoization keyed by dataset fingerprints
//! - [`telemetry`]: render timing and cache hit-rate reports
//! - [`scroll`]: eased, cancellable scroll animation
//! - [`section_tracker`]: active-region tracking
//! - [`engine`]: wires the shared instances together
//! - [`config`] and [`logging`]: ambient setup
//!
//! # Example
//!
//! ```no_run
//! use cadence::config::EngineConfig;
//! use cadence::engine::Engine;
//! use cadence::quality::{DeviceProfile, FormFactor};
//! use cadence::scheduler::{FrameLoop, IntervalFrameSource};
//!
//! # async fn run() {
//! let frames = FrameLoop::start(IntervalFrameSource::sixty_hz());
//! let device = DeviceProfile::new(Some("Apple M2".into()), FormFactor::Desktop);
//! let engine = Engine::start(EngineConfig::default(), frames, device, false);
//!
//! println!("tier: {}", engine.quality().tier);
//! engine.shutdown();
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod logging;
pub mod quality;
pub mod scheduler;
pub mod scroll;
pub mod section_tracker;
pub mod telemetry;
