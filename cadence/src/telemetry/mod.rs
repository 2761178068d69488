//! Render and cache telemetry.
//!
//! The [`PerformanceMonitor`] is the engine's only diagnostic surface. It
//! keeps a bounded window of recent samples and summarizes them on demand.
//!
//! # Architecture
//!
//! ```text
//! RenderTimer / record_render ──┐
//!                               ├──► ring buffer ──► PerformanceReport ──► Display / JSON
//! DataCache get (hit / miss) ───┘    (capacity N)    (point-in-time)
//! ```
//!
//! # Example
//!
//! ```
//! use cadence::telemetry::PerformanceMonitor;
//! use std::time::Duration;
//!
//! let monitor = PerformanceMonitor::default();
//! monitor.record_render("pipeline-chart", Duration::from_millis(12));
//! monitor.record_cache_access("leads", true);
//!
//! let report = monitor.report();
//! assert_eq!(report.total_renders, 1);
//! assert_eq!(report.cache_hit_rate, 1.0);
//! ```

mod monitor;
mod report;

pub use monitor::{PerformanceMonitor, RenderTimer, DEFAULT_MONITOR_CAPACITY, FRAME_BUDGET};
pub use report::{CacheStats, OperationStats, PerformanceReport};
