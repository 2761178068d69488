//! `cadence scroll`: tabulate a scroll animation.

use std::time::Duration;

use clap::Args;
use tokio::time::Instant;

use cadence::config::EngineConfig;
use cadence::scroll::{Easing, FrameStep, ScrollAnimationTask};

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ScrollArgs {
    /// Starting offset in pixels
    #[arg(long, default_value_t = 0.0)]
    pub from: f64,

    /// Target offset in pixels
    #[arg(long)]
    pub to: f64,

    /// Animation length (defaults to scroll.duration_ms)
    #[arg(long, value_name = "MS")]
    pub duration_ms: Option<u64>,

    /// Easing curve, e.g. easeOutQuad (defaults to scroll.easing)
    #[arg(long)]
    pub easing: Option<Easing>,

    /// Number of frames to spread over the duration
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..))]
    pub frames: u32,
}

pub fn run(args: ScrollArgs, config: &EngineConfig) -> Result<(), CliError> {
    if !args.from.is_finite() || !args.to.is_finite() {
        return Err(CliError::InvalidArguments(
            "--from and --to must be finite".to_string(),
        ));
    }

    let duration = args
        .duration_ms
        .map(Duration::from_millis)
        .unwrap_or(config.scroll.duration);
    let easing = args.easing.unwrap_or(config.scroll.easing);

    println!(
        "Scrolling {} -> {} over {} ms ({})",
        args.from,
        args.to,
        duration.as_millis(),
        easing
    );
    println!("{:>6}  {:>8}  {:>10}", "frame", "progress", "offset");
    for (frame, step) in trajectory(args.from, args.to, duration, easing, args.frames)
        .iter()
        .enumerate()
    {
        println!("{:>6}  {:>8.3}  {:>10.2}", frame, step.progress, step.offset);
    }
    Ok(())
}

/// Step an animation over `frames` evenly spaced frames after the first one.
///
/// The first frame captures the start and is included in the output.
pub fn trajectory(
    from: f64,
    to: f64,
    duration: Duration,
    easing: Easing,
    frames: u32,
) -> Vec<FrameStep> {
    let mut task = ScrollAnimationTask::new(to, duration, easing);
    let start = Instant::now();
    let mut offset = from;
    let mut steps = Vec::with_capacity(frames as usize + 1);

    for frame in 0..=frames {
        let at = start + duration.mul_f64(f64::from(frame) / f64::from(frames));
        let step = task.step(at, offset);
        offset = step.offset;
        steps.push(step);
        if step.finished {
            break;
        }
    }
    steps
}
