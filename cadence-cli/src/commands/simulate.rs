//! `cadence simulate`: run the engine against a synthetic frame rate.

use std::time::Duration;

use clap::Args;
use tokio::time::Instant;

use cadence::config::EngineConfig;
use cadence::engine::Engine;
use cadence::quality::{DeviceProfile, FormFactor, MetricsSnapshot, QualitySettings};
use cadence::scheduler::{ChannelFrameSource, FrameLoop, FrameSender};

use crate::error::CliError;

/// How long to wait for a window to close before giving up on it.
const WINDOW_WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Frames delivered per second
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub fps: u32,

    /// Number of one-second windows to simulate
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..=3600))]
    pub seconds: u32,

    /// Simulate a phone
    #[arg(long)]
    pub mobile: bool,

    /// Simulate the host's reduced-motion preference
    #[arg(long)]
    pub reduced_motion: bool,

    /// GPU renderer string reported by the host
    #[arg(long, default_value = "Generic Hardware GPU")]
    pub renderer: String,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: SimulateArgs, config: EngineConfig) -> Result<(), CliError> {
    let window = config.sampler.sample_window;
    let form_factor = if args.mobile {
        FormFactor::Mobile
    } else {
        FormFactor::Desktop
    };
    let device = DeviceProfile::new(Some(args.renderer.clone()), form_factor);

    let (sender, source) = ChannelFrameSource::new();
    let engine = Engine::start(config, FrameLoop::start(source), device, args.reduced_motion);
    let mut metrics = engine.sampler().subscribe();

    println!(
        "Simulating {} fps for {} window(s) on {} ({})",
        args.fps, args.seconds, form_factor, args.renderer
    );
    print_settings("initial", &engine.metrics(), &engine.quality());

    let mut window_start = Instant::now();
    for index in 1..=args.seconds {
        send_window(&sender, &engine, window_start, window, args.fps).await;
        window_start += window;

        match tokio::time::timeout(WINDOW_WAIT, metrics.changed()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => break,
            Err(_) => {
                tracing::warn!(window = index, "Sample window did not close");
                continue;
            }
        }
        let snapshot = *metrics.borrow_and_update();
        let Some(settings) = published_settings(&engine, &snapshot).await else {
            tracing::warn!(window = index, "Quality governor did not observe window");
            continue;
        };
        print_settings(&format!("window {}", index), &snapshot, &settings);
    }
    tracing::debug!(windows = args.seconds, "Simulation finished");

    let report = engine.report();
    engine.shutdown();

    println!();
    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report);
    }
    Ok(())
}

/// Deliver one window of evenly spaced frames and record each as a render.
///
/// Yields after every frame so the frame loop never lags behind the sender.
async fn send_window(
    sender: &FrameSender,
    engine: &Engine,
    start: Instant,
    window: Duration,
    fps: u32,
) {
    let frame_time = window / fps;
    for k in 1..=fps {
        sender.send(start + window.mul_f64(f64::from(k) / f64::from(fps)));
        engine.monitor().record_render("frame", frame_time);
        tokio::task::yield_now().await;
    }
}

/// Settings the engine published for `snapshot`.
///
/// Waits until the governor has evaluated the snapshot, so the printed tier
/// is one the engine actually reported.
async fn published_settings(engine: &Engine, snapshot: &MetricsSnapshot) -> Option<QualitySettings> {
    let settled = async {
        while engine.quality_basis() != *snapshot {
            tokio::task::yield_now().await;
        }
        engine.quality()
    };
    tokio::time::timeout(WINDOW_WAIT, settled).await.ok()
}

fn print_settings(label: &str, metrics: &MetricsSnapshot, settings: &QualitySettings) {
    println!(
        "{:<10} fps={:>6.1} drops={:<3} tier={:<7} duration={}ms stagger={}ms complex={} parallax={} blur={}",
        label,
        metrics.fps,
        metrics.frame_drops,
        settings.tier.as_str(),
        settings.animation_duration_ms,
        settings.stagger_delay_ms,
        yes_no(settings.enable_complex_animations),
        yes_no(settings.enable_parallax),
        yes_no(settings.enable_blur),
    );
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence::quality::QualityTier;

    fn desktop() -> DeviceProfile {
        DeviceProfile::new(Some("NVIDIA GeForce RTX 4080".to_string()), FormFactor::Desktop)
    }

    #[tokio::test]
    async fn test_published_settings_follow_governor() {
        let config = EngineConfig::default();
        let window = config.sampler.sample_window;
        let (sender, source) = ChannelFrameSource::new();
        let engine = Engine::start(config, FrameLoop::start(source), desktop(), false);
        let mut metrics = engine.sampler().subscribe();

        let start = Instant::now();
        send_window(&sender, &engine, start, window, 60).await;
        metrics.changed().await.unwrap();
        let snapshot = *metrics.borrow_and_update();
        let settings = published_settings(&engine, &snapshot).await.unwrap();
        assert_eq!(settings.tier, QualityTier::High);

        send_window(&sender, &engine, start + window, window, 30).await;
        metrics.changed().await.unwrap();
        let snapshot = *metrics.borrow_and_update();
        let settings = published_settings(&engine, &snapshot).await.unwrap();
        assert_eq!(settings.tier, QualityTier::Low);
        assert_eq!(settings, engine.quality());
    }
}
