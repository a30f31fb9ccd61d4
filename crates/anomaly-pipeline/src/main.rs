//! Anomaly Localization Demo - Main Entry Point
//!
//! Synthesizes a two-channel vibration record with one transient, runs the
//! pipeline and prints the JSON report. An optional first argument names a
//! configuration file; `VIBRA_*` variables override it.

use anomaly_pipeline::{init_logging, Pipeline, PipelineConfig};
use anyhow::Context;
use signal_model::MultiChannelSignal;
use std::f64::consts::PI;
use std::path::PathBuf;
use tracing::info;

const SAMPLE_RATE_HZ: f64 = 10_000.0;
const DURATION_SECS: f64 = 4.0;
const BURST_START_SECS: f64 = 2.2;
const BURST_SECS: f64 = 0.1;
const BURST_HZ: f64 = 3_000.0;

/// Shaft hum, a weak in-band tone and a Hann-tapered burst; the second
/// channel sees the burst attenuated
fn synthesize() -> anyhow::Result<MultiChannelSignal> {
    let n = (DURATION_SECS * SAMPLE_RATE_HZ) as usize;
    let burst_start = (BURST_START_SECS * SAMPLE_RATE_HZ) as usize;
    let burst_len = (BURST_SECS * SAMPLE_RATE_HZ) as usize;

    let channel = |gain: f64| -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64 / SAMPLE_RATE_HZ;
                let mut x = 0.5 * (2.0 * PI * 50.0 * t).sin() + 0.01 * (2.0 * PI * 2_500.0 * t).sin();
                if (burst_start..burst_start + burst_len).contains(&i) {
                    let k = (i - burst_start) as f64 / burst_len as f64;
                    x += gain * (0.5 - 0.5 * (2.0 * PI * k).cos()) * (2.0 * PI * BURST_HZ * t).sin();
                }
                x
            })
            .collect()
    };

    Ok(MultiChannelSignal::from_channels(
        vec![channel(1.0), channel(0.4)],
        SAMPLE_RATE_HZ,
    )?)
}

fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== Vibration Anomaly Locator v{} ===", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = PipelineConfig::load(config_path.as_deref()).context("loading pipeline configuration")?;

    let signal = synthesize()?;
    info!(
        "Synthesized {} channels x {} samples, burst at {:.2} s",
        signal.channel_count(),
        signal.sample_count(),
        BURST_START_SECS
    );

    let report = Pipeline::new(config).run(&signal)?;
    for channel in &report.channels {
        for segment in &channel.segments {
            info!(
                "Channel {}: event at raw index {} ({:.4} s), {} samples{}",
                channel.channel,
                segment.event_index,
                segment.event_index as f64 / SAMPLE_RATE_HZ,
                segment.len(),
                if segment.partial { " (partial)" } else { "" }
            );
        }
    }

    println!("{}", report.to_json()?);
    Ok(())
}
