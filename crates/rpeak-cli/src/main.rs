use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use rpeak_lib::{
    conditioning::{normalize_min_max, MovingAverage},
    detectors::{DetectorKind, DetectorSettings},
    io::{csv as csv_io, text as text_io},
    signal::{Events, RRSeries, TimeSeries},
};
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "rpeak",
    version,
    about = "Single-lead ECG R-peak detection"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect R-peaks from samples read from stdin or --input
    Detect {
        /// pan-tompkins, swt, engzee or wqrs
        #[arg(long, default_value = "pan-tompkins")]
        detector: String,
        #[arg(long, default_value_t = 360.0)]
        fs: f64,
        #[arg(long)]
        input: Option<PathBuf>,
        /// Read this column of a headed CSV instead of one sample per line
        #[arg(long, requires = "input")]
        csv_column: Option<String>,
        /// TOML file with per-detector parameter sections
        #[arg(long)]
        config: Option<PathBuf>,
        /// Min-max normalize the samples before detection
        #[arg(long)]
        normalize: bool,
    },
    /// List the available detectors
    Detectors,
    /// Moving average of the input samples, one value per line
    Smooth {
        /// cumulative, direct or convolution
        #[arg(long, default_value = "cumulative")]
        strategy: String,
        #[arg(long)]
        window: usize,
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

/// JSON summary printed by `rpeak detect`.
#[derive(Debug, Serialize)]
struct DetectionSummary {
    detector: DetectorKind,
    fs: f64,
    sample_count: usize,
    events: Events,
    rr: RRSeries,
    heart_rate_bpm: Option<f64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Detect {
            detector,
            fs,
            input,
            csv_column,
            config,
            normalize,
        } => cmd_detect(
            &detector,
            fs,
            input.as_deref(),
            csv_column.as_deref(),
            config.as_deref(),
            normalize,
        )?,
        Commands::Detectors => cmd_detectors(),
        Commands::Smooth {
            strategy,
            window,
            input,
        } => cmd_smooth(&strategy, window, input.as_deref())?,
    }
    Ok(())
}

fn read_samples(input: Option<&Path>, csv_column: Option<&str>) -> Result<Vec<f64>> {
    match (input, csv_column) {
        (Some(path), Some(column)) => csv_io::read_csv_column(path, column),
        (Some(path), None) => text_io::read_f64_series(path),
        (None, _) => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading samples from stdin")?;
            text_io::parse_f64_series(&buf)
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<DetectorSettings> {
    let Some(path) = path else {
        return Ok(DetectorSettings::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid detector settings in {}", path.display()))
}

fn cmd_detect(
    detector: &str,
    fs: f64,
    input: Option<&Path>,
    csv_column: Option<&str>,
    config: Option<&Path>,
    normalize: bool,
) -> Result<()> {
    let kind: DetectorKind = detector.parse()?;
    let settings = load_settings(config)?;
    let mut data = read_samples(input, csv_column)?;
    if normalize {
        data = normalize_min_max(&data)?;
    }
    let ts = TimeSeries::new(fs, data);
    info!(
        "running {} over {} samples ({:.1} s)",
        kind,
        ts.len(),
        ts.duration()
    );
    let events = kind
        .detector(&settings)
        .detect_events(&ts)
        .with_context(|| format!("{kind} detection failed"))?;
    let rr = RRSeries::from_events(&events, ts.fs);
    let summary = DetectionSummary {
        detector: kind,
        fs: ts.fs,
        sample_count: ts.len(),
        heart_rate_bpm: rr.mean_heart_rate_bpm(),
        events,
        rr,
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn cmd_detectors() {
    for kind in DetectorKind::ALL {
        println!("{}\t{}", kind.name(), kind.description());
    }
}

fn cmd_smooth(strategy: &str, window: usize, input: Option<&Path>) -> Result<()> {
    let strategy: MovingAverage = strategy.parse()?;
    let data = read_samples(input, None)?;
    for value in strategy.apply(&data, window)? {
        println!("{value}");
    }
    Ok(())
}
