use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tenzotrace::{process_file, Configuration, PipelineResult};

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Smooths interferometer traces and finds strain intersections.")]
struct Cli {
    /// Oscilloscope CSV export
    input: PathBuf,
    /// JSON file with configuration overrides
    #[arg(long)]
    config: Option<PathBuf>,
    /// Smoothing window size
    #[arg(long)]
    window: Option<usize>,
    /// Smoothing polynomial order
    #[arg(long)]
    order: Option<usize>,
    /// Number of leading samples used for baseline correction
    #[arg(long)]
    baseline: Option<usize>,
    /// First data row to keep
    #[arg(long)]
    start: Option<usize>,
    /// Last data row to keep
    #[arg(long)]
    end: Option<usize>,
    /// Largest intersection amplitude to report
    #[arg(long)]
    threshold: Option<f64>,
    /// Write the per-sample series to this CSV file
    #[arg(long)]
    export: Option<PathBuf>,
    /// Print the full result as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn configuration(&self) -> Result<Configuration> {
        let mut config = match &self.config {
            Some(path) => Configuration::from_json_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => Configuration::default(),
        };
        if let Some(window) = self.window {
            config.smoothing_window_size = window;
        }
        if let Some(order) = self.order {
            config.polynomial_order = order;
        }
        if let Some(count) = self.baseline {
            config.baseline_sample_count = count;
        }
        if let Some(start) = self.start {
            config.start_line_index = start;
        }
        if let Some(end) = self.end {
            config.end_line_index = end;
        }
        if let Some(threshold) = self.threshold {
            config.intersection_amplitude_threshold = threshold;
        }
        Ok(config)
    }
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.configuration()?;

    let result = process_file(&cli.input, &config)
        .with_context(|| format!("Failed to process {}", cli.input.display()))?;

    if let Some(path) = &cli.export {
        export_series(path, &result)
            .with_context(|| format!("Failed to export series to {}", path.display()))?;
        log::info!("Wrote {} rows to {}", result.trace.len(), path.display());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn export_series(path: &Path, result: &PipelineResult) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["time", "strain", "interferometer", "smoothed", "corrected", "derivative"])?;
    let trace = &result.trace;
    for i in 0..trace.len() {
        wtr.write_record(&[
            trace.time()[i].to_string(),
            trace.strain()[i].to_string(),
            trace.interferometer()[i].to_string(),
            result.smoothed[i].to_string(),
            result.corrected[i].to_string(),
            result.derivative[i].to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn print_summary(result: &PipelineResult) {
    println!("samples:        {}", result.trace.len());
    println!("zero crossings: {}", result.zero_crossings.len());
    match result.focus {
        Some(hint) => println!("focus:          {:.6e} s (+/- {:.3e} s)", hint.time, hint.window),
        None => println!("focus:          none"),
    }
    println!("intersections:  {}", result.intersections.len());
    for (i, point) in result.intersections.iter().enumerate() {
        println!("  {:>3}  t = {:.6e} s  value = {:+.6}", i + 1, point.time, point.value);
    }
}
