use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::baseline::subtract_baseline;
use crate::config::Configuration;
use crate::edge::{detect_jump, FocusHint};
use crate::error::Result;
use crate::filter::SavitzkyGolayFilter;
use crate::roots::{intersections, zero_crossings, RootPoint};
use crate::trace::Trace;

/// Everything derived from one trace.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub trace: Trace,
    /// Smoothed interferometer channel
    pub smoothed: Vec<f64>,
    /// Smoothed interferometer channel with the leading baseline removed
    pub corrected: Vec<f64>,
    /// Derivative of `corrected` around each zero crossing, zero elsewhere
    pub derivative: Vec<f64>,
    pub zero_crossings: Vec<RootPoint>,
    /// Near-zero crossings of the strain channel and `corrected`
    pub intersections: Vec<RootPoint>,
    pub focus: Option<FocusHint>,
}

/// Runs smoothing, baseline correction, root finding and edge detection.
pub fn process(trace: Trace, config: &Configuration) -> PipelineResult {
    let config = config.normalized();
    let started = Instant::now();
    let time = trace.time();

    let filter = SavitzkyGolayFilter::new(config.smoothing_window_size, config.polynomial_order);
    let smoothed = filter.apply(trace.interferometer());
    let corrected = subtract_baseline(&smoothed, config.baseline_sample_count);

    let zero_crossings = zero_crossings(time, &corrected, config.root_min_separation);
    let intersections = intersections(
        time,
        trace.strain(),
        &corrected,
        config.intersection_amplitude_threshold,
        config.root_min_separation,
    );

    let mask = derivative_mask(time, &zero_crossings, config.derivative_window_seconds);
    let derivative = filter.apply_derivative_masked(time, &corrected, &mask);

    let focus = detect_jump(time, &corrected);

    log::debug!(
        "processed {} samples in {:?}: {} zero crossings, {} intersections, focus {:?}",
        trace.len(),
        started.elapsed(),
        zero_crossings.len(),
        intersections.len(),
        focus
    );

    PipelineResult {
        trace,
        smoothed,
        corrected,
        derivative,
        zero_crossings,
        intersections,
        focus,
    }
}

/// Parses `text` and processes the resulting trace.
pub fn process_text(text: &str, config: &Configuration) -> PipelineResult {
    process(Trace::parse(text, config), config)
}

/// Reads, parses and processes a trace file.
pub fn process_file<P: AsRef<Path>>(path: P, config: &Configuration) -> Result<PipelineResult> {
    let trace = Trace::from_file(path, config)?;
    Ok(process(trace, config))
}

/// Recomputes intersections after shifting the strain and corrected series.
pub fn intersections_with_offsets(
    result: &PipelineResult,
    strain_offset: f64,
    interferometer_offset: f64,
    config: &Configuration,
) -> Vec<RootPoint> {
    let shifted = Trace::new(
        result.trace.time().to_vec(),
        result.trace.strain().to_vec(),
        result.corrected.clone(),
    )
    .map(|t| t.with_offsets(strain_offset, interferometer_offset))
    .unwrap_or_default();

    intersections(
        shifted.time(),
        shifted.strain(),
        shifted.interferometer(),
        config.intersection_amplitude_threshold,
        config.root_min_separation,
    )
}

/// Marks samples within `half_width` seconds of any root.
pub fn derivative_mask(time: &[f64], roots: &[RootPoint], half_width: f64) -> Vec<bool> {
    let mut mask = vec![false; time.len()];
    for root in roots {
        let lo = time.partition_point(|&t| t < root.time - half_width);
        let hi = time.partition_point(|&t| t <= root.time + half_width);
        mask[lo..hi].iter_mut().for_each(|m| *m = true);
    }
    mask
}
