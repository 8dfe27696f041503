//! # tenzotrace
//!
//! Signal processing for oscilloscope traces that pair a strain
//! ("tenzometric") channel with an optical interferometer channel.
//!
//! The pipeline parses the scope's CSV export into a calibrated [`Trace`],
//! smooths the interferometer channel with a Savitzky-Golay filter, removes
//! its leading baseline, and then derives:
//!
//! - zero crossings of the corrected interferometer signal,
//! - near-zero intersections between the strain and interferometer signals,
//! - a localized derivative around each zero crossing,
//! - a [`FocusHint`] for the dominant transient edge.
//!
//! ## Example
//!
//! ```rust
//! use tenzotrace::{process_text, Configuration};
//!
//! let mut text = String::from("TIME,CH1,CH2,CH3,CH4\n");
//! for i in 0..200 {
//!     let level = if i < 100 { 0.0 } else { -1.0 };
//!     text.push_str(&format!("{:e},0.0,0,{},0\n", i as f64 * 1e-9, level));
//! }
//!
//! let config = Configuration::default()
//!     .with_line_range(0, 10_000)
//!     .with_baseline_sample_count(50);
//! let result = process_text(&text, &config);
//! assert_eq!(result.trace.len(), 200);
//! assert!(result.focus.is_some());
//! ```

pub mod baseline;
pub mod coefficients;
pub mod config;
pub mod edge;
mod error;
pub mod filter;
pub mod linalg;
pub mod pipeline;
pub mod roots;
pub mod trace;

pub use coefficients::{compute_coefficients, CoefficientCache, FilterCoefficients};
pub use config::Configuration;
pub use edge::{detect_jump, FocusHint};
pub use error::{Result, TraceError};
pub use filter::SavitzkyGolayFilter;
pub use pipeline::{process, process_file, process_text, PipelineResult};
pub use roots::RootPoint;
pub use trace::Trace;

/// Parses oscilloscope CSV text into a calibrated trace.
pub fn parse(text: &str, config: &Configuration) -> Trace {
    Trace::parse(text, config)
}

/// Smooths `data` with a Savitzky-Golay filter of the given shape.
///
/// ```rust
/// let smoothed = tenzotrace::smooth(&[1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0], 5, 2);
/// assert_eq!(smoothed.len(), 9);
/// ```
pub fn smooth(data: &[f64], window_size: usize, poly_order: usize) -> Vec<f64> {
    SavitzkyGolayFilter::new(window_size, poly_order).apply(data)
}

/// Computes the first time derivative of `data` sampled at `time`.
pub fn derivative(time: &[f64], data: &[f64], window_size: usize, poly_order: usize) -> Vec<f64> {
    SavitzkyGolayFilter::new(window_size, poly_order).apply_derivative(time, data)
}
