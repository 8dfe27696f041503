use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};

/// Smallest usable Savitzky-Golay window.
pub const MIN_WINDOW_SIZE: usize = 3;

/// Parameters for parsing and processing one trace.
///
/// Every field has a default so a partial JSON file only needs to name the
/// values it changes. Out-of-range filter parameters are not rejected; call
/// [`Configuration::normalized`] to clamp them into a usable shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Size of the smoothing window (forced odd, at least 3)
    pub smoothing_window_size: usize,
    /// Order of the fitted polynomial (at least 1, below the window size)
    pub polynomial_order: usize,
    /// Number of leading samples averaged for baseline correction
    pub baseline_sample_count: usize,
    /// First data row (1-based, counted after the header) that is kept
    pub start_line_index: usize,
    /// Last data row that is kept
    pub end_line_index: usize,
    /// Half-width in seconds of the derivative window around each zero crossing
    pub derivative_window_seconds: f64,
    /// Minimum distance in seconds between two reported roots
    pub root_min_separation: f64,
    /// Largest amplitude magnitude an intersection may have to be reported
    pub intersection_amplitude_threshold: f64,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            smoothing_window_size: 31,
            polynomial_order: 3,
            baseline_sample_count: 2000,
            start_line_index: 6650,
            end_line_index: 27000,
            derivative_window_seconds: 200e-9,
            root_min_separation: 100e-9,
            intersection_amplitude_threshold: 0.02,
        }
    }
}

impl Configuration {
    /// Loads a configuration from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parses a configuration from JSON text.
    ///
    /// # Arguments
    ///
    /// * `text` - A JSON object; unknown keys are ignored, missing keys keep their defaults
    ///
    /// # Returns
    ///
    /// The configuration, or [`TraceError::ConfigFormat`] if a value has the wrong type
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Sets the Savitzky-Golay window size and polynomial order.
    ///
    /// Values are stored as given; [`Configuration::normalized`] clamps them.
    pub fn with_smoothing(mut self, window_size: usize, polynomial_order: usize) -> Self {
        self.smoothing_window_size = window_size;
        self.polynomial_order = polynomial_order;
        self
    }

    /// Sets how many leading samples are averaged for baseline correction
    pub fn with_baseline_sample_count(mut self, count: usize) -> Self {
        self.baseline_sample_count = count;
        self
    }

    /// Sets the inclusive range of data rows kept by the parser.
    ///
    /// # Arguments
    ///
    /// * `start` - First kept row, counted from 1 after the header
    /// * `end` - Last kept row; parsing stops after it
    pub fn with_line_range(mut self, start: usize, end: usize) -> Self {
        self.start_line_index = start;
        self.end_line_index = end;
        self
    }

    /// Sets the half-width of the derivative window around each zero crossing
    pub fn with_derivative_window_seconds(mut self, seconds: f64) -> Self {
        self.derivative_window_seconds = seconds;
        self
    }

    /// Sets the minimum spacing in seconds between reported roots
    pub fn with_root_min_separation(mut self, seconds: f64) -> Self {
        self.root_min_separation = seconds;
        self
    }

    /// Sets the largest `|amplitude|` an intersection may have
    pub fn with_intersection_amplitude_threshold(mut self, threshold: f64) -> Self {
        self.intersection_amplitude_threshold = threshold;
        self
    }

    /// Returns a copy with the filter parameters clamped into range.
    pub fn normalized(&self) -> Self {
        let (window, order) =
            normalize_filter_params(self.smoothing_window_size, self.polynomial_order);
        if window != self.smoothing_window_size || order != self.polynomial_order {
            log::warn!(
                "clamped filter parameters from (window={}, order={}) to (window={}, order={})",
                self.smoothing_window_size,
                self.polynomial_order,
                window,
                order
            );
        }
        Self {
            smoothing_window_size: window,
            polynomial_order: order,
            ..self.clone()
        }
    }
}

/// Forces `window_size` odd and at least 3, and `poly_order` into `1..window_size`.
pub fn normalize_filter_params(window_size: usize, poly_order: usize) -> (usize, usize) {
    let mut window = window_size.max(MIN_WINDOW_SIZE);
    if window % 2 == 0 {
        window += 1;
    }
    let order = poly_order.clamp(1, window - 1);
    (window, order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert_eq!(config.smoothing_window_size, 31);
        assert_eq!(config.polynomial_order, 3);
        assert_eq!(config.baseline_sample_count, 2000);
        assert_eq!((config.start_line_index, config.end_line_index), (6650, 27000));
        assert_eq!(config.intersection_amplitude_threshold, 0.02);
    }

    #[test]
    fn test_normalize_filter_params() {
        assert_eq!(normalize_filter_params(31, 3), (31, 3));
        assert_eq!(normalize_filter_params(4, 2), (5, 2));
        assert_eq!(normalize_filter_params(0, 0), (3, 1));
        assert_eq!(normalize_filter_params(1, 5), (3, 2));
        assert_eq!(normalize_filter_params(5, 5), (5, 4));
        assert_eq!(normalize_filter_params(3, 2), (3, 2));
    }

    #[test]
    fn test_normalized_keeps_other_fields() {
        let config = Configuration::default()
            .with_smoothing(10, 12)
            .with_baseline_sample_count(50);
        let normalized = config.normalized();
        assert_eq!(normalized.smoothing_window_size, 11);
        assert_eq!(normalized.polynomial_order, 10);
        assert_eq!(normalized.baseline_sample_count, 50);
    }

    #[test]
    fn test_partial_json() {
        let text = r#"{"smoothing_window_size": 11, "start_line_index": 0}"#;
        let config = Configuration::from_json_str(text).unwrap();
        assert_eq!(config.smoothing_window_size, 11);
        assert_eq!(config.start_line_index, 0);
        assert_eq!(config.polynomial_order, 3);
        assert_eq!(config.end_line_index, 27000);
    }

    #[test]
    fn test_bad_json() {
        let result = Configuration::from_json_str("{\"polynomial_order\": \"three\"}");
        assert!(matches!(result, Err(TraceError::ConfigFormat(_))));
    }
}
