use std::ops::Range;
use std::sync::Arc;

use crate::coefficients::CoefficientCache;
use crate::config::normalize_filter_params;

/// Runs `coeffs` as a centered sliding dot product over `data`.
///
/// Indices that fall outside the input are clamped to the nearest edge
/// sample, so the output always has the input's length.
pub fn convolve(data: &[f64], coeffs: &[f64]) -> Vec<f64> {
    let n = data.len();
    if n == 0 || coeffs.is_empty() {
        return vec![0.0; n];
    }
    let half = (coeffs.len() - 1) as isize / 2;
    let last = n as isize - 1;

    (0..n as isize)
        .map(|i| {
            coeffs
                .iter()
                .enumerate()
                .map(|(k, &c)| {
                    let idx = (i + k as isize - half).clamp(0, last);
                    data[idx as usize] * c
                })
                .sum::<f64>()
        })
        .collect()
}

/// Splits a boolean mask into maximal runs of `true` positions.
pub fn contiguous_runs(mask: &[bool]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, &selected) in mask.iter().enumerate() {
        match (selected, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(s..mask.len());
    }
    runs
}

/// A Savitzky-Golay filter for signal smoothing and differentiation.
#[derive(Debug, Clone)]
pub struct SavitzkyGolayFilter {
    window_size: usize,
    poly_order: usize,
    cache: Arc<CoefficientCache>,
}

impl SavitzkyGolayFilter {
    /// Creates a filter backed by the process-wide coefficient cache.
    ///
    /// Parameters are clamped rather than rejected: the window is forced odd
    /// and at least 3, the order into `1..window_size`.
    ///
    /// ```rust
    /// use tenzotrace::SavitzkyGolayFilter;
    ///
    /// let filter = SavitzkyGolayFilter::new(5, 2);
    /// let smoothed = filter.apply(&[1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
    /// assert_eq!(smoothed.len(), 9);
    /// ```
    pub fn new(window_size: usize, poly_order: usize) -> Self {
        let (window_size, poly_order) = normalize_filter_params(window_size, poly_order);
        Self {
            window_size,
            poly_order,
            cache: CoefficientCache::shared(),
        }
    }

    /// Uses `cache` instead of the process-wide one
    pub fn with_cache(mut self, cache: Arc<CoefficientCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn poly_order(&self) -> usize {
        self.poly_order
    }

    /// Smooths `data`.
    ///
    /// # Arguments
    ///
    /// * `data` - Samples to smooth
    ///
    /// # Returns
    ///
    /// A vector of the same length. The input comes back unchanged when
    /// `data.len() <= window_size` (a 31-sample input is never smoothed by a
    /// 31-sample window) or when the kernel is degenerate.
    pub fn apply(&self, data: &[f64]) -> Vec<f64> {
        if data.len() <= self.window_size {
            return data.to_vec();
        }
        match self.cache.get(self.window_size, self.poly_order) {
            Ok(coeffs) => convolve(data, &coeffs.smoothing),
            Err(e) => {
                log::warn!("smoothing skipped: {}", e);
                data.to_vec()
            }
        }
    }

    /// Estimates the first time derivative of `data` sampled at `time`.
    ///
    /// Sample spacing is taken from the first two timestamps. Input with
    /// `data.len() <= window_size`, a non-positive spacing or a degenerate
    /// kernel give an all-zero result.
    pub fn apply_derivative(&self, time: &[f64], data: &[f64]) -> Vec<f64> {
        let n = data.len();
        if n <= self.window_size || time.len() < 2 {
            return vec![0.0; n];
        }
        let spacing = time[1] - time[0];
        if !(spacing.is_finite() && spacing > 0.0) {
            log::warn!("derivative skipped: sample spacing {} is not positive", spacing);
            return vec![0.0; n];
        }
        match self.cache.get(self.window_size, self.poly_order) {
            Ok(coeffs) => convolve(data, &coeffs.derivative)
                .into_iter()
                .map(|d| d / spacing)
                .collect(),
            Err(e) => {
                log::warn!("derivative skipped: {}", e);
                vec![0.0; n]
            }
        }
    }

    /// Computes the derivative only where `mask` is set, leaving zeros elsewhere.
    ///
    /// Each contiguous run of selected samples is filtered on its own local
    /// arrays. When a run is not longer than the window, the window shrinks
    /// to the largest odd size below the run length; runs shorter than four
    /// samples stay zero.
    pub fn apply_derivative_masked(&self, time: &[f64], data: &[f64], mask: &[bool]) -> Vec<f64> {
        let n = data.len().min(time.len()).min(mask.len());
        let mut out = vec![0.0; data.len()];

        for run in contiguous_runs(&mask[..n]) {
            let len = run.len();
            if len < 4 {
                continue;
            }
            // Shrinking keeps short runs differentiated instead of hitting the
            // pass-through in `apply_derivative`.
            let window = if len > self.window_size {
                self.window_size
            } else if len % 2 == 0 {
                len - 1
            } else {
                len - 2
            };
            let local = SavitzkyGolayFilter::new(window, self.poly_order)
                .with_cache(Arc::clone(&self.cache));
            let derivative = local.apply_derivative(&time[run.clone()], &data[run.clone()]);
            out[run].copy_from_slice(&derivative);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn uniform_time(n: usize, dt: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * dt).collect()
    }

    #[test]
    fn test_basic_smoothing() {
        let filter = SavitzkyGolayFilter::new(5, 2);
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        let smoothed = filter.apply(&data);

        assert_eq!(smoothed.len(), data.len());
        assert!(smoothed[4] > smoothed[0]);
        assert!(smoothed[4] > smoothed[8]);
    }

    #[test]
    fn test_polynomial_preservation() {
        let filter = SavitzkyGolayFilter::new(5, 2);

        // Quadratic polynomial: y = x^2
        let data: Vec<f64> = (0..20).map(|x| (x as f64).powi(2)).collect();
        let smoothed = filter.apply(&data);

        // Interior points are untouched by edge clamping
        for i in 2..18 {
            assert_abs_diff_eq!(data[i], smoothed[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_constant_preservation() {
        for (window, order) in [(3, 1), (5, 2), (11, 2), (31, 3), (9, 4)] {
            let filter = SavitzkyGolayFilter::new(window, order);
            for constant in [-2.5_f64, 0.0, 1.0, 1234.5] {
                let smoothed = filter.apply(&vec![constant; 64]);
                for value in smoothed {
                    assert_abs_diff_eq!(value, constant, epsilon = 1e-8 * constant.abs().max(1.0));
                }
            }
        }
    }

    #[test]
    fn test_derivative_of_ramp() {
        let filter = SavitzkyGolayFilter::new(7, 1);
        let dt = 2e-9;
        let time = uniform_time(50, dt);
        let data: Vec<f64> = time.iter().map(|t| 0.3 + 4.0e6 * t).collect();
        let derivative = filter.apply_derivative(&time, &data);

        for i in 3..47 {
            assert_abs_diff_eq!(derivative[i], 4.0e6, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_derivative_of_cubic() {
        let filter = SavitzkyGolayFilter::new(7, 3);
        let step = 0.1;
        let time = uniform_time(30, step);
        let data: Vec<f64> = time.iter().map(|x| x.powi(3)).collect();
        let derivative = filter.apply_derivative(&time, &data);

        for i in 3..27 {
            let x = time[i];
            assert_abs_diff_eq!(derivative[i], 3.0 * x * x, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_edges_are_clamped_and_finite() {
        let filter = SavitzkyGolayFilter::new(31, 3);
        let data: Vec<f64> = (0..40).map(|i| (i as f64 * 0.7).sin()).collect();
        let smoothed = filter.apply(&data);
        let derivative = filter.apply_derivative(&uniform_time(40, 1.0), &data);

        assert_eq!(smoothed.len(), 40);
        assert!(smoothed.iter().chain(derivative.iter()).all(|v| v.is_finite()));
    }

    #[test]
    fn test_convolve_wider_than_data() {
        let coeffs = vec![0.2; 5];
        let out = convolve(&[1.0, 3.0], &coeffs);
        // Clamped inputs: [1, 1, 1, 3, 3] and [1, 1, 3, 3, 3]
        assert_abs_diff_eq!(out[0], 1.8, epsilon = 1e-12);
        assert_abs_diff_eq!(out[1], 2.2, epsilon = 1e-12);
        assert!(convolve(&[], &coeffs).is_empty());
    }

    #[test]
    fn test_short_data() {
        let filter = SavitzkyGolayFilter::new(5, 2);
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(filter.apply(&data), data);
        assert_eq!(filter.apply_derivative(&[0.0, 1.0, 2.0, 3.0, 4.0], &data), vec![0.0; 5]);
        assert!(filter.apply(&[]).is_empty());
    }

    #[test]
    fn test_window_length_boundary() {
        let filter = SavitzkyGolayFilter::new(31, 3);
        let wavy = |n: usize| -> Vec<f64> { (0..n).map(|i| (i as f64 * 0.9).sin()).collect() };

        let exact = wavy(31);
        assert_eq!(filter.apply(&exact), exact);
        assert_eq!(filter.apply_derivative(&uniform_time(31, 1.0), &exact), vec![0.0; 31]);

        let longer = wavy(32);
        assert_ne!(filter.apply(&longer), longer);
        assert!(filter
            .apply_derivative(&uniform_time(32, 1.0), &longer)
            .iter()
            .any(|d| *d != 0.0));
    }

    #[test]
    fn test_degenerate_kernel_falls_back() {
        let filter = SavitzkyGolayFilter::new(401, 200);
        assert!(crate::coefficients::compute_coefficients(401, 200).is_err());

        let data: Vec<f64> = (0..500).map(|i| (i as f64 * 0.05).sin()).collect();
        assert_eq!(filter.apply(&data), data);
        assert_eq!(filter.apply_derivative(&uniform_time(500, 1.0), &data), vec![0.0; 500]);
    }

    #[test]
    fn test_zero_spacing_gives_zero_derivative() {
        let filter = SavitzkyGolayFilter::new(3, 1);
        let time = vec![1.0; 10];
        let data: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert_eq!(filter.apply_derivative(&time, &data), vec![0.0; 10]);
    }

    #[test]
    fn test_contiguous_runs() {
        let mask = [false, true, true, false, true, false, false, true, true, true];
        assert_eq!(contiguous_runs(&mask), vec![1..3, 4..5, 7..10]);
        assert!(contiguous_runs(&[false, false]).is_empty());
    }

    #[test]
    fn test_masked_derivative() {
        let filter = SavitzkyGolayFilter::new(5, 2);
        let time = uniform_time(100, 0.5);
        let data: Vec<f64> = time.iter().map(|t| 3.0 * t).collect();
        let mut mask = vec![false; 100];
        mask[20..40].iter_mut().for_each(|m| *m = true);
        mask[60..65].iter_mut().for_each(|m| *m = true);
        mask[90..92].iter_mut().for_each(|m| *m = true);

        let derivative = filter.apply_derivative_masked(&time, &data, &mask);

        assert_eq!(derivative.len(), 100);
        for i in 22..38 {
            assert_abs_diff_eq!(derivative[i], 3.0, epsilon = 1e-9);
        }
        // Five-sample run falls back to a window of three
        for i in 61..64 {
            assert_abs_diff_eq!(derivative[i], 3.0, epsilon = 1e-9);
        }
        // Too short and unselected positions stay zero
        assert_eq!(derivative[90], 0.0);
        assert_eq!(derivative[50], 0.0);
        assert_eq!(derivative[0], 0.0);
    }
}
