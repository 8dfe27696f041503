//! Heuristic locator for the dominant transient edge in a signal.

use serde::Serialize;

use crate::baseline::leading_mean;
use crate::filter::SavitzkyGolayFilter;

const PRESMOOTH_WINDOW: usize = 11;
const PRESMOOTH_ORDER: usize = 2;
/// Fraction of the drop below baseline that marks the onset.
const AMPLITUDE_FRACTION: f64 = 0.15;
/// Slopes above this fraction of the peak slope still belong to the edge.
const SLOPE_FRACTION: f64 = 0.35;
const MIN_BASELINE_SAMPLES: usize = 20;
const MIN_WINDOW_SAMPLES: usize = 20;
const MIN_WINDOW_SECONDS: f64 = 1e-6;

/// Center and half-width of a detected transient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FocusHint {
    pub time: f64,
    pub window: f64,
}

/// Locates the onset of the dominant transient in `signal`.
///
/// The signal is pre-smoothed, then the first sample that drops 15% of the
/// way from the leading baseline to the global minimum marks the onset. If
/// the signal never drops below its baseline, the onset is found by walking
/// back from the steepest slope while the slope keeps its sign and stays
/// above 35% of the peak. Returns `None` for flat or too short input.
pub fn detect_jump(time: &[f64], signal: &[f64]) -> Option<FocusHint> {
    let n = time.len().min(signal.len());
    if n < 2 {
        return None;
    }
    let smoothed = SavitzkyGolayFilter::new(PRESMOOTH_WINDOW, PRESMOOTH_ORDER).apply(&signal[..n]);

    let onset = amplitude_onset(&smoothed).or_else(|| slope_onset(&time[..n], &smoothed))?;
    log::debug!("jump edge onset at sample {} of {}", onset, n);

    Some(FocusHint {
        time: time[onset],
        window: focus_window(&time[..n], onset),
    })
}

fn amplitude_onset(smoothed: &[f64]) -> Option<usize> {
    let n = smoothed.len();
    let baseline_count = MIN_BASELINE_SAMPLES.max(n / 20);
    let baseline = leading_mean(smoothed, baseline_count);
    let minimum = smoothed.iter().copied().fold(f64::INFINITY, f64::min);
    let amplitude = baseline - minimum;
    if !(amplitude > 0.0) {
        return None;
    }
    let threshold = baseline - AMPLITUDE_FRACTION * amplitude;
    smoothed.iter().position(|&v| v <= threshold)
}

fn slope_onset(time: &[f64], smoothed: &[f64]) -> Option<usize> {
    let slopes: Vec<f64> = smoothed
        .windows(2)
        .zip(time.windows(2))
        .map(|(y, t)| {
            let dt = t[1] - t[0];
            if dt > 0.0 {
                (y[1] - y[0]) / dt
            } else {
                y[1] - y[0]
            }
        })
        .collect();

    let (peak, peak_slope) = slopes
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, s)| s.is_finite())
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))?;
    if peak_slope == 0.0 {
        return None;
    }

    let limit = SLOPE_FRACTION * peak_slope.abs();
    let mut onset = peak;
    while onset > 0 {
        let s = slopes[onset - 1];
        if s.signum() != peak_slope.signum() || s.abs() <= limit {
            break;
        }
        onset -= 1;
    }
    Some(onset)
}

fn focus_window(time: &[f64], onset: usize) -> f64 {
    let n = time.len();
    let reach = MIN_WINDOW_SAMPLES.max(n / 50);
    let lo = onset.saturating_sub(reach);
    let hi = (onset + reach).min(n - 1);
    let window = 0.5 * (time[hi] - time[lo]);
    if window > 0.0 {
        window
    } else {
        MIN_WINDOW_SECONDS
    }
}
