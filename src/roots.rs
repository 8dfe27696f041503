//! Zero-crossing and intersection search over sampled signals.

use serde::Serialize;

/// Upper bound on de-duplication sweeps.
pub const MAX_DEDUP_PASSES: usize = 10;

/// A linearly interpolated crossing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RootPoint {
    pub time: f64,
    pub value: f64,
}

/// Finds the interpolated times where `signal` changes sign.
///
/// Only strict sign changes between neighbours count (`y[i-1] * y[i] < 0`),
/// so samples that sit exactly on zero are not reported. The result is
/// de-duplicated with `min_separation`.
pub fn zero_crossings(time: &[f64], signal: &[f64], min_separation: f64) -> Vec<RootPoint> {
    let n = time.len().min(signal.len());
    let mut roots = Vec::new();

    for i in 1..n {
        let (y0, y1) = (signal[i - 1], signal[i]);
        if y0 * y1 >= 0.0 {
            continue;
        }
        let fraction = y0 / (y0 - y1);
        roots.push(RootPoint {
            time: lerp(time[i - 1], time[i], fraction),
            value: 0.0,
        });
    }

    dedup_roots(roots, min_separation)
}

/// Finds where `a` and `b` cross each other near zero amplitude.
///
/// A crossing is a pair of neighbours whose difference goes from `<= 0` to
/// `> 0` or from `>= 0` to `< 0`. The crossing time and both series are
/// interpolated linearly; the reported value is the mean of the two
/// interpolated values, and crossings with `|value| > amplitude_threshold`
/// are dropped. The result is de-duplicated with `min_separation`.
pub fn intersections(
    time: &[f64],
    a: &[f64],
    b: &[f64],
    amplitude_threshold: f64,
    min_separation: f64,
) -> Vec<RootPoint> {
    let n = time.len().min(a.len()).min(b.len());
    let mut roots = Vec::new();

    for i in 1..n {
        let prev = a[i - 1] - b[i - 1];
        let curr = a[i] - b[i];
        let crosses = (prev <= 0.0 && curr > 0.0) || (prev >= 0.0 && curr < 0.0);
        let delta = curr - prev;
        if !crosses || delta == 0.0 {
            continue;
        }

        let fraction = -prev / delta;
        let value_a = lerp(a[i - 1], a[i], fraction);
        let value_b = lerp(b[i - 1], b[i], fraction);
        let value = 0.5 * (value_a + value_b);
        if value.abs() > amplitude_threshold {
            continue;
        }
        roots.push(RootPoint {
            time: lerp(time[i - 1], time[i], fraction),
            value,
        });
    }

    dedup_roots(roots, min_separation)
}

/// Drops roots closer than `min_separation` to the previously kept root.
///
/// Sweeps left to right and repeats until nothing changes, at most
/// [`MAX_DEDUP_PASSES`] times. Input is expected in time order.
pub fn dedup_roots(mut roots: Vec<RootPoint>, min_separation: f64) -> Vec<RootPoint> {
    for _ in 0..MAX_DEDUP_PASSES {
        let before = roots.len();
        let mut kept: Vec<RootPoint> = Vec::with_capacity(before);
        for root in roots {
            match kept.last() {
                Some(last) if root.time - last.time < min_separation => {}
                _ => kept.push(root),
            }
        }
        roots = kept;
        if roots.len() == before {
            break;
        }
    }
    roots
}

fn lerp(from: f64, to: f64, fraction: f64) -> f64 {
    from + fraction * (to - from)
}
