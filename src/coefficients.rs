use std::sync::{Arc, RwLock, RwLockReadGuard};

use ahash::AHashMap;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::config::normalize_filter_params;
use crate::error::Result;
use crate::linalg;

/// Savitzky-Golay convolution weights for one `(window_size, poly_order)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterCoefficients {
    pub window_size: usize,
    pub poly_order: usize,
    /// Row 0 of the pseudo-inverse: estimates the fitted value at the window center
    pub smoothing: Vec<f64>,
    /// Row 1 of the pseudo-inverse: slope per sample, divide by the sample spacing
    pub derivative: Vec<f64>,
}

impl FilterCoefficients {
    pub fn half_window(&self) -> usize {
        (self.window_size - 1) / 2
    }
}

/// Computes Savitzky-Golay coefficients by least-squares polynomial fitting.
///
/// The window is centered on zero with offsets `-half..=half`. The design
/// matrix `A` holds `offset^p` for `p` in `0..=poly_order`; the coefficients
/// are the first two rows of `(AᵗA)⁻¹ Aᵗ`.
///
/// Parameters are normalized first (window odd and at least 3, order in
/// `1..window_size`), so the only failure is a degenerate normal matrix.
pub fn compute_coefficients(window_size: usize, poly_order: usize) -> Result<FilterCoefficients> {
    let (window_size, poly_order) = normalize_filter_params(window_size, poly_order);
    let half = (window_size - 1) / 2;

    let offsets: Vec<f64> = (0..window_size)
        .map(|i| i as f64 - half as f64)
        .collect();
    let design = linalg::vandermonde(&offsets, poly_order);
    let pinv = linalg::pseudo_inverse(&design)?;

    Ok(FilterCoefficients {
        window_size,
        poly_order,
        smoothing: pinv.row(0).iter().copied().collect(),
        derivative: pinv.row(1).iter().copied().collect(),
    })
}

type EntryMap = AHashMap<(usize, usize), Arc<FilterCoefficients>>;

static SHARED: Lazy<Arc<CoefficientCache>> = Lazy::new(|| Arc::new(CoefficientCache::new()));

/// Memoizes coefficient sets by `(window_size, poly_order)`.
///
/// Safe to share between threads. Two callers racing on the same key may both
/// compute it; the results are identical so either insert wins.
#[derive(Debug, Default)]
pub struct CoefficientCache {
    entries: RwLock<EntryMap>,
}

impl CoefficientCache {
    /// Creates a new, empty coefficient cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache used by filters that are not given their own.
    pub fn shared() -> Arc<CoefficientCache> {
        Arc::clone(&SHARED)
    }

    /// Gets coefficients from cache or computes them if not cached.
    ///
    /// Degenerate results are not cached.
    pub fn get(&self, window_size: usize, poly_order: usize) -> Result<Arc<FilterCoefficients>> {
        let key = normalize_filter_params(window_size, poly_order);

        if let Some(found) = self.read_entries().get(&key) {
            return Ok(Arc::clone(found));
        }

        let computed = Arc::new(compute_coefficients(key.0, key.1)?);
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(Arc::clone(entries.entry(key).or_insert(computed)))
    }

    /// Returns the number of cached coefficient sets
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    /// Returns true if nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, EntryMap> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
