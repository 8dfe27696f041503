/// Mean of the first `min(count, len)` samples, or zero for an empty window.
pub fn leading_mean(data: &[f64], count: usize) -> f64 {
    let window = &data[..count.min(data.len())];
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

/// Subtracts the leading-window mean from every sample.
pub fn subtract_baseline(data: &[f64], count: usize) -> Vec<f64> {
    let offset = leading_mean(data, count);
    data.iter().map(|v| v - offset).collect()
}
