//! Basic descriptive statistics over `f64` slices.
//!
//! Callers are expected to precondition-check their inputs; empty-slice
//! handling is documented per function rather than signalled through errors.

/// Arithmetic mean. Panics on an empty slice.
pub fn average(values: &[f64]) -> f64 {
    debug_assert!(!values.is_empty());
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median: middle element, or the mean of the two middle elements.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Population standard deviation (divides by n).
pub fn std_dev(values: &[f64]) -> f64 {
    let mean = average(values);
    let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (sum_sq / values.len() as f64).sqrt()
}

/// Sample standard deviation (divides by n-1). A single observation has no
/// spread, so n == 1 returns 0.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() == 1 {
        return 0.0;
    }
    let mean = average(values);
    let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Running cumulative sum.
pub fn cumsum(values: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    values
        .iter()
        .map(|v| {
            acc += v;
            acc
        })
        .collect()
}

pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Mean of the index domain weighted by `weights[i]`: Σ i·w_i / Σ w_i.
/// When the weights form a probability histogram the divisor is 1.
pub fn index_weighted_average(weights: &[f64]) -> f64 {
    weights
        .iter()
        .enumerate()
        .map(|(i, w)| i as f64 * w)
        .sum()
}

/// Weighted mean of `values` by `weights`.
pub fn weighted_average(values: &[f64], weights: &[f64]) -> f64 {
    debug_assert_eq!(values.len(), weights.len());
    let mut total = 0.0;
    let mut weight = 0.0;
    for (v, w) in values.iter().zip(weights.iter()) {
        total += v * w;
        weight += w;
    }
    total / weight
}

/// Standard deviation of the index domain around an integer `mean`, weighted
/// by `weights[i]`. The denominator is `((k-1)·Σw)/k` where k counts the
/// non-zero weights, matching the sample-style correction for histograms.
pub fn index_weighted_std_dev(weights: &[f64], mean: i32) -> f64 {
    let mut sum_sq = 0.0;
    let mut weight = 0.0;
    let mut non_zero = 0usize;
    for (i, w) in weights.iter().enumerate() {
        let d = i as f64 - mean as f64;
        sum_sq += w * d * d;
        weight += w;
        if *w != 0.0 {
            non_zero += 1;
        }
    }
    let denom = ((non_zero as f64 - 1.0) * weight) / non_zero as f64;
    (sum_sq / denom).sqrt()
}

/// Round to the nearest integer (halves away from zero).
pub fn round_to_nearest(d: f64) -> i32 {
    d.round() as i32
}

/// Discrete convolution of two finite non-negative sequences. The result has
/// length `x.len() + h.len() - 1`.
pub fn convolve(x: &[f64], h: &[f64]) -> Vec<f64> {
    debug_assert!(!x.is_empty() && !h.is_empty());

    let mut out = vec![0.0; x.len() + h.len() - 1];
    for (i, slot) in out.iter_mut().enumerate() {
        let mut val = 0.0;
        for (j, hv) in h.iter().enumerate() {
            if i >= j && i - j < x.len() {
                val += x[i - j] * hv;
            }
        }
        *slot = val;
    }
    out
}
