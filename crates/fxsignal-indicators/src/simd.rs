//! SIMD reductions shared by the indicator functions.
//!
//! Histories are short (a few hundred samples) but these run for every
//! instrument on every cycle, so the hot reductions go through `wide`.

use wide::f64x4;

#[inline]
fn lanes(chunk: &[f64]) -> f64x4 {
    f64x4::new([chunk[0], chunk[1], chunk[2], chunk[3]])
}

/// Sum of a slice.
pub fn sum(data: &[f64]) -> f64 {
    let mut chunks = data.chunks_exact(4);
    let mut acc = f64x4::splat(0.0);

    for chunk in &mut chunks {
        acc += lanes(chunk);
    }

    acc.reduce_add() + chunks.remainder().iter().sum::<f64>()
}

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    sum(data) / data.len() as f64
}

/// Population variance around `mean`.
pub fn variance_about(data: &[f64], mean: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let centre = f64x4::splat(mean);
    let mut chunks = data.chunks_exact(4);
    let mut acc = f64x4::splat(0.0);

    for chunk in &mut chunks {
        let diff = lanes(chunk) - centre;
        acc += diff * diff;
    }

    let tail: f64 = chunks
        .remainder()
        .iter()
        .map(|x| (x - mean) * (x - mean))
        .sum();

    (acc.reduce_add() + tail) / data.len() as f64
}

/// Population standard deviation.
pub fn std_dev(data: &[f64]) -> f64 {
    variance_about(data, mean(data)).sqrt()
}

/// Absolute differences between consecutive values.
///
/// Returns `len - 1` values, empty for fewer than two inputs.
pub fn abs_diffs(data: &[f64]) -> Vec<f64> {
    if data.len() < 2 {
        return vec![];
    }

    let n = data.len() - 1;
    let mut out = Vec::with_capacity(n);
    let chunks = n / 4;

    for i in 0..chunks {
        let idx = i * 4;
        let prev = lanes(&data[idx..idx + 4]);
        let curr = lanes(&data[idx + 1..idx + 5]);
        let diff = curr - prev;
        out.extend(diff.max(-diff).to_array());
    }

    for i in (chunks * 4)..n {
        out.push((data[i + 1] - data[i]).abs());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_and_mean() {
        let data: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        assert!((sum(&data) - 55.0).abs() < 1e-10);
        assert!((mean(&data) - 5.5).abs() < 1e-10);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_std_dev() {
        // Population std dev of [2,4,4,4,5,5,7,9] is 2.0
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_dev(&data) - 2.0).abs() < 1e-10);
        assert_eq!(std_dev(&[3.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn test_abs_diffs_matches_scalar() {
        let data = [1.0, 3.0, 2.0, 2.5, 1.0, 4.0, 4.0];
        let diffs = abs_diffs(&data);

        assert_eq!(diffs, vec![2.0, 1.0, 0.5, 1.5, 3.0, 0.0]);
        assert!(abs_diffs(&[1.0]).is_empty());
    }
}
