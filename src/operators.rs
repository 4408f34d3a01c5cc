//! Vector helpers shared by the reducer and the similarity engine
//!
//! - Allocation-free reductions over slices (mean, dot, norm)
//! - Centring returns a fresh vector; callers own the result
//! - Lengths are assumed equal; mismatches panic in debug builds

/// Computes the Euclidean norm (L2) without allocating.
#[inline]
pub fn norm(a: &[f64]) -> f64 {
    a.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

/// Dot product of two equally sized slices.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Dimension mismatch");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Arithmetic mean; `NaN` for an empty slice.
#[inline]
pub fn mean(a: &[f64]) -> f64 {
    if a.is_empty() {
        return f64::NAN;
    }
    a.iter().sum::<f64>() / a.len() as f64
}

/// Population variance (divides by `n`).
pub fn variance(a: &[f64]) -> f64 {
    let m = mean(a);
    if m.is_nan() {
        return f64::NAN;
    }
    a.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / a.len() as f64
}

/// Subtracts the mean and scales to unit norm.
///
/// A constant (zero-variance) row cannot be normalised; every entry becomes `NaN`
/// so that downstream correlations propagate "no signal" instead of failing.
pub fn standardise(a: &[f64]) -> Vec<f64> {
    let m = mean(a);
    let centred: Vec<f64> = a.iter().map(|&x| x - m).collect();
    let n = norm(&centred);
    if n > 0.0 && n.is_finite() {
        centred.into_iter().map(|x| x / n).collect()
    } else {
        vec![f64::NAN; a.len()]
    }
}
