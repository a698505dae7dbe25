//! Utility functions and numerical constants.

pub mod linalg;

/// Small epsilon for numerical stability.
pub const EPS: f64 = 1e-10;

/// Default tolerance for positive-semidefiniteness checks.
pub const PSD_TOL: f64 = 1e-9;

/// Double factorial `(2n - 1)!! = 1 * 3 * 5 * ... * (2n - 1)`.
///
/// This is the 2n-th absolute moment constant of a standard normal variable:
/// `E Z^{2n} = (2n - 1)!!`. Returns 1.0 for `n = 0` (empty product).
pub fn double_factorial(n: u32) -> f64 {
    let mut acc = 1.0;
    let mut k = 1u64;
    while k + 1 <= 2 * n as u64 {
        acc *= k as f64;
        k += 2;
    }
    acc
}

/// Canonical cache key for a time point: the raw bit pattern of its `f64`.
///
/// Times inside a single model are produced deterministically, so bitwise
/// identity is the right notion of equality for memoization.
#[inline]
pub fn time_key(t: f64) -> u64 {
    t.to_bits()
}

/// Sort and deduplicate a list of times, rejecting non-finite entries.
pub fn normalize_times(times: &[f64]) -> crate::Result<Vec<f64>> {
    if times.is_empty() {
        return Err(crate::PathwiseError::empty_input("times"));
    }
    if times.iter().any(|t| !t.is_finite()) {
        return Err(crate::PathwiseError::invalid_parameter(
            "times",
            "must be finite",
        ));
    }
    let mut out = times.to_vec();
    out.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    out.dedup_by(|a, b| (*a - *b).abs() < EPS);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_factorial_small() {
        assert_eq!(double_factorial(0), 1.0);
        assert_eq!(double_factorial(1), 1.0); // 1!!
        assert_eq!(double_factorial(2), 3.0); // 3!!
        assert_eq!(double_factorial(3), 15.0); // 5!!
        assert_eq!(double_factorial(4), 105.0); // 7!!
    }

    #[test]
    fn test_normalize_times_sorts_and_dedups() {
        let times = normalize_times(&[2.0, 0.5, 2.0, 1.0]).unwrap();
        assert_eq!(times, vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn test_normalize_times_rejects_nan() {
        assert!(normalize_times(&[0.0, f64::NAN]).is_err());
        assert!(normalize_times(&[]).is_err());
    }
}
