// 📊 Robust statistics - quartiles and the IQR fence
//
// Quantiles use linear interpolation between order statistics:
//
//     h = p * (n - 1)
//     q = x[floor(h)] + (h - floor(h)) * (x[floor(h) + 1] - x[floor(h)])
//
// on the ascending-sorted sample. This is the common statistical-package default
// and is kept fixed so bounds reproduce exactly for the same input multiset.

use serde::{Deserialize, Serialize};

/// Fence width in IQRs (classical Tukey fence)
pub const FENCE_MULTIPLIER: f64 = 1.5;

// ============================================================================
// ROBUST BOUNDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobustBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl RobustBounds {
    /// Bounds over a sample; None for an empty sample
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let sorted = sorted_copy(values);
        let q1 = quantile_sorted(&sorted, 0.25)?;
        let q3 = quantile_sorted(&sorted, 0.75)?;
        Some(Self::from_quartiles(q1, q3))
    }

    pub fn from_quartiles(q1: f64, q3: f64) -> Self {
        let iqr = q3 - q1;
        RobustBounds {
            q1,
            q3,
            iqr,
            lower_bound: q1 - FENCE_MULTIPLIER * iqr,
            upper_bound: q3 + FENCE_MULTIPLIER * iqr,
        }
    }

    pub fn is_above(&self, value: f64) -> bool {
        value > self.upper_bound
    }

    pub fn is_below(&self, value: f64) -> bool {
        value < self.lower_bound
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Quantile of an unsorted sample
pub fn quantile(values: &[f64], p: f64) -> Option<f64> {
    quantile_sorted(&sorted_copy(values), p)
}

/// Quantile of an ascending-sorted sample, p clamped to [0, 1]
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let h = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;

    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_quantile_linear_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!(approx(quantile(&values, 0.25).unwrap(), 1.75));
        assert!(approx(quantile(&values, 0.5).unwrap(), 2.5));
        assert!(approx(quantile(&values, 0.75).unwrap(), 3.25));
        assert!(approx(quantile(&values, 0.0).unwrap(), 1.0));
        assert!(approx(quantile(&values, 1.0).unwrap(), 4.0));
    }

    #[test]
    fn test_quantile_unsorted_input() {
        let values = [9.0, 1.0, 5.0, 3.0, 7.0];
        assert!(approx(quantile(&values, 0.25).unwrap(), 3.0));
        assert!(approx(quantile(&values, 0.75).unwrap(), 7.0));
    }

    #[test]
    fn test_quantile_empty_and_single() {
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[4.2], 0.25), Some(4.2));
        assert_eq!(quantile(&[4.2], 0.75), Some(4.2));
    }

    #[test]
    fn test_bounds_tukey_fence() {
        let bounds = RobustBounds::from_values(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(approx(bounds.iqr, 1.5));
        assert!(approx(bounds.lower_bound, 1.75 - 2.25));
        assert!(approx(bounds.upper_bound, 3.25 + 2.25));
        assert!(bounds.is_above(5.6));
        assert!(!bounds.is_above(5.5));
        assert!(bounds.is_below(-0.6));
    }

    #[test]
    fn test_identical_values_zero_iqr() {
        let bounds = RobustBounds::from_values(&[0.3, 0.3, 0.3]).unwrap();
        assert_eq!(bounds.iqr, 0.0);
        assert_eq!(bounds.lower_bound, 0.3);
        assert_eq!(bounds.upper_bound, 0.3);
        assert!(!bounds.is_above(0.3));
    }

    #[test]
    fn test_heavy_tail_not_masked_by_outlier() {
        // One metro-sized value must not drag the fence up the way a mean/std test would
        let mut values = vec![1.0; 20];
        values.push(1_000.0);
        let bounds = RobustBounds::from_values(&values).unwrap();
        assert_eq!(bounds.upper_bound, 1.0);
        assert!(bounds.is_above(1_000.0));
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }
}
