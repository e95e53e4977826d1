//! Calculators applied to a slice of rolling-window history.
//!
//! Each calculator returns `None` for an empty window. Callers decide how to represent a
//! missing result (rolling-window transformers emit `NaN`).
//!
//! Comparisons use [`f64::total_cmp`], so a `NaN` in the window is ordered above every
//! other value rather than poisoning the result.

/// Minimum value of the window.
///
/// # Examples
///
/// ```
/// use featurizer_stats::window;
///
/// assert_eq!(window::min(&[3.0, 1.0, 2.0]), Some(1.0));
/// assert_eq!(window::min(&[]), None);
/// ```
#[must_use]
pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().min_by(f64::total_cmp)
}

/// Maximum value of the window.
#[must_use]
pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().max_by(f64::total_cmp)
}

/// Arithmetic mean of the window.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max() {
        let values = [4.0, -2.0, 8.0, 0.5];
        assert_eq!(min(&values), Some(-2.0));
        assert_eq!(max(&values), Some(8.0));
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 3.0, 6.0]), Some(3.0));
        assert_eq!(mean(&[7.0]), Some(7.0));
    }

    #[test]
    fn test_empty_window() {
        assert_eq!(min(&[]), None);
        assert_eq!(max(&[]), None);
        assert_eq!(mean(&[]), None);
    }
}
