use crate::Numeric;

/// Running statistics accumulated one value at a time.
///
/// Unlike a batch summary, nothing is retained besides the extrema, the count and the
/// sum, so memory use is constant regardless of how many values are pushed.
#[derive(Debug, Clone, Default)]
pub struct RunningStats<T> {
    min: Option<T>,
    max: Option<T>,
    count: u64,
    sum: f64,
}

/// Snapshot of the statistics accumulated by [`RunningStats`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary<T> {
    /// The minimum value observed.
    pub min: T,
    /// The maximum value observed.
    pub max: T,
    /// The number of values observed.
    pub count: u64,
    /// The sum of all values, accumulated as `f64`.
    pub sum: f64,
    /// The arithmetic mean (`sum / count`).
    pub mean: f64,
}

impl<T> RunningStats<T>
where
    T: Numeric,
{
    /// Creates an accumulator with no values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            min: None,
            max: None,
            count: 0,
            sum: 0.0,
        }
    }

    /// Adds a value to the accumulator.
    ///
    /// # Examples
    ///
    /// ```
    /// # use featurizer_stats::descriptive::RunningStats;
    /// let mut stats = RunningStats::new();
    /// stats.push(3.0);
    /// stats.push(-1.0);
    /// assert_eq!(stats.count(), 2);
    /// assert_eq!(stats.min(), Some(-1.0));
    /// ```
    pub fn push(&mut self, value: T) {
        if self.min.is_none_or(|min| value < min) {
            self.min = Some(value);
        }
        if self.max.is_none_or(|max| value > max) {
            self.max = Some(value);
        }
        self.count += 1;
        self.sum += value.to_f64();
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub fn min(&self) -> Option<T> {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> Option<T> {
        self.max
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Returns the mean of the values pushed so far.
    ///
    /// # Returns
    ///
    /// * `Some(mean)` - if at least one value was pushed and the sum is finite
    /// * `None` - if no values were pushed or the sum overflowed
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 || !self.sum.is_finite() {
            return None;
        }
        Some(self.sum / self.count as f64)
    }

    /// Returns a snapshot of all statistics, or `None` if nothing usable was accumulated.
    #[must_use]
    pub fn summary(&self) -> Option<Summary<T>> {
        Some(Summary {
            min: self.min?,
            max: self.max?,
            count: self.count,
            sum: self.sum,
            mean: self.mean()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_has_no_summary() {
        let stats = RunningStats::<i32>::new();
        assert!(stats.is_empty());
        assert!(stats.summary().is_none());
        assert!(stats.mean().is_none());
    }

    #[test]
    fn test_summary_of_integers() {
        let mut stats = RunningStats::new();
        for value in [10, 20, 30, 40] {
            stats.push(value);
        }
        let summary = stats.summary().unwrap();
        assert_eq!(summary.min, 10);
        assert_eq!(summary.max, 40);
        assert_eq!(summary.count, 4);
        assert!((summary.sum - 100.0).abs() < f64::EPSILON);
        assert!((summary.mean - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_single_value() {
        let mut stats = RunningStats::new();
        stats.push(-2.5_f32);
        let summary = stats.summary().unwrap();
        assert!((summary.min - -2.5).abs() < f32::EPSILON);
        assert!((summary.max - -2.5).abs() < f32::EPSILON);
        assert!((summary.mean - -2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overflowing_sum_has_no_mean() {
        let mut stats = RunningStats::new();
        stats.push(f64::MAX);
        stats.push(f64::MAX);
        assert_eq!(stats.count(), 2);
        assert!(stats.mean().is_none());
    }
}
