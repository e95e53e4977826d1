use std::marker::PhantomData;

use featurizer_core::{AnnotationBus, FeaturizerError, Nullable};
use featurizer_stats::{Numeric, descriptive::RunningStats};

use crate::{TrainingOnlyEstimator, TrainingPolicy};

/// Min, max, count, sum and average of the non-null values of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticalMetricsAnnotation<V> {
    pub min: V,
    pub max: V,
    pub count: u64,
    pub sum: f64,
    pub average: f64,
    /// Number of null values seen. Not part of `count`.
    pub null_count: u64,
}

#[derive(Debug)]
pub struct StatisticalMetricsPolicy<T>
where
    T: Nullable,
{
    stats: RunningStats<T::Value>,
    null_count: u64,
    _marker: PhantomData<fn(&T)>,
}

impl<T> Default for StatisticalMetricsPolicy<T>
where
    T: Nullable,
    T::Value: Numeric,
{
    fn default() -> Self {
        Self {
            stats: RunningStats::new(),
            null_count: 0,
            _marker: PhantomData,
        }
    }
}

impl<T> TrainingPolicy for StatisticalMetricsPolicy<T>
where
    T: Nullable,
    T::Value: Numeric,
{
    const NAME: &'static str = "StatisticalMetricsEstimator";

    type Input = T;
    type Annotation = StatisticalMetricsAnnotation<T::Value>;

    fn fit(&mut self, item: &T) -> Result<(), FeaturizerError> {
        match item.nullable_value() {
            Some(value) => self.stats.push(value),
            None => self.null_count += 1,
        }
        Ok(())
    }

    fn complete_training(
        &mut self,
        _bus: &AnnotationBus,
        _column: usize,
    ) -> Result<Self::Annotation, FeaturizerError> {
        let (Some(min), Some(max)) = (self.stats.min(), self.stats.max()) else {
            return Err(FeaturizerError::NoValuesProvided);
        };
        Ok(StatisticalMetricsAnnotation {
            min,
            max,
            count: self.stats.count(),
            sum: self.stats.sum(),
            // An overflowed sum has no meaningful average.
            average: self.stats.mean().unwrap_or(f64::NAN),
            null_count: self.null_count,
        })
    }
}

/// Publishes a [`StatisticalMetricsAnnotation`] for one column.
pub type StatisticalMetricsEstimator<T> = TrainingOnlyEstimator<StatisticalMetricsPolicy<T>>;

impl<T> TrainingOnlyEstimator<StatisticalMetricsPolicy<T>>
where
    T: Nullable,
    T::Value: Numeric,
{
    pub fn new(bus: AnnotationBus, column: usize) -> Result<Self, FeaturizerError> {
        Self::with_policy(bus, column, StatisticalMetricsPolicy::default(), true, None)
    }
}

#[cfg(test)]
mod tests {
    use featurizer_core::{Estimator, driver};

    use super::*;

    #[test]
    fn test_metrics_skip_nulls() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = StatisticalMetricsEstimator::<Option<i32>>::new(bus, 0).unwrap();
        driver::train(
            &mut estimator,
            &[vec![Some(10), Some(20), None], vec![Some(30), Some(40), None]],
        )
        .unwrap();

        let annotation = estimator.annotation().unwrap();
        assert_eq!(annotation.min, 10);
        assert_eq!(annotation.max, 40);
        assert_eq!(annotation.count, 4);
        assert!((annotation.sum - 100.0).abs() < f64::EPSILON);
        assert!((annotation.average - 25.0).abs() < f64::EPSILON);
        assert_eq!(annotation.null_count, 2);
    }

    #[test]
    fn test_float_nan_is_null() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = StatisticalMetricsEstimator::<f64>::new(bus, 0).unwrap();
        driver::train(&mut estimator, &[vec![1.5, f64::NAN, -0.5]]).unwrap();
        let annotation = estimator.annotation().unwrap();
        assert_eq!(annotation.min, -0.5);
        assert_eq!(annotation.max, 1.5);
        assert_eq!(annotation.null_count, 1);
    }

    #[test]
    fn test_no_values() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = StatisticalMetricsEstimator::<Option<u8>>::new(bus, 0).unwrap();
        estimator.begin_training().unwrap();
        estimator.fit(&[None, None]).unwrap();
        estimator.on_data_completed().unwrap();
        let err = estimator.complete_training().unwrap_err();
        assert_eq!(err.to_string(), "No values were provided");
    }
}
