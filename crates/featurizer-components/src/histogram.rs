use std::marker::PhantomData;

use featurizer_core::{AnnotationBus, FeaturizerError, Nullable};
use featurizer_stats::histogram::CountHistogram;

use crate::{TrainingOnlyEstimator, TrainingPolicy};

/// Occurrence count of every non-null value of a column, plus the number of nulls.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramAnnotation<V> {
    pub counts: CountHistogram<V>,
    pub null_count: u64,
}

impl<V> HistogramAnnotation<V>
where
    V: Ord,
{
    /// `true` if neither values nor nulls were seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty() && self.null_count == 0
    }
}

#[derive(Debug)]
pub struct HistogramPolicy<T>
where
    T: Nullable,
{
    counts: CountHistogram<T::Value>,
    null_count: u64,
    _marker: PhantomData<fn(&T)>,
}

impl<T> Default for HistogramPolicy<T>
where
    T: Nullable,
    T::Value: Ord,
{
    fn default() -> Self {
        Self {
            counts: CountHistogram::new(),
            null_count: 0,
            _marker: PhantomData,
        }
    }
}

impl<T> TrainingPolicy for HistogramPolicy<T>
where
    T: Nullable,
    T::Value: Ord + 'static,
{
    const NAME: &'static str = "HistogramEstimator";

    type Input = T;
    type Annotation = HistogramAnnotation<T::Value>;

    fn fit(&mut self, item: &T) -> Result<(), FeaturizerError> {
        match item.nullable_value() {
            Some(value) => self.counts.add(value),
            None => self.null_count += 1,
        }
        Ok(())
    }

    fn complete_training(
        &mut self,
        _bus: &AnnotationBus,
        _column: usize,
    ) -> Result<Self::Annotation, FeaturizerError> {
        Ok(HistogramAnnotation {
            counts: std::mem::take(&mut self.counts),
            null_count: self.null_count,
        })
    }
}

/// Publishes a [`HistogramAnnotation`] for one column.
pub type HistogramEstimator<T> = TrainingOnlyEstimator<HistogramPolicy<T>>;

impl<T> TrainingOnlyEstimator<HistogramPolicy<T>>
where
    T: Nullable,
    T::Value: Ord + 'static,
{
    pub fn new(bus: AnnotationBus, column: usize) -> Result<Self, FeaturizerError> {
        Self::with_policy(bus, column, HistogramPolicy::default(), true, None)
    }
}

#[cfg(test)]
mod tests {
    use featurizer_core::driver;

    use super::*;

    #[test]
    fn test_counts() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = HistogramEstimator::<Option<String>>::new(bus, 0).unwrap();
        let batch = ["a", "b", "a"]
            .into_iter()
            .map(|value| Some(value.to_owned()))
            .chain([None])
            .collect::<Vec<_>>();
        driver::train(&mut estimator, &[batch]).unwrap();

        let annotation = estimator.annotation().unwrap();
        assert_eq!(annotation.counts.count(&"a".to_owned()), 2);
        assert_eq!(annotation.counts.count(&"b".to_owned()), 1);
        assert_eq!(annotation.counts.total(), 3);
        assert_eq!(annotation.null_count, 1);
        assert!(!annotation.is_empty());
    }
}
