use std::marker::PhantomData;

use featurizer_core::{AnnotationBus, FeaturizerError, Nullable};
use featurizer_stats::{Numeric, median::StreamingMedian};

use crate::{TrainingOnlyEstimator, TrainingPolicy};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MedianAnnotation {
    pub median: f64,
}

#[derive(Debug)]
pub struct MedianPolicy<T> {
    values: StreamingMedian,
    interpolate: bool,
    _marker: PhantomData<fn(&T)>,
}

impl<T> MedianPolicy<T> {
    /// With an even number of values, `interpolate` averages the two middle values instead of
    /// taking the lower one.
    #[must_use]
    pub fn new(interpolate: bool) -> Self {
        Self {
            values: StreamingMedian::new(),
            interpolate,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn interpolate(&self) -> bool {
        self.interpolate
    }
}

impl<T> TrainingPolicy for MedianPolicy<T>
where
    T: Nullable,
    T::Value: Numeric,
{
    const NAME: &'static str = "MedianEstimator";

    type Input = T;
    type Annotation = MedianAnnotation;

    fn fit(&mut self, item: &T) -> Result<(), FeaturizerError> {
        if let Some(value) = item.nullable_value() {
            self.values.push(value.to_f64());
        }
        Ok(())
    }

    fn complete_training(
        &mut self,
        _bus: &AnnotationBus,
        _column: usize,
    ) -> Result<Self::Annotation, FeaturizerError> {
        let median = self
            .values
            .median(self.interpolate)
            .ok_or(FeaturizerError::NoMedianElements)?;
        Ok(MedianAnnotation { median })
    }
}

/// Publishes a [`MedianAnnotation`] for one column.
pub type MedianEstimator<T> = TrainingOnlyEstimator<MedianPolicy<T>>;

impl<T> TrainingOnlyEstimator<MedianPolicy<T>>
where
    T: Nullable,
    T::Value: Numeric,
{
    pub fn new(
        bus: AnnotationBus,
        column: usize,
        interpolate: bool,
    ) -> Result<Self, FeaturizerError> {
        Self::with_policy(bus, column, MedianPolicy::new(interpolate), true, None)
    }
}
