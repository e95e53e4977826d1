use std::marker::PhantomData;

use featurizer_core::{AnnotationBus, FeaturizerError, Nullable};

use crate::{
    HistogramAnnotation, HistogramPolicy, OrderAnnotation, OrderPolicy, TrainingOnlyEstimator,
    TrainingPolicy,
};

/// The most frequent non-null value of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeAnnotation<V> {
    pub value: V,
}

/// Derives the mode from the histogram and order annotations of the same column.
///
/// Needs no training data of its own. Ties are broken in favor of the value seen first.
#[derive(Debug)]
pub struct ModePolicy<T>(PhantomData<fn(&T)>);

impl<T> Default for ModePolicy<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> TrainingPolicy for ModePolicy<T>
where
    T: Nullable,
    T::Value: Ord + 'static,
{
    const NAME: &'static str = "ModeEstimator";

    type Input = T;
    type Annotation = ModeAnnotation<T::Value>;

    fn fit(&mut self, _item: &T) -> Result<(), FeaturizerError> {
        Ok(())
    }

    fn complete_training(
        &mut self,
        bus: &AnnotationBus,
        column: usize,
    ) -> Result<Self::Annotation, FeaturizerError> {
        let histogram =
            bus.lookup::<HistogramAnnotation<T::Value>>(column, HistogramPolicy::<T>::NAME)?;
        let order = bus.lookup::<OrderAnnotation<T::Value>>(column, OrderPolicy::<T>::NAME)?;

        if histogram.is_empty() {
            return Err(FeaturizerError::EmptyHistogram);
        }

        let mut mode: Option<(&T::Value, u64, u32)> = None;
        for (value, count) in histogram.counts.iter() {
            let Some(&index) = order.first_seen.get(value) else {
                continue;
            };
            let better = mode.is_none_or(|(_, best_count, best_index)| {
                count > best_count || (count == best_count && index < best_index)
            });
            if better {
                mode = Some((value, count, index));
            }
        }

        let (value, _, _) = mode.ok_or(FeaturizerError::NoSupportedHistogramValues)?;
        Ok(ModeAnnotation {
            value: value.clone(),
        })
    }
}

/// Publishes a [`ModeAnnotation`] for one column. Must follow a histogram and an order
/// estimator for the same column.
pub type ModeEstimator<T> = TrainingOnlyEstimator<ModePolicy<T>>;

impl<T> TrainingOnlyEstimator<ModePolicy<T>>
where
    T: Nullable,
    T::Value: Ord + 'static,
{
    pub fn new(bus: AnnotationBus, column: usize) -> Result<Self, FeaturizerError> {
        Self::with_policy(bus, column, ModePolicy::default(), false, None)
    }
}
