use std::{collections::BTreeMap, marker::PhantomData};

use featurizer_core::{AnnotationBus, FeaturizerError, Nullable};

use crate::{TrainingOnlyEstimator, TrainingPolicy};

/// Position at which each distinct non-null value was first seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAnnotation<V> {
    pub first_seen: BTreeMap<V, u32>,
}

#[derive(Debug)]
pub struct OrderPolicy<T>
where
    T: Nullable,
{
    first_seen: BTreeMap<T::Value, u32>,
    _marker: PhantomData<fn(&T)>,
}

impl<T> Default for OrderPolicy<T>
where
    T: Nullable,
{
    fn default() -> Self {
        Self {
            first_seen: BTreeMap::new(),
            _marker: PhantomData,
        }
    }
}

impl<T> TrainingPolicy for OrderPolicy<T>
where
    T: Nullable,
    T::Value: Ord + 'static,
{
    const NAME: &'static str = "OrderEstimator";

    type Input = T;
    type Annotation = OrderAnnotation<T::Value>;

    fn fit(&mut self, item: &T) -> Result<(), FeaturizerError> {
        if let Some(value) = item.nullable_value() {
            let next = u32::try_from(self.first_seen.len()).map_err(|_| {
                FeaturizerError::InvalidArgument {
                    name: "items",
                    reason: "too many distinct values",
                }
            })?;
            self.first_seen.entry(value).or_insert(next);
        }
        Ok(())
    }

    fn complete_training(
        &mut self,
        _bus: &AnnotationBus,
        _column: usize,
    ) -> Result<Self::Annotation, FeaturizerError> {
        Ok(OrderAnnotation {
            first_seen: std::mem::take(&mut self.first_seen),
        })
    }
}

/// Publishes an [`OrderAnnotation`] for one column.
pub type OrderEstimator<T> = TrainingOnlyEstimator<OrderPolicy<T>>;

impl<T> TrainingOnlyEstimator<OrderPolicy<T>>
where
    T: Nullable,
    T::Value: Ord + 'static,
{
    pub fn new(bus: AnnotationBus, column: usize) -> Result<Self, FeaturizerError> {
        Self::with_policy(bus, column, OrderPolicy::default(), true, None)
    }
}
