use std::marker::PhantomData;

use featurizer_core::{AnnotationBus, FeaturizerError, Nullable};

use crate::{TrainingOnlyEstimator, TrainingPolicy};

/// Smallest and largest non-null values of a column.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxAnnotation<V> {
    pub min: V,
    pub max: V,
}

/// Tracks the extremes by ordering alone, so any `PartialOrd` value works, strings included.
#[derive(Debug)]
pub struct MinMaxPolicy<T>
where
    T: Nullable,
{
    bounds: Option<(T::Value, T::Value)>,
    _marker: PhantomData<fn(&T)>,
}

impl<T> Default for MinMaxPolicy<T>
where
    T: Nullable,
{
    fn default() -> Self {
        Self {
            bounds: None,
            _marker: PhantomData,
        }
    }
}

impl<T> TrainingPolicy for MinMaxPolicy<T>
where
    T: Nullable,
    T::Value: PartialOrd + Clone + 'static,
{
    const NAME: &'static str = "MinMaxEstimator";

    type Input = T;
    type Annotation = MinMaxAnnotation<T::Value>;

    fn fit(&mut self, item: &T) -> Result<(), FeaturizerError> {
        let Some(value) = item.nullable_value() else {
            return Ok(());
        };
        match &mut self.bounds {
            Some((min, max)) => {
                if value < *min {
                    *min = value;
                } else if value > *max {
                    *max = value;
                }
            }
            None => self.bounds = Some((value.clone(), value)),
        }
        Ok(())
    }

    fn complete_training(
        &mut self,
        _bus: &AnnotationBus,
        _column: usize,
    ) -> Result<Self::Annotation, FeaturizerError> {
        let (min, max) = self.bounds.take().ok_or(FeaturizerError::NoValuesProvided)?;
        Ok(MinMaxAnnotation { min, max })
    }
}

/// Publishes a [`MinMaxAnnotation`] for one column.
pub type MinMaxEstimator<T> = TrainingOnlyEstimator<MinMaxPolicy<T>>;

impl<T> TrainingOnlyEstimator<MinMaxPolicy<T>>
where
    T: Nullable,
    T::Value: PartialOrd + Clone + 'static,
{
    pub fn new(bus: AnnotationBus, column: usize) -> Result<Self, FeaturizerError> {
        Self::with_policy(bus, column, MinMaxPolicy::default(), true, None)
    }
}

#[cfg(test)]
mod tests {
    use featurizer_core::{Estimator, driver};

    use super::*;

    #[test]
    fn test_numbers() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = MinMaxEstimator::<Option<i32>>::new(bus, 0).unwrap();
        driver::train(&mut estimator, &[vec![Some(20), None, Some(-3)], vec![Some(7)]]).unwrap();
        assert_eq!(
            *estimator.annotation().unwrap(),
            MinMaxAnnotation { min: -3, max: 20 }
        );
    }

    #[test]
    fn test_strings_order_lexically() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = MinMaxEstimator::<Option<String>>::new(bus, 0).unwrap();
        let batch = ["10", "20", "3"].map(|s| Some(s.to_owned())).to_vec();
        driver::train(&mut estimator, &[batch]).unwrap();
        let annotation = estimator.annotation().unwrap();
        assert_eq!(annotation.min, "10");
        assert_eq!(annotation.max, "3");
    }

    #[test]
    fn test_no_values() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = MinMaxEstimator::<f64>::new(bus, 0).unwrap();
        estimator.begin_training().unwrap();
        estimator.fit(&[f64::NAN]).unwrap();
        estimator.on_data_completed().unwrap();
        assert!(matches!(
            estimator.complete_training(),
            Err(FeaturizerError::NoValuesProvided)
        ));
    }
}
