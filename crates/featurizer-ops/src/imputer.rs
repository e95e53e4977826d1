//! Imputers: chains that learn a replacement for null values.
//!
//! # Overview
//!
//! Every imputer is a [`Chain`] whose leading stages publish a statistic for the column and
//! whose last stage, an [`ImputerEstimator`], reads that statistic when the transformer is
//! created:
//!
//! | imputer | stages | output |
//! |---|---|---|
//! | [`mean_imputer`] | statistical metrics, mean | `f64` |
//! | [`min_max_imputer`] | min/max, min or max | input value type |
//! | [`mode_imputer`] | histogram, order, mode, mode | input value type |
//! | [`median_imputer`] | median, median | `f64` |
//!
//! # Examples
//!
//! ```
//! use featurizer_core::{AnnotationBus, FeaturizerError, TransformerEstimator, driver};
//! use featurizer_ops::imputer;
//!
//! let bus = AnnotationBus::new(1)?;
//! let mut estimator = imputer::mean_imputer::<Option<i32>>(bus, 0)?;
//! driver::train(
//!     &mut estimator,
//!     &[vec![Some(10), Some(20), None], vec![Some(30), Some(40), None]],
//! )?;
//!
//! let mut transformer = estimator.create_transformer()?;
//! let outputs = driver::transform(&mut transformer, &[None, Some(1), Some(2), Some(3), None])?;
//! assert_eq!(outputs, vec![25.0, 1.0, 2.0, 3.0, 25.0]);
//! # Ok::<(), FeaturizerError>(())
//! ```

use std::{fmt, marker::PhantomData};

use featurizer_components::{
    HistogramEstimator, ImputerTransformer, MedianAnnotation, MedianEstimator, MedianPolicy,
    MinMaxAnnotation, MinMaxEstimator, MinMaxPolicy, ModeAnnotation, ModeEstimator, ModePolicy,
    OrderEstimator, StatisticalMetricsAnnotation, StatisticalMetricsEstimator,
    StatisticalMetricsPolicy, TrainingPolicy,
};
use featurizer_core::{
    AnnotationBus, ArchiveLoad, ArchiveReader, Chain, ChainBuilder, Estimator, EstimatorCore,
    FeaturizerError, FitResult, ImputeInto, Nullable, TransformerEstimator,
};
use featurizer_stats::Numeric;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

/// Where an [`ImputerEstimator`] finds the value it substitutes for nulls.
pub trait ImputedValue {
    /// Name of the estimator stage.
    const NAME: &'static str;

    type Input: Nullable;
    type Output: Clone + Serialize + DeserializeOwned + 'static;

    /// Reads the replacement from annotations published earlier for `column`.
    fn imputed_value(
        &self,
        bus: &AnnotationBus,
        column: usize,
    ) -> Result<Self::Output, FeaturizerError>;
}

/// Inference-only stage that turns an annotation into an [`ImputerTransformer`].
pub struct ImputerEstimator<S> {
    core: EstimatorCore,
    source: S,
    column: usize,
    created_transformer: bool,
}

impl<S> fmt::Debug for ImputerEstimator<S>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImputerEstimator")
            .field("core", &self.core)
            .field("source", &self.source)
            .field("column", &self.column)
            .finish_non_exhaustive()
    }
}

impl<S> ImputerEstimator<S>
where
    S: ImputedValue,
{
    pub fn new(bus: AnnotationBus, column: usize, source: S) -> Result<Self, FeaturizerError> {
        bus.check_column(column)?;
        Ok(Self {
            core: EstimatorCore::new(S::NAME, bus)?,
            source,
            column,
            created_transformer: false,
        })
    }

    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }
}

impl<S> Estimator for ImputerEstimator<S>
where
    S: ImputedValue,
{
    type Input = S::Input;

    fn core(&self) -> &EstimatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EstimatorCore {
        &mut self.core
    }

    fn begin_training_impl(&mut self) -> Result<bool, FeaturizerError> {
        Ok(false)
    }

    fn fit_impl(&mut self, _items: &[S::Input]) -> Result<FitResult, FeaturizerError> {
        Ok(FitResult::Complete)
    }

    fn complete_training_impl(&mut self) -> Result<(), FeaturizerError> {
        Ok(())
    }
}

impl<S> TransformerEstimator for ImputerEstimator<S>
where
    S: ImputedValue,
    S::Input: 'static,
    <S::Input as Nullable>::Value: ImputeInto<S::Output>,
{
    type Transformer = ImputerTransformer<S::Input, S::Output>;

    fn create_transformer_impl(&mut self) -> Result<Self::Transformer, FeaturizerError> {
        let value = self.source.imputed_value(self.core.bus(), self.column)?;
        debug!(estimator = S::NAME, column = self.column, "imputed value resolved");
        Ok(ImputerTransformer::new(value))
    }

    fn has_created_transformer(&self) -> bool {
        self.created_transformer
    }

    fn mark_transformer_created(&mut self) {
        self.created_transformer = true;
    }

    fn load_transformer(
        &self,
        reader: &mut ArchiveReader<'_>,
    ) -> Result<Self::Transformer, FeaturizerError> {
        ImputerTransformer::load(reader)
    }
}

/// Substitutes the average of the training values.
pub struct MeanValue<T>(PhantomData<fn(&T)>);

/// Substitutes the smallest or the largest training value.
pub struct MinMaxValue<T> {
    use_min: bool,
    _marker: PhantomData<fn(&T)>,
}

/// Substitutes the most frequent training value.
pub struct ModeValue<T>(PhantomData<fn(&T)>);

/// Substitutes the median of the training values.
pub struct MedianValue<T>(PhantomData<fn(&T)>);

impl<T> fmt::Debug for MeanValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MeanValue")
    }
}

impl<T> fmt::Debug for MinMaxValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinMaxValue")
            .field("use_min", &self.use_min)
            .finish()
    }
}

impl<T> fmt::Debug for ModeValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ModeValue")
    }
}

impl<T> fmt::Debug for MedianValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MedianValue")
    }
}

impl<T> ImputedValue for MeanValue<T>
where
    T: Nullable,
    T::Value: Numeric,
{
    const NAME: &'static str = "MeanImputerEstimator";

    type Input = T;
    type Output = f64;

    fn imputed_value(&self, bus: &AnnotationBus, column: usize) -> Result<f64, FeaturizerError> {
        let metrics = bus.lookup::<StatisticalMetricsAnnotation<T::Value>>(
            column,
            StatisticalMetricsPolicy::<T>::NAME,
        )?;
        if metrics.count == 0 {
            return Err(FeaturizerError::MeanWithoutInput);
        }
        if metrics.average.is_nan() {
            return Err(FeaturizerError::NullImputedValue);
        }
        Ok(metrics.average)
    }
}

impl<T> ImputedValue for MinMaxValue<T>
where
    T: Nullable,
    T::Value: PartialOrd + Serialize + DeserializeOwned + 'static,
{
    const NAME: &'static str = "MinMaxImputerEstimator";

    type Input = T;
    type Output = T::Value;

    fn imputed_value(
        &self,
        bus: &AnnotationBus,
        column: usize,
    ) -> Result<T::Value, FeaturizerError> {
        let bounds = bus.lookup::<MinMaxAnnotation<T::Value>>(column, MinMaxPolicy::<T>::NAME)?;
        Ok(if self.use_min {
            bounds.min.clone()
        } else {
            bounds.max.clone()
        })
    }
}

impl<T> ImputedValue for ModeValue<T>
where
    T: Nullable,
    T::Value: Ord + Serialize + DeserializeOwned + 'static,
{
    const NAME: &'static str = "ModeImputerEstimator";

    type Input = T;
    type Output = T::Value;

    fn imputed_value(
        &self,
        bus: &AnnotationBus,
        column: usize,
    ) -> Result<T::Value, FeaturizerError> {
        let mode = bus.lookup::<ModeAnnotation<T::Value>>(column, ModePolicy::<T>::NAME)?;
        Ok(mode.value.clone())
    }
}

impl<T> ImputedValue for MedianValue<T>
where
    T: Nullable,
    T::Value: Numeric,
{
    const NAME: &'static str = "MedianImputerEstimator";

    type Input = T;
    type Output = f64;

    fn imputed_value(&self, bus: &AnnotationBus, column: usize) -> Result<f64, FeaturizerError> {
        let median = bus.lookup::<MedianAnnotation>(column, MedianPolicy::<T>::NAME)?;
        if median.median.is_nan() {
            return Err(FeaturizerError::NullImputedValue);
        }
        Ok(median.median)
    }
}

/// Replaces nulls with the mean of the training values.
pub fn mean_imputer<T>(
    bus: AnnotationBus,
    column: usize,
) -> Result<Chain<T, f64>, FeaturizerError>
where
    T: Nullable + 'static,
    T::Value: Numeric + ImputeInto<f64>,
{
    ChainBuilder::new("MeanImputer", bus.clone())
        .then_training(StatisticalMetricsEstimator::<T>::new(bus.clone(), column)?)
        .then(ImputerEstimator::new(bus, column, MeanValue(PhantomData))?)
        .build()
}

/// Replaces nulls with the smallest (`use_min`) or largest training value.
pub fn min_max_imputer<T>(
    bus: AnnotationBus,
    column: usize,
    use_min: bool,
) -> Result<Chain<T, T::Value>, FeaturizerError>
where
    T: Nullable + 'static,
    T::Value: PartialOrd + Serialize + DeserializeOwned + 'static,
{
    let source = MinMaxValue {
        use_min,
        _marker: PhantomData,
    };
    ChainBuilder::new("MinMaxImputer", bus.clone())
        .then_training(MinMaxEstimator::<T>::new(bus.clone(), column)?)
        .then(ImputerEstimator::new(bus, column, source)?)
        .build()
}

/// Replaces nulls with the most frequent training value.
pub fn mode_imputer<T>(
    bus: AnnotationBus,
    column: usize,
) -> Result<Chain<T, T::Value>, FeaturizerError>
where
    T: Nullable + 'static,
    T::Value: Ord + Serialize + DeserializeOwned + 'static,
{
    ChainBuilder::new("ModeImputer", bus.clone())
        .then_training(HistogramEstimator::<T>::new(bus.clone(), column)?)
        .then_training(OrderEstimator::<T>::new(bus.clone(), column)?)
        .then_training(ModeEstimator::<T>::new(bus.clone(), column)?)
        .then(ImputerEstimator::new(bus, column, ModeValue(PhantomData))?)
        .build()
}

/// Replaces nulls with the median of the training values.
///
/// With an even number of values, `interpolate` averages the two middle values instead of
/// taking the lower one.
pub fn median_imputer<T>(
    bus: AnnotationBus,
    column: usize,
    interpolate: bool,
) -> Result<Chain<T, f64>, FeaturizerError>
where
    T: Nullable + 'static,
    T::Value: Numeric + ImputeInto<f64>,
{
    ChainBuilder::new("MedianImputer", bus.clone())
        .then_training(MedianEstimator::<T>::new(bus.clone(), column, interpolate)?)
        .then(ImputerEstimator::new(bus, column, MedianValue(PhantomData))?)
        .build()
}

#[cfg(test)]
mod tests {
    use featurizer_core::{ArchiveWriter, Transformer, driver};

    use super::*;

    fn fit_and_transform<O>(
        mut estimator: Chain<Option<i32>, O>,
        batches: &[Vec<Option<i32>>],
        inputs: &[Option<i32>],
    ) -> Result<Vec<O>, FeaturizerError>
    where
        O: 'static,
    {
        driver::train(&mut estimator, batches)?;
        let mut transformer = estimator.create_transformer()?;
        driver::transform(&mut transformer, inputs)
    }

    fn training_data() -> Vec<Vec<Option<i32>>> {
        vec![
            vec![Some(10), Some(20), None],
            vec![Some(30), Some(40), None],
        ]
    }

    #[test]
    fn test_mean_imputer() {
        let bus = AnnotationBus::new(1).unwrap();
        let outputs = fit_and_transform(
            mean_imputer(bus, 0).unwrap(),
            &training_data(),
            &[None, Some(1), Some(2), Some(3), None],
        )
        .unwrap();
        assert_eq!(outputs, vec![25.0, 1.0, 2.0, 3.0, 25.0]);
    }

    #[test]
    fn test_min_max_imputer() {
        let inputs = [None, Some(15)];
        let bus = AnnotationBus::new(1).unwrap();
        let outputs =
            fit_and_transform(min_max_imputer(bus, 0, true).unwrap(), &training_data(), &inputs)
                .unwrap();
        assert_eq!(outputs, vec![10, 15]);

        let bus = AnnotationBus::new(1).unwrap();
        let outputs =
            fit_and_transform(min_max_imputer(bus, 0, false).unwrap(), &training_data(), &inputs)
                .unwrap();
        assert_eq!(outputs, vec![40, 15]);
    }

    #[test]
    fn test_mode_imputer() {
        let bus = AnnotationBus::new(1).unwrap();
        let batches = vec![vec![Some(3), Some(7), None, Some(7)], vec![Some(3), None]];
        let outputs =
            fit_and_transform(mode_imputer(bus, 0).unwrap(), &batches, &[None, Some(1)]).unwrap();
        assert_eq!(outputs, vec![3, 1]);
    }

    #[test]
    fn test_median_imputer() {
        let bus = AnnotationBus::new(1).unwrap();
        let outputs = fit_and_transform(
            median_imputer(bus, 0, true).unwrap(),
            &training_data(),
            &[None, Some(5)],
        )
        .unwrap();
        assert_eq!(outputs, vec![25.0, 5.0]);

        let bus = AnnotationBus::new(1).unwrap();
        let outputs = fit_and_transform(
            median_imputer(bus, 0, false).unwrap(),
            &training_data(),
            &[None],
        )
        .unwrap();
        assert_eq!(outputs, vec![20.0]);
    }

    #[test]
    fn test_mode_imputer_strings() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = mode_imputer::<Option<String>>(bus, 0).unwrap();
        let batch = vec![Some("x".to_owned()), Some("y".to_owned()), Some("y".to_owned())];
        driver::train(&mut estimator, &[batch]).unwrap();
        let mut transformer = estimator.create_transformer().unwrap();
        assert_eq!(transformer.execute_single(&None).unwrap(), "y");
    }

    #[test]
    fn test_min_max_imputer_strings() {
        let training = vec![
            Some("10".to_owned()),
            Some("20".to_owned()),
            None,
            Some("30".to_owned()),
            None,
        ];
        let inputs = [
            None,
            Some("1".to_owned()),
            Some("2".to_owned()),
            Some("3".to_owned()),
            None,
        ];
        for (use_min, imputed) in [(true, "10"), (false, "30")] {
            let bus = AnnotationBus::new(1).unwrap();
            let mut estimator = min_max_imputer::<Option<String>>(bus, 0, use_min).unwrap();
            driver::train(&mut estimator, &[training.clone()]).unwrap();
            let mut transformer = estimator.create_transformer().unwrap();
            assert_eq!(
                driver::transform(&mut transformer, &inputs).unwrap(),
                vec![imputed, "1", "2", "3", imputed]
            );
        }
    }

    #[test]
    fn test_only_nulls() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = mean_imputer::<Option<i32>>(bus, 0).unwrap();
        let err = driver::train(&mut estimator, &[vec![None, None]]).unwrap_err();
        assert!(matches!(err, FeaturizerError::NoValuesProvided));

        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = mode_imputer::<Option<i32>>(bus, 0).unwrap();
        let err = driver::train(&mut estimator, &[vec![None, None]]).unwrap_err();
        assert!(matches!(err, FeaturizerError::NoSupportedHistogramValues));
    }

    #[test]
    fn test_column_out_of_range() {
        let bus = AnnotationBus::new(1).unwrap();
        let err = mean_imputer::<Option<i32>>(bus, 1).unwrap_err();
        assert!(matches!(err, FeaturizerError::InvalidArgument { name: "column", .. }));
    }

    #[test]
    fn test_save_and_load() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = mean_imputer::<Option<i32>>(bus, 0).unwrap();
        driver::train(&mut estimator, &training_data()).unwrap();
        let transformer = estimator.create_transformer().unwrap();

        let mut writer = ArchiveWriter::new();
        transformer.save(&mut writer).unwrap();
        let bytes = writer.into_bytes();

        let prototype = mean_imputer::<Option<i32>>(AnnotationBus::new(1).unwrap(), 0).unwrap();
        let mut reader = ArchiveReader::new(&bytes);
        let mut loaded = prototype.load_transformer(&mut reader).unwrap();
        reader.finish().unwrap();
        assert_eq!(loaded.transform_all(&[None, Some(4)]).unwrap(), vec![25.0, 4.0]);
    }
}
