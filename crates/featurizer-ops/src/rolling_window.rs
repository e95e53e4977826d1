//! Rolling-window statistics.
//!
//! # Overview
//!
//! A rolling-window transformer keeps the most recent `horizon + max_window_size` inputs.
//! For every input it emits `horizon` values, one per lag from `horizon` down to `1`. The
//! value for lag `n` is the window calculation applied to the (at most `max_window_size`)
//! inputs that precede the input `n` steps back. A lag with fewer than `min_window_size`
//! such inputs yields `NaN`.
//!
//! With `horizon = 1` and `max_window_size = 1`, the output is simply the previous input:
//!
//! ```
//! use featurizer_core::{FeaturizerError, Transformer};
//! use featurizer_ops::rolling_window::{
//!     SimpleCalculation, SimpleRollingWindowTransformer, WindowSpec,
//! };
//!
//! let spec = WindowSpec::new(SimpleCalculation::Max, 1, 1, 1)?;
//! let mut transformer = SimpleRollingWindowTransformer::<i32>::new(spec)?;
//! let outputs = transformer.transform_all(&[1, 2, 3])?;
//! assert!(outputs[0][0].is_nan());
//! assert_eq!(outputs[1], vec![1.0]);
//! assert_eq!(outputs[2], vec![2.0]);
//! # Ok::<(), FeaturizerError>(())
//! ```
//!
//! # Grained windows
//!
//! Rolling windows are normally applied per time series. [`grained_rolling_window`] wraps
//! the window estimator in a [`GrainEstimator`] keyed by `Vec<String>` and drops the grain
//! from the output with a trailing [`FilterDecoratorEstimator`]. Every grain must be seen
//! during training; executing an unseen grain fails with
//! [`FeaturizerError::GrainNotFound`].

use std::{collections::VecDeque, fmt, marker::PhantomData};

use featurizer_core::{
    AnnotationBus, ArchiveLoad, ArchiveReader, ArchiveWriter, Chain, ChainBuilder, Estimator,
    EstimatorCore, FeaturizerError, FilterDecoratorEstimator, FitResult, GrainEstimator, Pick,
    Transformer, TransformerEstimator,
};
use featurizer_stats::{Numeric, window};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A calculation applied to one window of history.
pub trait WindowCalculation: Copy + Eq + fmt::Debug + 'static {
    /// Name of the plain estimator.
    const ESTIMATOR_NAME: &'static str;
    /// Name of the grained chain.
    const GRAINED_ESTIMATOR_NAME: &'static str;

    /// Archive code of the calculation.
    fn code(self) -> u8;

    fn from_code(code: u8) -> Option<Self>;

    /// Returns `None` for an empty window.
    fn calculate(self, window: &[f64]) -> Option<f64>;
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
#[repr(u8)]
pub enum SimpleCalculation {
    Min = 1,
    Max = 2,
}

impl WindowCalculation for SimpleCalculation {
    const ESTIMATOR_NAME: &'static str = "SimpleRollingWindowEstimator";
    const GRAINED_ESTIMATOR_NAME: &'static str = "GrainedSimpleRollingWindowEstimator";

    fn code(self) -> u8 {
        self as u8
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Min),
            2 => Some(Self::Max),
            _ => None,
        }
    }

    fn calculate(self, values: &[f64]) -> Option<f64> {
        match self {
            Self::Min => window::min(values),
            Self::Max => window::max(values),
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
#[repr(u8)]
pub enum AnalyticalCalculation {
    Mean = 1,
}

impl WindowCalculation for AnalyticalCalculation {
    const ESTIMATOR_NAME: &'static str = "AnalyticalRollingWindowEstimator";
    const GRAINED_ESTIMATOR_NAME: &'static str = "GrainedAnalyticalRollingWindowEstimator";

    fn code(self) -> u8 {
        self as u8
    }

    fn from_code(code: u8) -> Option<Self> {
        (code == 1).then_some(Self::Mean)
    }

    fn calculate(self, values: &[f64]) -> Option<f64> {
        match self {
            Self::Mean => window::mean(values),
        }
    }
}

const fn default_min_window_size() -> u32 {
    1
}

/// Shape of a rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec<C> {
    pub calculation: C,
    pub horizon: u32,
    pub max_window_size: u32,
    #[serde(default = "default_min_window_size")]
    pub min_window_size: u32,
}

impl<C> WindowSpec<C> {
    /// # Errors
    ///
    /// Returns [`FeaturizerError::InvalidArgument`] naming the first size that is zero, or
    /// `min_window_size` if it exceeds `max_window_size`.
    pub fn new(
        calculation: C,
        horizon: u32,
        max_window_size: u32,
        min_window_size: u32,
    ) -> Result<Self, FeaturizerError> {
        let spec = Self {
            calculation,
            horizon,
            max_window_size,
            min_window_size,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), FeaturizerError> {
        let positive = |name: &'static str, value: u32| {
            if value == 0 {
                return Err(FeaturizerError::InvalidArgument {
                    name,
                    reason: "must be at least 1",
                });
            }
            Ok(())
        };
        positive("horizon", self.horizon)?;
        positive("max_window_size", self.max_window_size)?;
        positive("min_window_size", self.min_window_size)?;
        if self.min_window_size > self.max_window_size {
            return Err(FeaturizerError::InvalidArgument {
                name: "min_window_size",
                reason: "must not exceed max_window_size",
            });
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.horizon as usize + self.max_window_size as usize
    }
}

/// Emits `horizon` lagged window statistics for every input.
pub struct RollingWindowTransformer<T, C> {
    spec: WindowSpec<C>,
    history: VecDeque<f64>,
    _marker: PhantomData<fn(&T)>,
}

pub type SimpleRollingWindowTransformer<T> = RollingWindowTransformer<T, SimpleCalculation>;
pub type AnalyticalRollingWindowTransformer<T> =
    RollingWindowTransformer<T, AnalyticalCalculation>;

impl<T, C> RollingWindowTransformer<T, C>
where
    C: WindowCalculation,
{
    pub fn new(spec: WindowSpec<C>) -> Result<Self, FeaturizerError> {
        spec.validate()?;
        Ok(Self {
            history: VecDeque::with_capacity(spec.capacity()),
            spec,
            _marker: PhantomData,
        })
    }

    #[must_use]
    pub fn spec(&self) -> &WindowSpec<C> {
        &self.spec
    }

    fn lagged_values(&mut self) -> Vec<f64> {
        let spec = self.spec;
        let history = self.history.make_contiguous();
        (0..spec.horizon)
            .map(|offset| {
                let lag = (spec.horizon - offset) as usize;
                let available = history.len().saturating_sub(lag);
                if available < spec.min_window_size as usize {
                    return f64::NAN;
                }
                let size = available.min(spec.max_window_size as usize);
                spec.calculation
                    .calculate(&history[available - size..available])
                    .unwrap_or(f64::NAN)
            })
            .collect()
    }
}

impl<T, C> fmt::Debug for RollingWindowTransformer<T, C>
where
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollingWindowTransformer")
            .field("spec", &self.spec)
            .field("history", &self.history)
            .finish()
    }
}

impl<T, C> Clone for RollingWindowTransformer<T, C>
where
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            history: self.history.clone(),
            _marker: PhantomData,
        }
    }
}

/// Transformers compare equal when their window shapes match; history is ignored.
impl<T, C> PartialEq for RollingWindowTransformer<T, C>
where
    C: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.spec == other.spec
    }
}

impl<T, C> Transformer for RollingWindowTransformer<T, C>
where
    T: Numeric,
    C: WindowCalculation,
{
    type Input = T;
    type Output = Vec<f64>;

    fn execute(
        &mut self,
        input: &T,
        callback: &mut dyn FnMut(Vec<f64>),
    ) -> Result<(), FeaturizerError> {
        if self.history.len() == self.spec.capacity() {
            self.history.pop_front();
        }
        self.history.push_back(input.to_f64());
        callback(self.lagged_values());
        Ok(())
    }

    /// Ends the current series. Nothing is emitted.
    fn flush(&mut self, _callback: &mut dyn FnMut(Vec<f64>)) -> Result<(), FeaturizerError> {
        self.history.clear();
        Ok(())
    }

    fn save(&self, writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
        writer.write_version()?;
        writer.write(&self.spec.calculation.code())?;
        writer.write(&self.spec.horizon)?;
        writer.write(&self.spec.max_window_size)?;
        writer.write(&self.spec.min_window_size)
    }
}

impl<T, C> ArchiveLoad for RollingWindowTransformer<T, C>
where
    C: WindowCalculation,
{
    fn load(reader: &mut ArchiveReader<'_>) -> Result<Self, FeaturizerError> {
        reader.read_version()?;
        let calculation =
            C::from_code(reader.read()?).ok_or(FeaturizerError::InvalidArgument {
                name: "calculation",
                reason: "unknown window calculation",
            })?;
        let spec = WindowSpec::new(calculation, reader.read()?, reader.read()?, reader.read()?)?;
        Self::new(spec)
    }
}

/// Inference-only estimator producing a [`RollingWindowTransformer`].
pub struct RollingWindowEstimator<T, C> {
    core: EstimatorCore,
    spec: WindowSpec<C>,
    created_transformer: bool,
    _marker: PhantomData<fn(&T)>,
}

pub type SimpleRollingWindowEstimator<T> = RollingWindowEstimator<T, SimpleCalculation>;
pub type AnalyticalRollingWindowEstimator<T> = RollingWindowEstimator<T, AnalyticalCalculation>;

impl<T, C> fmt::Debug for RollingWindowEstimator<T, C>
where
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollingWindowEstimator")
            .field("core", &self.core)
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

impl<T, C> RollingWindowEstimator<T, C>
where
    C: WindowCalculation,
{
    pub fn new(bus: AnnotationBus, spec: WindowSpec<C>) -> Result<Self, FeaturizerError> {
        spec.validate()?;
        Ok(Self {
            core: EstimatorCore::new(C::ESTIMATOR_NAME, bus)?,
            spec,
            created_transformer: false,
            _marker: PhantomData,
        })
    }

    #[must_use]
    pub fn spec(&self) -> &WindowSpec<C> {
        &self.spec
    }
}

impl<T, C> Estimator for RollingWindowEstimator<T, C>
where
    C: WindowCalculation,
{
    type Input = T;

    fn core(&self) -> &EstimatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EstimatorCore {
        &mut self.core
    }

    fn begin_training_impl(&mut self) -> Result<bool, FeaturizerError> {
        Ok(false)
    }

    fn fit_impl(&mut self, _items: &[T]) -> Result<FitResult, FeaturizerError> {
        Ok(FitResult::Complete)
    }

    fn complete_training_impl(&mut self) -> Result<(), FeaturizerError> {
        Ok(())
    }
}

impl<T, C> TransformerEstimator for RollingWindowEstimator<T, C>
where
    T: Numeric,
    C: WindowCalculation,
{
    type Transformer = RollingWindowTransformer<T, C>;

    fn create_transformer_impl(&mut self) -> Result<Self::Transformer, FeaturizerError> {
        RollingWindowTransformer::new(self.spec)
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
        RollingWindowTransformer::load(reader)
    }
}

/// Grain key of grained rolling windows: the values of the columns identifying a series.
pub type Grain = Vec<String>;

/// Rolling window applied independently to every grain.
pub type GrainedRollingWindow<T> = Chain<(Grain, T), Vec<f64>>;

pub fn grained_rolling_window<T, C>(
    bus: AnnotationBus,
    spec: WindowSpec<C>,
) -> Result<GrainedRollingWindow<T>, FeaturizerError>
where
    T: Numeric,
    C: WindowCalculation,
{
    spec.validate()?;
    debug!(estimator = C::GRAINED_ESTIMATOR_NAME, ?spec, "building grained rolling window");
    let grains = GrainEstimator::new(
        "GrainEstimator",
        bus.clone(),
        move |bus| RollingWindowEstimator::<T, C>::new(bus, spec),
        None,
    )?;
    ChainBuilder::new(C::GRAINED_ESTIMATOR_NAME, bus.clone())
        .then(grains)
        .then(FilterDecoratorEstimator::<(Grain, Vec<f64>), Pick<1>>::new(bus)?)
        .build()
}

#[cfg(test)]
mod tests {
    use featurizer_core::driver;
    use proptest::prelude::*;

    use super::*;

    fn grain(name: &str) -> Grain {
        vec![name.to_owned()]
    }

    fn assert_lagged(actual: &[f64], expected: &[Option<f64>]) {
        assert_eq!(actual.len(), expected.len());
        for (actual, expected) in actual.iter().zip(expected) {
            match expected {
                Some(expected) => {
                    assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
                }
                None => assert!(actual.is_nan(), "{actual} is not NaN"),
            }
        }
    }

    #[test]
    fn test_invalid_spec() {
        for (horizon, max, min, name) in [
            (0, 1, 1, "horizon"),
            (1, 0, 1, "max_window_size"),
            (1, 1, 0, "min_window_size"),
            (1, 2, 3, "min_window_size"),
        ] {
            let err = WindowSpec::new(SimpleCalculation::Min, horizon, max, min).unwrap_err();
            assert!(
                matches!(err, FeaturizerError::InvalidArgument { name: n, .. } if n == name),
                "{err}"
            );
        }
    }

    #[test]
    fn test_max_window() {
        let spec = WindowSpec::new(SimpleCalculation::Max, 2, 2, 1).unwrap();
        let mut transformer = SimpleRollingWindowTransformer::<i32>::new(spec).unwrap();
        let outputs = transformer.transform_all(&[5, 1, 3, 2]).unwrap();
        assert_lagged(&outputs[0], &[None, None]);
        assert_lagged(&outputs[1], &[None, Some(5.0)]);
        assert_lagged(&outputs[2], &[Some(5.0), Some(5.0)]);
        assert_lagged(&outputs[3], &[Some(5.0), Some(3.0)]);
    }

    #[test]
    fn test_min_window_size() {
        let spec = WindowSpec::new(SimpleCalculation::Min, 1, 3, 2).unwrap();
        let mut transformer = SimpleRollingWindowTransformer::<u8>::new(spec).unwrap();
        let outputs = transformer.transform_all(&[4, 6, 2, 8, 9]).unwrap();
        assert_lagged(&outputs[0], &[None]);
        assert_lagged(&outputs[1], &[None]);
        assert_lagged(&outputs[2], &[Some(4.0)]);
        assert_lagged(&outputs[3], &[Some(2.0)]);
        assert_lagged(&outputs[4], &[Some(2.0)]);
    }

    #[test]
    fn test_mean_window() {
        let spec = WindowSpec::new(AnalyticalCalculation::Mean, 1, 2, 1).unwrap();
        let mut transformer = AnalyticalRollingWindowTransformer::<f64>::new(spec).unwrap();
        let outputs = transformer.transform_all(&[1.0, 2.0, 4.0, 8.0]).unwrap();
        assert_lagged(&outputs[0], &[None]);
        assert_lagged(&outputs[1], &[Some(1.0)]);
        assert_lagged(&outputs[2], &[Some(1.5)]);
        assert_lagged(&outputs[3], &[Some(3.0)]);
    }

    #[test]
    fn test_flush_resets_history() {
        let spec = WindowSpec::new(SimpleCalculation::Max, 1, 1, 1).unwrap();
        let mut transformer = SimpleRollingWindowTransformer::<i32>::new(spec).unwrap();
        transformer.transform_all(&[1, 2]).unwrap();
        assert!(transformer.flush_all().unwrap().is_empty());
        let outputs = transformer.transform_all(&[3]).unwrap();
        assert_lagged(&outputs[0], &[None]);
    }

    #[test]
    fn test_save_and_load() {
        let spec = WindowSpec::new(SimpleCalculation::Max, 3, 4, 2).unwrap();
        let transformer = SimpleRollingWindowTransformer::<i64>::new(spec).unwrap();
        let mut writer = ArchiveWriter::new();
        transformer.save(&mut writer).unwrap();

        let bytes = writer.into_bytes();
        let mut reader = ArchiveReader::new(&bytes);
        let loaded = SimpleRollingWindowTransformer::<i64>::load(&mut reader).unwrap();
        reader.finish().unwrap();
        assert_eq!(loaded, transformer);

        let mut reader = ArchiveReader::new(&bytes);
        assert!(matches!(
            AnalyticalRollingWindowTransformer::<i64>::load(&mut reader),
            Err(FeaturizerError::InvalidArgument { name: "calculation", .. })
        ));
    }

    #[test]
    fn test_calculation_names() {
        assert_eq!(SimpleCalculation::Max.to_string(), "Max");
        assert_eq!(
            "Mean".parse::<AnalyticalCalculation>().unwrap(),
            AnalyticalCalculation::Mean
        );
    }

    #[test]
    fn test_grained() {
        let bus = AnnotationBus::new(1).unwrap();
        let spec = WindowSpec::new(SimpleCalculation::Min, 1, 2, 1).unwrap();
        let mut estimator = grained_rolling_window::<f64, _>(bus, spec).unwrap();
        assert_eq!(estimator.name(), "GrainedSimpleRollingWindowEstimator");
        driver::train(
            &mut estimator,
            &[vec![(grain("a"), 0.0), (grain("b"), 0.0)]],
        )
        .unwrap();

        let mut transformer = estimator.create_transformer().unwrap();
        let outputs = driver::transform(
            &mut transformer,
            &[
                (grain("a"), 5.0),
                (grain("b"), 9.0),
                (grain("a"), 3.0),
                (grain("b"), 7.0),
                (grain("a"), 4.0),
            ],
        )
        .unwrap();
        assert_lagged(&outputs[0], &[None]);
        assert_lagged(&outputs[1], &[None]);
        assert_lagged(&outputs[2], &[Some(5.0)]);
        assert_lagged(&outputs[3], &[Some(9.0)]);
        assert_lagged(&outputs[4], &[Some(3.0)]);

        assert!(matches!(
            transformer.execute_single(&(grain("c"), 1.0)),
            Err(FeaturizerError::GrainNotFound)
        ));
    }

    #[test]
    fn test_grained_save_and_load() {
        let spec = WindowSpec::new(AnalyticalCalculation::Mean, 2, 2, 1).unwrap();
        let mut estimator =
            grained_rolling_window::<i32, _>(AnnotationBus::new(1).unwrap(), spec).unwrap();
        driver::train(&mut estimator, &[vec![(grain("x"), 1), (grain("y"), 2)]]).unwrap();
        let transformer = estimator.create_transformer().unwrap();

        let mut writer = ArchiveWriter::new();
        transformer.save(&mut writer).unwrap();
        let bytes = writer.into_bytes();

        let prototype =
            grained_rolling_window::<i32, _>(AnnotationBus::new(1).unwrap(), spec).unwrap();
        let mut reader = ArchiveReader::new(&bytes);
        let mut loaded = prototype.load_transformer(&mut reader).unwrap();
        reader.finish().unwrap();

        let outputs = loaded
            .transform_all(&[(grain("y"), 4), (grain("y"), 6), (grain("y"), 8)])
            .unwrap();
        assert_lagged(&outputs[2], &[Some(4.0), Some(5.0)]);
    }

    proptest! {
        #[test]
        fn prop_single_item_window_lags_input(
            horizon in 1_u32..6,
            values in proptest::collection::vec(-1000_i32..1000, 0..40),
        ) {
            let spec = WindowSpec::new(SimpleCalculation::Max, horizon, 1, 1).unwrap();
            let mut transformer = SimpleRollingWindowTransformer::<i32>::new(spec).unwrap();
            let outputs = transformer.transform_all(&values).unwrap();

            prop_assert_eq!(outputs.len(), values.len());
            for (index, output) in outputs.iter().enumerate() {
                prop_assert_eq!(output.len(), horizon as usize);
                for (offset, value) in output.iter().enumerate() {
                    let lag = horizon as usize - offset;
                    match index.checked_sub(lag) {
                        Some(source) => prop_assert_eq!(*value, f64::from(values[source])),
                        None => prop_assert!(value.is_nan()),
                    }
                }
            }
        }

        #[test]
        fn prop_grains_are_isolated(
            items in proptest::collection::vec((0_usize..3, -50_i32..50), 1..40),
        ) {
            let names = ["a", "b", "c"];
            let spec = WindowSpec::new(AnalyticalCalculation::Mean, 2, 3, 1).unwrap();
            let mut estimator =
                grained_rolling_window::<i32, _>(AnnotationBus::new(1).unwrap(), spec).unwrap();
            let training = names.iter().map(|name| (grain(name), 0)).collect::<Vec<_>>();
            driver::train(&mut estimator, &[training]).unwrap();
            let mut grained = estimator.create_transformer().unwrap();

            let inputs = items
                .iter()
                .map(|(key, value)| (grain(names[*key]), *value))
                .collect::<Vec<_>>();
            let outputs = grained.transform_all(&inputs).unwrap();

            for (key, name) in names.iter().enumerate() {
                let series = items
                    .iter()
                    .filter(|(k, _)| *k == key)
                    .map(|(_, value)| *value)
                    .collect::<Vec<_>>();
                let mut plain = AnalyticalRollingWindowTransformer::<i32>::new(spec).unwrap();
                let expected = plain.transform_all(&series).unwrap();
                let actual = inputs
                    .iter()
                    .zip(&outputs)
                    .filter(|((g, _), _)| g[0] == *name)
                    .map(|(_, output)| output.clone())
                    .collect::<Vec<_>>();

                prop_assert_eq!(actual.len(), expected.len());
                for (actual, expected) in actual.iter().zip(&expected) {
                    for (a, e) in actual.iter().zip(expected) {
                        prop_assert!((a.is_nan() && e.is_nan()) || (a - e).abs() < 1e-9);
                    }
                }
            }
        }
    }
}
