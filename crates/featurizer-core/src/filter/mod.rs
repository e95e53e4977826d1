//! Tuple-projection composition.
//!
//! # Overview
//!
//! A [`FilterEstimator`] lets an estimator written for a plain value train on one part of
//! a wider tuple. A [`Projection`] selects that part at compile time. The resulting
//! [`FilterTransformer`] runs the wrapped transformer on the projection and concatenates its
//! output onto the original tuple, so the row context is carried along. A tuple output
//! contributes each of its elements; any other output contributes one element.
//!
//! [`FilterDecoratorEstimator`] is the inference-only counterpart: it replaces each tuple
//! with its projection.
//!
//! # Design Decisions
//!
//! Wrapped transformers must not emit on flush. A flushed value has no input row to be
//! appended to, so [`FilterTransformer::flush`] fails with [`FeaturizerError::FilterFlush`]
//! instead of dropping it.
//!
//! # Examples
//!
//! ```
//! use featurizer_core::{FeaturizerError, FilterDecoratorTransformer, Pick2, Transformer};
//!
//! let mut transformer = FilterDecoratorTransformer::<(i32, i32, char), Pick2<2, 0>>::new();
//! assert_eq!(transformer.execute_single(&(1, 2, 'c'))?, ('c', 1));
//! # Ok::<(), FeaturizerError>(())
//! ```

use std::fmt;

use crate::{
    ArchiveLoad, ArchiveReader, ArchiveWriter, Estimator, EstimatorCore, FeaturizerError,
    FitResult, Transformer, TransformerEstimator,
};

use self::tuple::ProjectionMarker;

pub use self::{decorator::*, tuple::*};

mod decorator;
mod tuple;

/// Trains `E` on the projection `P` of each input tuple.
pub struct FilterEstimator<In, P, E> {
    core: EstimatorCore,
    estimator: E,
    created_transformer: bool,
    marker: ProjectionMarker<In, P>,
}

impl<In, P, E> fmt::Debug for FilterEstimator<In, P, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterEstimator")
            .field("core", &self.core)
            .field("projection", &self.marker)
            .finish_non_exhaustive()
    }
}

impl<In, P, E> FilterEstimator<In, P, E>
where
    P: Projection<In>,
    E: Estimator<Input = P::Output>,
{
    pub fn new(estimator: E) -> Result<Self, FeaturizerError> {
        let name = format!("Filter{}", estimator.name());
        let bus = estimator.bus().clone();
        Ok(Self {
            core: EstimatorCore::new(name, bus)?,
            estimator,
            created_transformer: false,
            marker: ProjectionMarker::new(),
        })
    }

    #[must_use]
    pub fn inner(&self) -> &E {
        &self.estimator
    }
}

impl<In, P, E> Estimator for FilterEstimator<In, P, E>
where
    P: Projection<In>,
    E: Estimator<Input = P::Output>,
{
    type Input = In;

    fn core(&self) -> &EstimatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EstimatorCore {
        &mut self.core
    }

    fn begin_training_impl(&mut self) -> Result<bool, FeaturizerError> {
        self.estimator.begin_training()?;
        Ok(!self.estimator.state().is_done_training())
    }

    fn fit_impl(&mut self, items: &[In]) -> Result<FitResult, FeaturizerError> {
        let projected = items
            .iter()
            .map(|item| P::project(item).into_owned())
            .collect::<Vec<_>>();
        self.estimator.fit(&projected)
    }

    fn on_data_completed_impl(&mut self) -> Result<bool, FeaturizerError> {
        self.estimator.on_data_completed()?;
        Ok(self.estimator.state().is_done_training())
    }

    fn complete_training_impl(&mut self) -> Result<(), FeaturizerError> {
        self.estimator.complete_training()
    }
}

impl<In, P, E> TransformerEstimator for FilterEstimator<In, P, E>
where
    In: Clone
        + TupleConcat<<<E::Transformer as Transformer>::Output as IntoTuple>::Tuple>
        + 'static,
    P: Projection<In> + 'static,
    E: TransformerEstimator<Input = P::Output>,
    <E::Transformer as Transformer>::Output: IntoTuple,
{
    type Transformer = FilterTransformer<In, P, E::Transformer>;

    fn create_transformer_impl(&mut self) -> Result<Self::Transformer, FeaturizerError> {
        Ok(FilterTransformer::new(self.estimator.create_transformer()?))
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
        Ok(FilterTransformer::new(self.estimator.load_transformer(reader)?))
    }
}

/// Runs `T` on the projection `P` of each input and concatenates its output onto the input.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTransformer<In, P, T> {
    transformer: T,
    marker: ProjectionMarker<In, P>,
}

impl<In, P, T> FilterTransformer<In, P, T> {
    #[must_use]
    pub fn new(transformer: T) -> Self {
        Self {
            transformer,
            marker: ProjectionMarker::new(),
        }
    }
}

impl<In, P, T> Transformer for FilterTransformer<In, P, T>
where
    In: Clone + TupleConcat<<T::Output as IntoTuple>::Tuple>,
    P: Projection<In>,
    T: Transformer<Input = P::Output>,
    T::Output: IntoTuple,
{
    type Input = In;
    type Output = <In as TupleConcat<<T::Output as IntoTuple>::Tuple>>::Output;

    fn execute(
        &mut self,
        input: &In,
        callback: &mut dyn FnMut(Self::Output),
    ) -> Result<(), FeaturizerError> {
        let projected = P::project(input);
        self.transformer
            .execute(&*projected, &mut |output| {
                callback(input.clone().concat(output.into_tuple()));
            })
    }

    fn flush(&mut self, _callback: &mut dyn FnMut(Self::Output)) -> Result<(), FeaturizerError> {
        let mut emitted = false;
        self.transformer.flush(&mut |_| emitted = true)?;
        if emitted {
            return Err(FeaturizerError::FilterFlush);
        }
        Ok(())
    }

    fn save(&self, writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
        self.transformer.save(writer)
    }
}

impl<In, P, T> ArchiveLoad for FilterTransformer<In, P, T>
where
    T: ArchiveLoad,
{
    fn load(reader: &mut ArchiveReader<'_>) -> Result<Self, FeaturizerError> {
        Ok(Self::new(T::load(reader)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AnnotationBus, ChainBuilder, TrainingState, driver,
        estimator::tests::{AddTransformer, SumEstimator},
    };

    /// Holds every input until flush.
    struct Hold(Vec<i64>);

    impl Transformer for Hold {
        type Input = i64;
        type Output = i64;

        fn execute(
            &mut self,
            input: &i64,
            _callback: &mut dyn FnMut(i64),
        ) -> Result<(), FeaturizerError> {
            self.0.push(*input);
            Ok(())
        }

        fn flush(&mut self, callback: &mut dyn FnMut(i64)) -> Result<(), FeaturizerError> {
            self.0.drain(..).for_each(callback);
            Ok(())
        }

        fn save(&self, _writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
            Ok(())
        }
    }

    /// Emits each input next to its negation.
    struct Mirror;

    impl Transformer for Mirror {
        type Input = i64;
        type Output = (i64, i64);

        fn execute(
            &mut self,
            input: &i64,
            callback: &mut dyn FnMut((i64, i64)),
        ) -> Result<(), FeaturizerError> {
            callback((*input, -*input));
            Ok(())
        }

        fn save(&self, _writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
            Ok(())
        }
    }

    #[test]
    fn test_tuple_output_is_flattened() {
        let mut transformer = FilterTransformer::<(char, i64), Pick<1>, _>::new(Mirror);
        assert_eq!(transformer.execute_single(&('a', 5)).unwrap(), ('a', 5, 5, -5));

        let mut transformer = FilterTransformer::<(u8, i64, bool), Pick<1>, _>::new(Mirror);
        assert_eq!(
            transformer.transform_all(&[(1, 2, true), (3, -4, false)]).unwrap(),
            vec![(1, 2, true, 2, -2), (3, -4, false, -4, 4)]
        );
    }

    #[test]
    fn test_trains_on_projection() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut filter =
            FilterEstimator::<(char, i64), Pick<1>, _>::new(SumEstimator::new(bus.clone(), None)).unwrap();
        assert_eq!(filter.name(), "FilterSumEstimator");

        driver::train(&mut filter, &[vec![('a', 1), ('b', 2)], vec![('c', 3)]]).unwrap();
        assert_eq!(filter.state(), TrainingState::Completed);
        assert_eq!(filter.inner().state(), TrainingState::Completed);
        assert_eq!(*bus.lookup::<i64>(0, "SumEstimator").unwrap(), 6);

        let mut transformer = filter.create_transformer().unwrap();
        assert_eq!(transformer.execute_single(&('z', 4)).unwrap(), ('z', 4, 10));
        assert!(transformer.flush_all().unwrap().is_empty());
    }

    #[test]
    fn test_inner_completion_finishes_filter() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut filter =
            FilterEstimator::<(i64, u8), Pick<0>, _>::new(SumEstimator::new(bus, Some(2))).unwrap();
        filter.begin_training().unwrap();
        assert_eq!(filter.fit(&[(1, 0), (2, 0), (3, 0)]).unwrap(), FitResult::Complete);
        assert_eq!(filter.state(), TrainingState::Finished);
    }

    #[test]
    fn test_flush_with_output_fails() {
        let mut transformer = FilterTransformer::<(u8, i64), Pick<1>, _>::new(Hold(vec![]));
        assert!(transformer.transform_all(&[(1, 5)]).unwrap().is_empty());
        let err = transformer.flush_all().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Transformers that rely on flush can't be wrapped by a filter"
        );
        // Nothing held back, nothing to lose.
        assert!(transformer.flush_all().unwrap().is_empty());
    }

    #[test]
    fn test_in_chain_with_save_and_load() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut chain = ChainBuilder::<(char, i64), _>::new("FilteredSum", bus.clone())
            .then(FilterEstimator::<_, Pick<1>, _>::new(SumEstimator::new(bus.clone(), None)).unwrap())
            .then(FilterDecoratorEstimator::<(char, i64, i64), Pick2<0, 2>>::new(bus).unwrap())
            .build()
            .unwrap();
        driver::train(&mut chain, &[vec![('a', 5), ('b', 7)]]).unwrap();
        let mut transformer = chain.create_transformer().unwrap();
        assert_eq!(transformer.execute_single(&('q', 1)).unwrap(), ('q', 13));

        let mut writer = ArchiveWriter::new();
        transformer.save(&mut writer).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = ArchiveReader::new(&bytes);
        let mut loaded = chain.load_transformer(&mut reader).unwrap();
        reader.finish().unwrap();
        assert_eq!(loaded.execute_single(&('r', 2)).unwrap(), ('r', 14));

        let mut reader = ArchiveReader::new(&bytes);
        let filter = FilterTransformer::<(char, i64), Pick<1>, AddTransformer>::load(&mut reader).unwrap();
        assert_eq!(filter, FilterTransformer::new(AddTransformer { delta: 12 }));
    }
}
