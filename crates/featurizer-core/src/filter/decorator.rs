use std::fmt;

use crate::{
    AnnotationBus, ArchiveLoad, ArchiveReader, ArchiveWriter, Estimator, EstimatorCore,
    FeaturizerError, FitResult, Transformer, TransformerEstimator,
};

use super::{Projection, tuple::ProjectionMarker};

/// An inference-only stage that replaces each input tuple with its projection.
///
/// Needs no training. Typically the last stage of a chain that carries extra context (such
/// as a grain) which the final output should drop.
pub struct FilterDecoratorEstimator<In, P> {
    core: EstimatorCore,
    created_transformer: bool,
    marker: ProjectionMarker<In, P>,
}

impl<In, P> fmt::Debug for FilterDecoratorEstimator<In, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterDecoratorEstimator")
            .field("core", &self.core)
            .field("projection", &self.marker)
            .finish_non_exhaustive()
    }
}

impl<In, P> FilterDecoratorEstimator<In, P>
where
    P: Projection<In>,
{
    pub fn new(bus: AnnotationBus) -> Result<Self, FeaturizerError> {
        Ok(Self {
            core: EstimatorCore::new("FilterDecoratorEstimator", bus)?,
            created_transformer: false,
            marker: ProjectionMarker::new(),
        })
    }
}

impl<In, P> Estimator for FilterDecoratorEstimator<In, P>
where
    P: Projection<In>,
{
    type Input = In;

    fn core(&self) -> &EstimatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EstimatorCore {
        &mut self.core
    }

    fn begin_training_impl(&mut self) -> Result<bool, FeaturizerError> {
        Ok(false)
    }

    fn fit_impl(&mut self, _items: &[In]) -> Result<FitResult, FeaturizerError> {
        Ok(FitResult::Complete)
    }

    fn complete_training_impl(&mut self) -> Result<(), FeaturizerError> {
        Ok(())
    }
}

impl<In, P> TransformerEstimator for FilterDecoratorEstimator<In, P>
where
    In: 'static,
    P: Projection<In> + 'static,
{
    type Transformer = FilterDecoratorTransformer<In, P>;

    fn create_transformer_impl(&mut self) -> Result<Self::Transformer, FeaturizerError> {
        Ok(FilterDecoratorTransformer::new())
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
        FilterDecoratorTransformer::load(reader)
    }
}

/// Emits the projection of every input.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDecoratorTransformer<In, P> {
    marker: ProjectionMarker<In, P>,
}

impl<In, P> FilterDecoratorTransformer<In, P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            marker: ProjectionMarker::new(),
        }
    }
}

impl<In, P> Default for FilterDecoratorTransformer<In, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In, P> Transformer for FilterDecoratorTransformer<In, P>
where
    P: Projection<In>,
{
    type Input = In;
    type Output = P::Output;

    fn execute(
        &mut self,
        input: &In,
        callback: &mut dyn FnMut(P::Output),
    ) -> Result<(), FeaturizerError> {
        callback(P::project(input).into_owned());
        Ok(())
    }

    fn save(&self, writer: &mut ArchiveWriter) -> Result<(), FeaturizerError> {
        writer.write_version()
    }
}

impl<In, P> ArchiveLoad for FilterDecoratorTransformer<In, P> {
    fn load(reader: &mut ArchiveReader<'_>) -> Result<Self, FeaturizerError> {
        reader.read_version()?;
        Ok(Self::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pick, Pick3, TrainingState};

    #[test]
    fn test_needs_no_training() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = FilterDecoratorEstimator::<(i32, char), Pick<1>>::new(bus).unwrap();
        assert_eq!(estimator.name(), "FilterDecoratorEstimator");
        estimator.begin_training().unwrap();
        assert_eq!(estimator.state(), TrainingState::Finished);
        estimator.complete_training().unwrap();

        let mut transformer = estimator.create_transformer().unwrap();
        assert_eq!(transformer.execute_single(&(10, 'a')).unwrap(), 'a');
    }

    #[test]
    fn test_multiple_indices() {
        let mut transformer = FilterDecoratorTransformer::<(i32, i32, char, char), Pick3<1, 3, 2>>::new();
        assert_eq!(
            transformer.execute_single(&(10, 20, 'a', 'b')).unwrap(),
            (20, 'b', 'a')
        );
    }

    #[test]
    fn test_save_and_load() {
        let transformer = FilterDecoratorTransformer::<(u8, f64), Pick<1>>::new();
        let mut writer = ArchiveWriter::new();
        transformer.save(&mut writer).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = ArchiveReader::new(&bytes);
        assert_eq!(FilterDecoratorTransformer::load(&mut reader).unwrap(), transformer);
        reader.finish().unwrap();

        let mut writer = ArchiveWriter::new();
        writer.write(&(1_u16, 1_u16)).unwrap();
        let bytes = writer.into_bytes();
        assert!(matches!(
            FilterDecoratorTransformer::<(u8, f64), Pick<1>>::load(&mut ArchiveReader::new(&bytes)),
            Err(FeaturizerError::UnsupportedArchiveVersion { major: 1, minor: 1 })
        ));
    }
}
