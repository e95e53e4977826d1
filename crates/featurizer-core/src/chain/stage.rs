use crate::{
    ArchiveReader, Estimator, FeaturizerError, FitResult, TrainingState, TransformerEstimator,
};

use super::transformer::{Batch, BoxedErasedTransformer, Erased};

/// Where a stage sits in its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum StagePosition {
    /// Followed by at least one more stage.
    Intermediate,
    /// The last stage; its completion is the chain's completion.
    Terminal,
}

/// What a stage contributes once it has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum StageRole {
    /// Only publishes annotations. Its input is passed on to the next stage unchanged.
    TrainsOnly,
    /// Also releases a transformer that turns its input into the next stage's input.
    ProducesTransformer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageKind {
    pub position: StagePosition,
    pub role: StageRole,
}

/// Object-safe view of an estimator held by a chain.
pub(crate) trait ErasedStage {
    fn name(&self) -> &str;
    fn state(&self) -> TrainingState;
    fn role(&self) -> StageRole;
    fn begin_training(&mut self) -> Result<(), FeaturizerError>;
    fn fit(&mut self, batch: &Batch) -> Result<FitResult, FeaturizerError>;
    fn on_data_completed(&mut self) -> Result<(), FeaturizerError>;
    fn complete_training(&mut self) -> Result<(), FeaturizerError>;
    fn create_transformer(&mut self) -> Result<Option<BoxedErasedTransformer>, FeaturizerError>;
    fn load_transformer(
        &self,
        reader: &mut ArchiveReader<'_>,
    ) -> Result<Option<BoxedErasedTransformer>, FeaturizerError>;
}

pub(crate) type BoxedStage = Box<dyn ErasedStage>;

/// Forwards the lifecycle calls shared by both stage adapters.
macro_rules! forward_lifecycle {
    () => {
        fn name(&self) -> &str {
            self.0.name()
        }

        fn state(&self) -> TrainingState {
            self.0.state()
        }

        fn begin_training(&mut self) -> Result<(), FeaturizerError> {
            self.0.begin_training()
        }

        fn fit(&mut self, batch: &Batch) -> Result<FitResult, FeaturizerError> {
            self.0.fit(batch.as_slice::<E::Input>()?)
        }

        fn on_data_completed(&mut self) -> Result<(), FeaturizerError> {
            self.0.on_data_completed()
        }

        fn complete_training(&mut self) -> Result<(), FeaturizerError> {
            self.0.complete_training()
        }
    };
}

pub(crate) struct TrainingStage<E>(pub(crate) E);

impl<E> ErasedStage for TrainingStage<E>
where
    E: Estimator,
    E::Input: 'static,
{
    forward_lifecycle!();

    fn role(&self) -> StageRole {
        StageRole::TrainsOnly
    }

    fn create_transformer(&mut self) -> Result<Option<BoxedErasedTransformer>, FeaturizerError> {
        Ok(None)
    }

    fn load_transformer(
        &self,
        _reader: &mut ArchiveReader<'_>,
    ) -> Result<Option<BoxedErasedTransformer>, FeaturizerError> {
        Ok(None)
    }
}

pub(crate) struct TransformingStage<E>(pub(crate) E);

impl<E> ErasedStage for TransformingStage<E>
where
    E: TransformerEstimator,
    E::Input: 'static,
    <E::Transformer as crate::Transformer>::Output: 'static,
{
    forward_lifecycle!();

    fn role(&self) -> StageRole {
        StageRole::ProducesTransformer
    }

    fn create_transformer(&mut self) -> Result<Option<BoxedErasedTransformer>, FeaturizerError> {
        if self.0.has_created_transformer() {
            return Ok(None);
        }
        Ok(Some(Box::new(Erased(self.0.create_transformer()?))))
    }

    fn load_transformer(
        &self,
        reader: &mut ArchiveReader<'_>,
    ) -> Result<Option<BoxedErasedTransformer>, FeaturizerError> {
        Ok(Some(Box::new(Erased(self.0.load_transformer(reader)?))))
    }
}
