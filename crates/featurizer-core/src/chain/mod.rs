//! Chain composition engine.
//!
//! # Overview
//!
//! A [`Chain`] owns an ordered list of estimators and is itself an [`Estimator`]. Training
//! data enters the first stage that is still training. Stages before it have completed,
//! so the data is first run through their transformers (trains-only stages pass it on
//! unchanged). Once every stage has finished, [`TransformerEstimator::create_transformer`]
//! collapses the chain into a [`TransformerChain`].
//!
//! # Cascade rules
//!
//! - `begin_training`: start the first pending stage. A stage that needs no training is
//!   completed on the spot (publishing its annotation and creating its transformer) and
//!   the next stage is started, until a stage wants data or the terminal stage is reached.
//! - `fit`: a training stage receives the batch. When it reports `Complete`, it is
//!   completed and the next stage is started; the chain then reports `Complete` if every
//!   stage has finished and `Reset` otherwise, so the caller replays the data for the next
//!   stage. Reset results from a stage are passed to the caller untouched.
//! - `on_data_completed`: delivered to the first training stage. Completed stages in front
//!   of it are flushed first, and whatever their transformers emit is fitted into the
//!   following stage.
//! - `complete_training`: completes every stage that has not completed yet, in order.
//!
//! Ordering is strictly front to back: a stage never begins before every stage in front
//! of it has completed and published its annotation.
//!
//! # Examples
//!
//! ```
//! use featurizer_core::{
//!     AnnotationBus, ChainBuilder, FeaturizerError, FilterDecoratorEstimator, Pick,
//!     Transformer, TransformerEstimator, driver,
//! };
//!
//! let bus = AnnotationBus::new(1)?;
//! let mut chain = ChainBuilder::<(i32, char), _>::new("Example", bus.clone())
//!     .then(FilterDecoratorEstimator::<(i32, char), Pick<1>>::new(bus)?)
//!     .build()?;
//! driver::train(&mut chain, &[vec![(1, 'x')]])?;
//!
//! let mut transformer = chain.create_transformer()?;
//! assert_eq!(transformer.execute_single(&(10, 'a'))?, 'a');
//! # Ok::<(), FeaturizerError>(())
//! ```

use std::{fmt, marker::PhantomData};

use tracing::debug;

use crate::{
    AnnotationBus, ArchiveReader, Estimator, EstimatorCore, FeaturizerError, FitResult,
    Transformer, TrainingState, TransformerEstimator,
};

use self::{
    stage::{BoxedStage, TrainingStage, TransformingStage},
    transformer::{Batch, BoxedErasedTransformer},
};

pub use self::{stage::*, transformer::TransformerChain};

mod stage;
mod transformer;

/// Builds a [`Chain`] one stage at a time.
///
/// The builder tracks the output type of the last stage, so a stage whose input type does
/// not match is rejected at compile time.
pub struct ChainBuilder<In, Out> {
    name: String,
    bus: AnnotationBus,
    stages: Vec<BoxedStage>,
    _marker: PhantomData<fn(In) -> Out>,
}

impl<In> ChainBuilder<In, In>
where
    In: Clone + 'static,
{
    #[must_use]
    pub fn new(name: impl Into<String>, bus: AnnotationBus) -> Self {
        Self {
            name: name.into(),
            bus,
            stages: vec![],
            _marker: PhantomData,
        }
    }
}

impl<In, Out> ChainBuilder<In, Out>
where
    In: Clone + 'static,
    Out: 'static,
{
    /// Appends a stage that produces a transformer. Its output feeds the next stage.
    #[must_use]
    pub fn then<E>(
        mut self,
        estimator: E,
    ) -> ChainBuilder<In, <E::Transformer as Transformer>::Output>
    where
        E: TransformerEstimator<Input = Out> + 'static,
        <E::Transformer as Transformer>::Output: 'static,
    {
        self.stages.push(Box::new(TransformingStage(estimator)));
        ChainBuilder {
            name: self.name,
            bus: self.bus,
            stages: self.stages,
            _marker: PhantomData,
        }
    }

    /// Appends a stage that only publishes annotations. The next stage sees the same input.
    #[must_use]
    pub fn then_training<E>(mut self, estimator: E) -> Self
    where
        E: Estimator<Input = Out> + 'static,
    {
        self.stages.push(Box::new(TrainingStage(estimator)));
        self
    }

    /// Finishes the chain.
    ///
    /// # Errors
    ///
    /// Returns [`FeaturizerError::InvalidArgument`] if no stage was added or the name is
    /// empty.
    pub fn build(self) -> Result<Chain<In, Out>, FeaturizerError> {
        if self.stages.is_empty() {
            return Err(FeaturizerError::InvalidArgument {
                name: "estimators",
                reason: "a chain needs at least one estimator",
            });
        }
        let transformers = self.stages.iter().map(|_| None).collect();
        Ok(Chain {
            core: EstimatorCore::new(self.name, self.bus)?,
            stages: self.stages,
            transformers,
            created_transformer: false,
            _marker: PhantomData,
        })
    }
}

/// An ordered composition of estimators, trained as one estimator.
pub struct Chain<In, Out> {
    core: EstimatorCore,
    stages: Vec<BoxedStage>,
    /// Transformers of completed stages, index-aligned with `stages`.
    transformers: Vec<Option<BoxedErasedTransformer>>,
    created_transformer: bool,
    _marker: PhantomData<fn(In) -> Out>,
}

impl<In, Out> fmt::Debug for Chain<In, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stages = self
            .stages
            .iter()
            .map(|stage| (stage.name(), stage.state()))
            .collect::<Vec<_>>();
        f.debug_struct("Chain")
            .field("core", &self.core)
            .field("stages", &stages)
            .finish_non_exhaustive()
    }
}

impl<In, Out> Chain<In, Out>
where
    In: Clone + 'static,
    Out: 'static,
{
    #[must_use]
    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    /// Training state of every stage, in order.
    #[must_use]
    pub fn stage_states(&self) -> Vec<TrainingState> {
        self.stages.iter().map(|stage| stage.state()).collect()
    }

    /// Position and role of every stage, in order.
    #[must_use]
    pub fn stage_kinds(&self) -> Vec<StageKind> {
        let last = self.last_index();
        self.stages
            .iter()
            .enumerate()
            .map(|(index, stage)| StageKind {
                position: if index == last {
                    StagePosition::Terminal
                } else {
                    StagePosition::Intermediate
                },
                role: stage.role(),
            })
            .collect()
    }

    /// `true` when no stage from `start` onwards needs more data.
    fn has_training_finished_from(&self, start: usize) -> bool {
        self.stages[start..]
            .iter()
            .all(|stage| stage.state().is_done_training())
    }

    #[must_use]
    pub fn has_all_training_finished(&self) -> bool {
        self.has_training_finished_from(0)
    }

    fn last_index(&self) -> usize {
        self.stages.len() - 1
    }

    /// Completes stage `index` and keeps the transformer it releases.
    fn complete_stage(&mut self, index: usize) -> Result<(), FeaturizerError> {
        let stage = &mut self.stages[index];
        if stage.state() == TrainingState::Completed {
            return Ok(());
        }
        stage.complete_training()?;
        if let Some(transformer) = stage.create_transformer()? {
            self.transformers[index] = Some(transformer);
        }
        debug!(chain = self.core.name(), stage = stage.name(), index, "chain stage completed");
        Ok(())
    }

    fn begin_training_from(&mut self, start: usize) -> Result<(), FeaturizerError> {
        let last = self.last_index();
        for index in start..=last {
            if self.stages[index].state() == TrainingState::Pending {
                self.stages[index].begin_training()?;
            }
            if self.stages[index].state() == TrainingState::Training || index == last {
                return Ok(());
            }
            self.complete_stage(index)?;
        }
        Ok(())
    }

    fn fit_from(&mut self, start: usize, mut batch: Batch) -> Result<FitResult, FeaturizerError> {
        let last = self.last_index();
        for index in start..=last {
            match self.stages[index].state() {
                TrainingState::Training => {
                    let result = self.stages[index].fit(&batch)?;
                    if result != FitResult::Complete || index == last {
                        return Ok(result);
                    }
                    self.complete_stage(index)?;
                    self.begin_training_from(index + 1)?;
                    return Ok(if self.has_training_finished_from(index + 1) {
                        FitResult::Complete
                    } else {
                        FitResult::Reset
                    });
                }
                TrainingState::Pending => {
                    return Err(FeaturizerError::invalid_state(
                        "fit",
                        "has not begun training",
                    ));
                }
                TrainingState::Finished | TrainingState::Completed => {
                    if index == last {
                        return Ok(FitResult::Complete);
                    }
                    if let Some(transformer) = &mut self.transformers[index] {
                        batch = transformer.execute_batch(batch)?;
                        if batch.is_empty() {
                            return Ok(FitResult::Continue);
                        }
                    }
                }
            }
        }
        Ok(FitResult::Complete)
    }

    fn on_data_completed_from(&mut self, start: usize) -> Result<(), FeaturizerError> {
        let last = self.last_index();
        for index in start..=last {
            match self.stages[index].state() {
                TrainingState::Training => {
                    self.stages[index].on_data_completed()?;
                    if self.stages[index].state() == TrainingState::Training || index == last {
                        return Ok(());
                    }
                    self.complete_stage(index)?;
                    return self.begin_training_from(index + 1);
                }
                TrainingState::Pending => return Ok(()),
                TrainingState::Finished | TrainingState::Completed => {
                    if index == last {
                        return Ok(());
                    }
                    if let Some(transformer) = &mut self.transformers[index] {
                        let flushed = transformer.flush_batch()?;
                        if !flushed.is_empty() {
                            self.fit_from(index + 1, flushed)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl<In, Out> Estimator for Chain<In, Out>
where
    In: Clone + 'static,
    Out: 'static,
{
    type Input = In;

    fn core(&self) -> &EstimatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EstimatorCore {
        &mut self.core
    }

    fn begin_training_impl(&mut self) -> Result<bool, FeaturizerError> {
        self.begin_training_from(0)?;
        Ok(!self.has_all_training_finished())
    }

    fn fit_impl(&mut self, items: &[In]) -> Result<FitResult, FeaturizerError> {
        self.fit_from(0, Batch::new(items.to_vec()))
    }

    fn on_data_completed_impl(&mut self) -> Result<bool, FeaturizerError> {
        self.on_data_completed_from(0)?;
        Ok(self.has_all_training_finished())
    }

    fn complete_training_impl(&mut self) -> Result<(), FeaturizerError> {
        (0..self.stages.len()).try_for_each(|index| self.complete_stage(index))
    }
}

impl<In, Out> TransformerEstimator for Chain<In, Out>
where
    In: Clone + 'static,
    Out: 'static,
{
    type Transformer = TransformerChain<In, Out>;

    fn create_transformer_impl(&mut self) -> Result<TransformerChain<In, Out>, FeaturizerError> {
        let stages = self.transformers.iter_mut().filter_map(Option::take).collect();
        Ok(TransformerChain::new(stages))
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
    ) -> Result<TransformerChain<In, Out>, FeaturizerError> {
        let mut stages = vec![];
        for stage in &self.stages {
            if let Some(transformer) = stage.load_transformer(reader)? {
                stages.push(transformer);
            }
        }
        Ok(TransformerChain::new(stages))
    }
}
