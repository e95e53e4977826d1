//! Estimator contracts and the training state machine.
//!
//! # Overview
//!
//! [`Estimator`] is written in template-method style. Implementors provide the `*_impl`
//! hooks; the provided methods ([`Estimator::begin_training`], [`Estimator::fit`],
//! [`Estimator::on_data_completed`], [`Estimator::complete_training`]) check the current
//! [`TrainingState`], call the hook, and advance the state. Hooks are never called out of
//! order, so implementations do not repeat those checks.
//!
//! [`TransformerEstimator`] adds the one-shot [`TransformerEstimator::create_transformer`]
//! for stages that produce a runtime [`Transformer`].

use tracing::trace;

use crate::{AnnotationBus, ArchiveReader, FeaturizerError, FitResult, Transformer, TrainingState};

/// State shared by every estimator: its name, the annotation bus, and the training state.
#[derive(Debug, Clone)]
pub struct EstimatorCore {
    name: String,
    bus: AnnotationBus,
    state: TrainingState,
}

impl EstimatorCore {
    /// Creates a core in the [`TrainingState::Pending`] state.
    ///
    /// # Errors
    ///
    /// Returns [`FeaturizerError::InvalidArgument`] if `name` is empty.
    pub fn new(name: impl Into<String>, bus: AnnotationBus) -> Result<Self, FeaturizerError> {
        let name = name.into();
        if name.is_empty() {
            return Err(FeaturizerError::InvalidArgument {
                name: "name",
                reason: "must not be empty",
            });
        }
        Ok(Self {
            name,
            bus,
            state: TrainingState::Pending,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn bus(&self) -> &AnnotationBus {
        &self.bus
    }

    #[must_use]
    pub fn state(&self) -> TrainingState {
        self.state
    }

    fn set_state(&mut self, state: TrainingState) {
        debug_assert!(state >= self.state, "training state moved backwards");
        self.state = state;
    }
}

/// A trainable pipeline stage.
pub trait Estimator {
    type Input;

    fn core(&self) -> &EstimatorCore;
    fn core_mut(&mut self) -> &mut EstimatorCore;

    /// Returns `true` if the estimator needs input, `false` to finish immediately.
    fn begin_training_impl(&mut self) -> Result<bool, FeaturizerError>;

    /// Trains on a non-empty batch.
    fn fit_impl(&mut self, items: &[Self::Input]) -> Result<FitResult, FeaturizerError>;

    /// Called at the end of a sweep over all batches. Returns `true` once the estimator has
    /// seen enough data.
    fn on_data_completed_impl(&mut self) -> Result<bool, FeaturizerError> {
        Ok(true)
    }

    /// Publishes annotations and releases training resources.
    fn complete_training_impl(&mut self) -> Result<(), FeaturizerError>;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn bus(&self) -> &AnnotationBus {
        self.core().bus()
    }

    fn state(&self) -> TrainingState {
        self.core().state()
    }

    /// Moves a pending estimator to `Training`, or to `Finished` if it needs no input.
    fn begin_training(&mut self) -> Result<(), FeaturizerError> {
        if self.state() != TrainingState::Pending {
            return Err(FeaturizerError::invalid_state(
                "begin_training",
                "is already training or completed",
            ));
        }
        let state = if self.begin_training_impl()? {
            TrainingState::Training
        } else {
            TrainingState::Finished
        };
        self.core_mut().set_state(state);
        Ok(())
    }

    /// Feeds a batch to a training estimator.
    ///
    /// On [`FitResult::Complete`] the estimator becomes `Finished`. On a reset result it
    /// stays `Training` and the caller must rewind to its first batch.
    fn fit(&mut self, items: &[Self::Input]) -> Result<FitResult, FeaturizerError> {
        if self.state() != TrainingState::Training {
            return Err(FeaturizerError::invalid_state(
                "fit",
                "is not training or is already finished/complete",
            ));
        }
        if items.is_empty() {
            return Err(FeaturizerError::InvalidArgument {
                name: "items",
                reason: "must not be empty",
            });
        }
        let result = self.fit_impl(items)?;
        trace!(estimator = self.name(), items = items.len(), %result, "fit");
        if result == FitResult::Complete {
            self.core_mut().set_state(TrainingState::Finished);
        }
        Ok(result)
    }

    /// Signals the end of one sweep over the available batches.
    fn on_data_completed(&mut self) -> Result<(), FeaturizerError> {
        match self.state() {
            TrainingState::Training => {
                if self.on_data_completed_impl()? {
                    self.core_mut().set_state(TrainingState::Finished);
                }
                Ok(())
            }
            TrainingState::Finished => Ok(()),
            TrainingState::Pending | TrainingState::Completed => Err(FeaturizerError::invalid_state(
                "on_data_completed",
                "is not training or is already complete",
            )),
        }
    }

    /// Moves a finished estimator to `Completed`.
    fn complete_training(&mut self) -> Result<(), FeaturizerError> {
        if self.state() != TrainingState::Finished {
            return Err(FeaturizerError::invalid_state(
                "complete_training",
                "is not finished or is already complete",
            ));
        }
        self.complete_training_impl()?;
        self.core_mut().set_state(TrainingState::Completed);
        Ok(())
    }
}

/// An estimator that produces a [`Transformer`] once training has completed.
pub trait TransformerEstimator: Estimator {
    type Transformer: Transformer<Input = Self::Input> + 'static;

    fn create_transformer_impl(&mut self) -> Result<Self::Transformer, FeaturizerError>;

    /// Whether [`TransformerEstimator::create_transformer`] has already succeeded.
    fn has_created_transformer(&self) -> bool;

    /// Records that a transformer was handed out.
    fn mark_transformer_created(&mut self);

    /// Restores a transformer previously saved by one this estimator created.
    ///
    /// The estimator supplies the shape of composite transformers; its training state is
    /// not consulted.
    fn load_transformer(
        &self,
        reader: &mut ArchiveReader<'_>,
    ) -> Result<Self::Transformer, FeaturizerError>;

    /// Creates the transformer. Only legal once, and only after training has completed.
    fn create_transformer(&mut self) -> Result<Self::Transformer, FeaturizerError> {
        if self.state() != TrainingState::Completed {
            return Err(FeaturizerError::invalid_state(
                "create_transformer",
                "is not yet complete",
            ));
        }
        if self.has_created_transformer() {
            return Err(FeaturizerError::invalid_state(
                "create_transformer",
                "has been used to create a `Transformer`",
            ));
        }
        let transformer = self.create_transformer_impl()?;
        self.mark_transformer_created();
        Ok(transformer)
    }
}
