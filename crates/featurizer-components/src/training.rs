//! Estimators that only publish an annotation.
//!
//! # Overview
//!
//! Most statistics follow the same shape: look at every training value, then publish one
//! annotation for one column. A [`TrainingPolicy`] supplies that math and
//! [`TrainingOnlyEstimator`] supplies the lifecycle around it:
//!
//! - the column index is checked against the bus when the estimator is built
//! - an estimator built with `requires_training = false` skips straight to completion
//! - if the column already carries an annotation under the policy's name, training is
//!   skipped and that annotation is reused rather than published twice
//! - an optional item budget finishes training after that many items

use std::{any::Any, rc::Rc};

use featurizer_core::{AnnotationBus, Estimator, EstimatorCore, FeaturizerError, FitResult};
use tracing::debug;

/// The statistic computed by a [`TrainingOnlyEstimator`].
pub trait TrainingPolicy {
    /// Producer name the annotation is published under.
    const NAME: &'static str;

    type Input;
    type Annotation: Any;

    fn fit(&mut self, item: &Self::Input) -> Result<(), FeaturizerError>;

    /// Builds the annotation. May read annotations published earlier for `column`.
    fn complete_training(
        &mut self,
        bus: &AnnotationBus,
        column: usize,
    ) -> Result<Self::Annotation, FeaturizerError>;
}

/// Runs a [`TrainingPolicy`] and publishes its annotation for one column.
#[derive(Debug)]
pub struct TrainingOnlyEstimator<P> {
    core: EstimatorCore,
    policy: P,
    column: usize,
    requires_training: bool,
    has_annotation: bool,
    remaining: Option<usize>,
}

impl<P> TrainingOnlyEstimator<P>
where
    P: TrainingPolicy,
{
    /// # Errors
    ///
    /// Returns [`FeaturizerError::InvalidArgument`] if `column` is not a column of `bus`
    /// or `max_items` is zero.
    pub fn with_policy(
        bus: AnnotationBus,
        column: usize,
        policy: P,
        requires_training: bool,
        max_items: Option<usize>,
    ) -> Result<Self, FeaturizerError> {
        bus.check_column(column)?;
        if max_items == Some(0) {
            return Err(FeaturizerError::InvalidArgument {
                name: "max_items",
                reason: "must be at least 1",
            });
        }
        Ok(Self {
            core: EstimatorCore::new(P::NAME, bus)?,
            policy,
            column,
            requires_training,
            has_annotation: false,
            remaining: max_items,
        })
    }

    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    #[must_use]
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Looks up the annotation this estimator publishes (or reused) for its column.
    pub fn annotation(&self) -> Result<Rc<P::Annotation>, FeaturizerError> {
        self.core.bus().lookup(self.column, P::NAME)
    }
}

impl<P> Estimator for TrainingOnlyEstimator<P>
where
    P: TrainingPolicy,
{
    type Input = P::Input;

    fn core(&self) -> &EstimatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EstimatorCore {
        &mut self.core
    }

    fn begin_training_impl(&mut self) -> Result<bool, FeaturizerError> {
        if !self.requires_training {
            return Ok(false);
        }
        self.has_annotation = self
            .core
            .bus()
            .try_lookup::<P::Annotation>(self.column, P::NAME)?
            .is_some();
        Ok(!self.has_annotation)
    }

    fn fit_impl(&mut self, items: &[P::Input]) -> Result<FitResult, FeaturizerError> {
        let count = self.remaining.map_or(items.len(), |remaining| remaining.min(items.len()));
        for item in &items[..count] {
            self.policy.fit(item)?;
        }
        if let Some(remaining) = &mut self.remaining {
            *remaining -= count;
            if *remaining == 0 {
                return Ok(FitResult::Complete);
            }
        }
        Ok(FitResult::Continue)
    }

    fn complete_training_impl(&mut self) -> Result<(), FeaturizerError> {
        if self.has_annotation {
            debug!(estimator = P::NAME, column = self.column, "reusing existing annotation");
            return Ok(());
        }
        let bus = self.core.bus().clone();
        let annotation = self.policy.complete_training(&bus, self.column)?;
        bus.publish(self.column, P::NAME, annotation)?;
        debug!(estimator = P::NAME, column = self.column, "annotation published");
        Ok(())
    }
}
