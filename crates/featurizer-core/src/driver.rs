//! Caller-side training and inference loops.
//!
//! Estimators never iterate over data themselves. These helpers own the batch cursor and
//! implement the protocol every caller has to follow:
//!
//! - fit batches in order while the estimator is training
//! - rewind to the first batch whenever `fit` asks for a reset
//! - signal `on_data_completed` after each full sweep
//! - complete training once the estimator has finished
//!
//! A reset rewinds to the start of the batch set passed in, not to data fed by earlier
//! calls.

use tracing::debug;

use crate::{Estimator, FeaturizerError, FitResult, TrainingState, Transformer};

/// Drives `estimator` from `Pending` to `Completed` over `batches`.
///
/// Empty batches are skipped.
///
/// # Errors
///
/// Propagates the first error raised by the estimator.
pub fn train<E>(estimator: &mut E, batches: &[Vec<E::Input>]) -> Result<(), FeaturizerError>
where
    E: Estimator + ?Sized,
{
    estimator.begin_training()?;

    let mut sweeps = 0_usize;
    while estimator.state() == TrainingState::Training {
        sweeps += 1;
        if sweep(estimator, batches)? {
            estimator.on_data_completed()?;
        }
    }
    debug!(estimator = estimator.name(), sweeps, "training finished");

    estimator.complete_training()
}

/// Fits every batch once. Returns `false` if the sweep stopped early.
fn sweep<E>(estimator: &mut E, batches: &[Vec<E::Input>]) -> Result<bool, FeaturizerError>
where
    E: Estimator + ?Sized,
{
    for batch in batches.iter().filter(|batch| !batch.is_empty()) {
        match estimator.fit(batch)? {
            FitResult::Continue => {}
            FitResult::Complete => return Ok(false),
            result => {
                debug_assert!(result.requires_rewind());
                debug!(estimator = estimator.name(), %result, "rewinding to the first batch");
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Executes every input, then flushes, and collects all outputs in order.
///
/// # Errors
///
/// Propagates the first error raised by the transformer.
pub fn transform<T>(
    transformer: &mut T,
    inputs: &[T::Input],
) -> Result<Vec<T::Output>, FeaturizerError>
where
    T: Transformer + ?Sized,
{
    let mut outputs = Vec::with_capacity(inputs.len());
    for input in inputs {
        transformer.execute(input, &mut |output| outputs.push(output))?;
    }
    transformer.flush(&mut |output| outputs.push(output))?;
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AnnotationBus, EstimatorCore,
        estimator::tests::{AddTransformer, SumEstimator},
    };

    /// Counts the items it sees and asks for one replay after the first `fit`.
    struct ReplayCounter {
        core: EstimatorCore,
        seen: usize,
        fits: usize,
        sweeps_completed: usize,
    }

    impl Estimator for ReplayCounter {
        type Input = u8;

        fn core(&self) -> &EstimatorCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut EstimatorCore {
            &mut self.core
        }

        fn begin_training_impl(&mut self) -> Result<bool, FeaturizerError> {
            Ok(true)
        }

        fn fit_impl(&mut self, items: &[u8]) -> Result<FitResult, FeaturizerError> {
            self.fits += 1;
            self.seen += items.len();
            Ok(if self.fits == 1 {
                FitResult::Reset
            } else {
                FitResult::Continue
            })
        }

        fn on_data_completed_impl(&mut self) -> Result<bool, FeaturizerError> {
            self.sweeps_completed += 1;
            Ok(self.sweeps_completed == 2)
        }

        fn complete_training_impl(&mut self) -> Result<(), FeaturizerError> {
            Ok(())
        }
    }

    #[test]
    fn test_train_rewinds_and_repeats_sweeps() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = ReplayCounter {
            core: EstimatorCore::new("ReplayCounter", bus).unwrap(),
            seen: 0,
            fits: 0,
            sweeps_completed: 0,
        };
        train(&mut estimator, &[vec![1, 2], vec![], vec![3]]).unwrap();

        assert_eq!(estimator.state(), TrainingState::Completed);
        // One aborted fit, then two full sweeps over the two non-empty batches.
        assert_eq!(estimator.fits, 5);
        assert_eq!(estimator.seen, 2 + 3 + 3);
        assert_eq!(estimator.sweeps_completed, 2);
    }

    #[test]
    fn test_train_stops_on_complete() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = SumEstimator::new(bus.clone(), Some(1));
        train(&mut estimator, &[vec![4], vec![100]]).unwrap();
        assert_eq!(*bus.lookup::<i64>(0, "SumEstimator").unwrap(), 4);
    }

    #[test]
    fn test_train_without_data() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = SumEstimator::new(bus.clone(), None);
        train(&mut estimator, &[]).unwrap();
        assert_eq!(*bus.lookup::<i64>(0, "SumEstimator").unwrap(), 0);
    }

    #[test]
    fn test_transform() {
        let mut transformer = AddTransformer { delta: 2 };
        assert_eq!(transform(&mut transformer, &[1, 2]).unwrap(), vec![3, 4]);
    }
}
