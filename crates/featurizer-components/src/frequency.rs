use chrono::{DateTime, TimeDelta, Utc};
use featurizer_core::{AnnotationBus, FeaturizerError};

use crate::{TrainingOnlyEstimator, TrainingPolicy};

/// Smallest gap observed between consecutive timestamps.
///
/// [`TimeDelta::MAX`] if fewer than two timestamps were seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyAnnotation {
    pub frequency: TimeDelta,
}

#[derive(Debug)]
pub struct FrequencyPolicy {
    frequency: TimeDelta,
    last: Option<DateTime<Utc>>,
}

impl Default for FrequencyPolicy {
    fn default() -> Self {
        Self {
            frequency: TimeDelta::MAX,
            last: None,
        }
    }
}

impl TrainingPolicy for FrequencyPolicy {
    const NAME: &'static str = "FrequencyEstimator";

    type Input = DateTime<Utc>;
    type Annotation = FrequencyAnnotation;

    fn fit(&mut self, item: &DateTime<Utc>) -> Result<(), FeaturizerError> {
        if let Some(last) = self.last {
            if last >= *item {
                return Err(FeaturizerError::NotChronological);
            }
            self.frequency = self.frequency.min(*item - last);
        }
        self.last = Some(*item);
        Ok(())
    }

    fn complete_training(
        &mut self,
        _bus: &AnnotationBus,
        _column: usize,
    ) -> Result<Self::Annotation, FeaturizerError> {
        Ok(FrequencyAnnotation {
            frequency: self.frequency,
        })
    }
}

/// Publishes a [`FrequencyAnnotation`] for one timestamp column.
pub type FrequencyEstimator = TrainingOnlyEstimator<FrequencyPolicy>;

impl TrainingOnlyEstimator<FrequencyPolicy> {
    pub fn new(bus: AnnotationBus, column: usize) -> Result<Self, FeaturizerError> {
        Self::with_policy(bus, column, FrequencyPolicy::default(), true, None)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use featurizer_core::{Estimator, driver};

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_smallest_gap() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = FrequencyEstimator::new(bus, 0).unwrap();
        driver::train(
            &mut estimator,
            &[vec![at(1, 0), at(2, 0)], vec![at(2, 15), at(4, 0)]],
        )
        .unwrap();
        assert_eq!(
            estimator.annotation().unwrap().frequency,
            TimeDelta::minutes(15)
        );
    }

    #[test]
    fn test_single_timestamp() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = FrequencyEstimator::new(bus, 0).unwrap();
        driver::train(&mut estimator, &[vec![at(1, 0)]]).unwrap();
        assert_eq!(estimator.annotation().unwrap().frequency, TimeDelta::MAX);
    }

    #[test]
    fn test_not_chronological() {
        let bus = AnnotationBus::new(1).unwrap();
        let mut estimator = FrequencyEstimator::new(bus, 0).unwrap();
        estimator.begin_training().unwrap();
        let err = estimator.fit(&[at(3, 0), at(3, 0)]).unwrap_err();
        assert_eq!(err.to_string(), "Input stream not in chronological order.");
    }
}
