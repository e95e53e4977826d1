use featurizer_core::FeaturizerError;
use serde::{Deserialize, Serialize};

use crate::rolling_window::{
    AnalyticalCalculation, SimpleCalculation, WindowCalculation, WindowSpec,
};

/// Declarative description of one featurizer.
///
/// ```
/// use featurizer_ops::{FeaturizerConfig, rolling_window::SimpleCalculation};
///
/// let config: FeaturizerConfig = serde_json::from_str(
///     r#"{"kind": "simple_rolling_window", "calculation": "Max", "horizon": 2, "max_window_size": 3}"#,
/// )
/// .unwrap();
/// let FeaturizerConfig::SimpleRollingWindow(spec) = config else { unreachable!() };
/// assert_eq!(spec.calculation, SimpleCalculation::Max);
/// assert_eq!(spec.min_window_size, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeaturizerConfig {
    MeanImputer,
    MinMaxImputer { use_min: bool },
    ModeImputer,
    MedianImputer {
        #[serde(default)]
        interpolate: bool,
    },
    SimpleRollingWindow(WindowSpec<SimpleCalculation>),
    AnalyticalRollingWindow(WindowSpec<AnalyticalCalculation>),
}

impl FeaturizerConfig {
    /// Name of the estimator the configuration builds.
    #[must_use]
    pub fn estimator_name(&self) -> &'static str {
        match self {
            Self::MeanImputer => "MeanImputer",
            Self::MinMaxImputer { .. } => "MinMaxImputer",
            Self::ModeImputer => "ModeImputer",
            Self::MedianImputer { .. } => "MedianImputer",
            Self::SimpleRollingWindow(_) => SimpleCalculation::GRAINED_ESTIMATOR_NAME,
            Self::AnalyticalRollingWindow(_) => AnalyticalCalculation::GRAINED_ESTIMATOR_NAME,
        }
    }

    /// Checks the parameters without building anything.
    pub fn validate(&self) -> Result<(), FeaturizerError> {
        match self {
            Self::SimpleRollingWindow(spec) => spec.validate(),
            Self::AnalyticalRollingWindow(spec) => spec.validate(),
            Self::MeanImputer
            | Self::MinMaxImputer { .. }
            | Self::ModeImputer
            | Self::MedianImputer { .. } => Ok(()),
        }
    }
}
