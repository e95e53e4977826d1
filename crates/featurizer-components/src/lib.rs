//! Building blocks shared by the featurizers.
//!
//! # Overview
//!
//! Featurizers are chains whose leading stages only compute a statistic and publish it as
//! an annotation, and whose last stage reads that annotation to build a transformer. This
//! crate holds the reusable pieces of those chains:
//!
//! - [`TrainingOnlyEstimator`]: the lifecycle of an estimator that only publishes an
//!   annotation, parameterized by a [`TrainingPolicy`]
//! - annotation producers for one column: [`StatisticalMetricsEstimator`],
//!   [`MinMaxEstimator`], [`HistogramEstimator`], [`OrderEstimator`], [`ModeEstimator`],
//!   [`MedianEstimator`] and [`FrequencyEstimator`]
//! - [`ImputerTransformer`]: replaces nulls with a learned value
//!
//! # Examples
//!
//! ```
//! use featurizer_components::{HistogramEstimator, ModeEstimator, OrderEstimator};
//! use featurizer_core::{AnnotationBus, ChainBuilder, FeaturizerError, driver};
//!
//! let bus = AnnotationBus::new(1)?;
//! let mut chain = ChainBuilder::new("Mode", bus.clone())
//!     .then_training(HistogramEstimator::<Option<char>>::new(bus.clone(), 0)?)
//!     .then_training(OrderEstimator::<Option<char>>::new(bus.clone(), 0)?)
//!     .then_training(ModeEstimator::<Option<char>>::new(bus.clone(), 0)?)
//!     .build()?;
//! driver::train(&mut chain, &[vec![Some('b'), None, Some('c'), Some('c')]])?;
//!
//! let mode = bus.lookup::<featurizer_components::ModeAnnotation<char>>(0, "ModeEstimator")?;
//! assert_eq!(mode.value, 'c');
//! # Ok::<(), FeaturizerError>(())
//! ```

pub use self::{
    frequency::*, histogram::*, imputer::*, median::*, min_max::*, mode::*, order::*,
    statistical_metrics::*, training::*,
};

mod frequency;
mod histogram;
mod imputer;
mod median;
mod min_max;
mod mode;
mod order;
mod statistical_metrics;
mod training;
