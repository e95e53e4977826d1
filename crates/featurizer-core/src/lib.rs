//! Estimator/transformer pipeline core.
//!
//! Every pipeline stage goes through two phases. An [`Estimator`] is trained incrementally
//! over caller-supplied batches and may then release a [`Transformer`] that applies what it
//! learned to inference data. Stages communicate through an [`AnnotationBus`]: a completed
//! estimator publishes an annotation (e.g. "the mean of column 0 is 25") that later stages
//! read when they build their transformer.
//!
//! # Composition
//!
//! - [`Chain`]: an ordered list of estimators trained front to back, collapsing into a
//!   [`TransformerChain`]
//! - [`GrainEstimator`]: one independent estimator per group-by key
//! - [`FilterEstimator`]: runs an estimator over a projection of a tuple input
//!
//! # Training protocol
//!
//! Callers own the batch cursor. [`driver::train`] shows the canonical loop:
//!
//! ```
//! use featurizer_core::{
//!     AnnotationBus, Estimator, FeaturizerError, FitResult, TrainingState, driver,
//! };
//!
//! # struct Counter { state: featurizer_core::EstimatorCore, seen: usize }
//! # impl Estimator for Counter {
//! #     type Input = i32;
//! #     fn core(&self) -> &featurizer_core::EstimatorCore { &self.state }
//! #     fn core_mut(&mut self) -> &mut featurizer_core::EstimatorCore { &mut self.state }
//! #     fn begin_training_impl(&mut self) -> Result<bool, FeaturizerError> { Ok(true) }
//! #     fn fit_impl(&mut self, items: &[i32]) -> Result<FitResult, FeaturizerError> {
//! #         self.seen += items.len();
//! #         Ok(FitResult::Continue)
//! #     }
//! #     fn complete_training_impl(&mut self) -> Result<(), FeaturizerError> { Ok(()) }
//! # }
//! let bus = AnnotationBus::new(1)?;
//! let mut counter = Counter { state: featurizer_core::EstimatorCore::new("Counter", bus)?, seen: 0 };
//! driver::train(&mut counter, &[vec![1, 2], vec![3]])?;
//! assert_eq!(counter.state(), TrainingState::Completed);
//! assert_eq!(counter.seen, 3);
//! # Ok::<(), FeaturizerError>(())
//! ```

pub use self::{
    annotation::*, archive::*, chain::*, estimator::*, filter::*, grain::*, nullable::*,
    state::*, transformer::*,
};

pub mod annotation;
pub mod archive;
pub mod chain;
pub mod driver;
pub mod estimator;
pub mod filter;
pub mod grain;
pub mod nullable;
pub mod state;
pub mod transformer;

/// Errors raised by pipeline stages.
///
/// No variant is recovered from internally. Retries happen only through the
/// [`FitResult::Reset`] protocol, which is driven by the caller.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum FeaturizerError {
    // Precondition violations
    #[display("Invalid argument '{name}': {reason}")]
    InvalidArgument {
        name: &'static str,
        reason: &'static str,
    },
    #[display("`{method}` should not be invoked on an estimator that {reason}")]
    InvalidState {
        method: &'static str,
        reason: &'static str,
    },

    // Annotation bookkeeping
    #[display("Annotation data was not found for this column")]
    AnnotationNotFound,
    #[display("Unexpected AnnotationMap {reason}")]
    UnexpectedAnnotationInsertion { reason: &'static str },

    // Unsupported operations
    #[display("Grain not found")]
    GrainNotFound,
    /// An estimator inside a grain wrapper returned [`FitResult::Reset`].
    #[display("Resetting estimators can not be used as GrainEstimators")]
    GrainReset,
    #[display("Transformers that rely on flush can't be wrapped by a filter")]
    FilterFlush,
    #[display(
        "This method should only be used with Transformers that generate 1 output value for each input value"
    )]
    MultipleOutputs,

    // Serialization
    #[display("Unsupported archive version")]
    UnsupportedArchiveVersion { major: u16, minor: u16 },
    #[display("Invalid archive data")]
    Archive(bincode::Error),
    #[display("Archive contains unread data")]
    TrailingArchiveData,

    // Data quality
    #[display("No values were provided")]
    NoValuesProvided,
    #[display("The histogram is empty")]
    EmptyHistogram,
    #[display("The histogram does not contain any supported values")]
    NoSupportedHistogramValues,
    #[display("The imputed value may not be null")]
    NullImputedValue,
    #[display("Mean values can't be calculated without input")]
    MeanWithoutInput,
    #[display("No elements were provided during training")]
    NoMedianElements,
    #[display("Input stream not in chronological order.")]
    NotChronological,

    // Internal invariants
    #[display("Pipeline stage received an unexpected item type")]
    StageTypeMismatch,
}

impl FeaturizerError {
    pub(crate) fn invalid_state(method: &'static str, reason: &'static str) -> Self {
        Self::InvalidState { method, reason }
    }
}
