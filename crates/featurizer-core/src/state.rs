use serde::{Deserialize, Serialize};

/// Per-estimator training state.
///
/// States only move forward: `Pending → Training → Finished → Completed`, with
/// `Pending → Finished` taken by estimators that need no input.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_more::Display, derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum TrainingState {
    /// Constructed, `begin_training` not yet called.
    Pending,
    /// Accepting `fit` calls.
    Training,
    /// No more input needed; waiting for `complete_training`.
    Finished,
    /// Training is over. Annotations are published and a transformer may be created.
    Completed,
}

impl TrainingState {
    /// Whether the estimator no longer needs input.
    #[must_use]
    pub fn is_done_training(self) -> bool {
        matches!(self, Self::Finished | Self::Completed)
    }
}

/// Result of a single `fit` call.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
    derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum FitResult {
    /// More data is needed.
    Continue,
    /// Training has finished; `fit` must not be called again.
    Complete,
    /// The caller must rewind to the first batch of the current batch set and fit again.
    Reset,
    /// Like [`FitResult::Reset`], but the rewind is expected rather than exceptional.
    ResetAndContinue,
}

impl FitResult {
    /// Whether the caller has to rewind its batch cursor.
    #[must_use]
    pub fn requires_rewind(self) -> bool {
        matches!(self, Self::Reset | Self::ResetAndContinue)
    }
}
