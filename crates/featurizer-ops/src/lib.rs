//! User-facing featurizers.
//!
//! # Overview
//!
//! Each featurizer is an estimator built from the pipeline core and the shared components:
//!
//! - [`imputer`]: mean, min/max, mode and median imputers
//! - [`rolling_window`]: simple (min/max) and analytical (mean) rolling windows, plain or
//!   applied per grain
//! - [`FeaturizerConfig`]: a serde description of one featurizer, used to persist which
//!   featurizer produced a saved transformer
//!
//! # Examples
//!
//! ```
//! use featurizer_core::{AnnotationBus, FeaturizerError, Transformer, TransformerEstimator, driver};
//! use featurizer_ops::imputer;
//!
//! let bus = AnnotationBus::new(1)?;
//! let mut estimator = imputer::mode_imputer::<Option<char>>(bus, 0)?;
//! driver::train(&mut estimator, &[vec![Some('a'), Some('b'), Some('b'), None]])?;
//!
//! let mut transformer = estimator.create_transformer()?;
//! assert_eq!(transformer.execute_single(&None)?, 'b');
//! # Ok::<(), FeaturizerError>(())
//! ```

pub use self::config::FeaturizerConfig;

mod config;
pub mod imputer;
pub mod rolling_window;
