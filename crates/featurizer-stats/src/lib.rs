//! Accumulation math shared by the featurizer estimators.
//!
//! This crate has no dependencies and knows nothing about pipelines, annotations or
//! nullability. It only provides the arithmetic that estimators feed values into:
//!
//! - **Running statistics**: min, max, count, sum and mean over a stream of numbers
//! - **Count histograms**: occurrence counts keyed by any ordered value
//! - **Streaming median**: two-heap median with optional interpolation
//! - **Window calculators**: min, max and mean over a slice of history
//!
//! # Modules
//!
//! - [`descriptive`]: Running statistics accumulated one value at a time
//! - [`histogram`]: Occurrence counts for discrete values
//! - [`median`]: Streaming median computation
//! - [`window`]: Calculators applied to rolling-window history
//!
//! # Examples
//!
//! ## Accumulating running statistics
//!
//! ```
//! use featurizer_stats::descriptive::RunningStats;
//!
//! let mut stats = RunningStats::new();
//! for value in [10, 20, 30, 40] {
//!     stats.push(value);
//! }
//! let summary = stats.summary().unwrap();
//! assert_eq!(summary.min, 10);
//! assert_eq!(summary.max, 40);
//! assert_eq!(summary.mean, 25.0);
//! ```
//!
//! ## Computing a median
//!
//! ```
//! use featurizer_stats::median::StreamingMedian;
//!
//! let mut median = StreamingMedian::new();
//! for value in [5.0, 1.0, 3.0, 2.0] {
//!     median.push(value);
//! }
//! assert_eq!(median.median(true), Some(2.5));
//! assert_eq!(median.median(false), Some(2.0));
//! ```

pub mod descriptive;
pub mod histogram;
pub mod median;
pub mod window;

/// Numeric values that statistics can be accumulated over.
///
/// Every primitive integer and float type implements this trait. Conversion to `f64` may
/// lose precision for 64-bit integers with very large magnitudes.
pub trait Numeric: Copy + PartialOrd + 'static {
    /// Converts the value to `f64` for summation and averaging.
    fn to_f64(self) -> f64;
}

macro_rules! impl_numeric {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Numeric for $ty {
                #[allow(
                    clippy::cast_precision_loss,
                    clippy::cast_lossless,
                    clippy::unnecessary_cast
                )]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )+
    };
}

impl_numeric!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
