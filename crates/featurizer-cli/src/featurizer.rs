//! Maps a [`FeaturizerConfig`] onto a concrete estimator.
//!
//! Column types are fixed per featurizer kind:
//!
//! | kind | row | output |
//! |---|---|---|
//! | `mean_imputer`, `median_imputer` | number or `null` | number |
//! | `min_max_imputer` | number or `null` | number |
//! | `mode_imputer` | string or `null` | string |
//! | `*_rolling_window` | `[[grain, ...], number]` | array of numbers (`null` if unavailable) |

use std::num::NonZeroUsize;

use anyhow::{Context, bail};
use featurizer_core::{
    AnnotationBus, ArchiveReader, ArchiveWriter, Transformer, TransformerEstimator, driver,
};
use featurizer_ops::{FeaturizerConfig, imputer, rolling_window};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

trait EstimatorVisitor {
    type Output;

    fn visit<E>(self, estimator: E) -> anyhow::Result<Self::Output>
    where
        E: TransformerEstimator,
        E::Input: DeserializeOwned,
        <E::Transformer as Transformer>::Output: Serialize;
}

fn visit_estimator<V>(config: &FeaturizerConfig, visitor: V) -> anyhow::Result<V::Output>
where
    V: EstimatorVisitor,
{
    let bus = AnnotationBus::new(1)?;
    match *config {
        FeaturizerConfig::MeanImputer => {
            visitor.visit(imputer::mean_imputer::<Option<f64>>(bus, 0)?)
        }
        FeaturizerConfig::MinMaxImputer { use_min } => {
            visitor.visit(imputer::min_max_imputer::<Option<f64>>(bus, 0, use_min)?)
        }
        FeaturizerConfig::ModeImputer => {
            visitor.visit(imputer::mode_imputer::<Option<String>>(bus, 0)?)
        }
        FeaturizerConfig::MedianImputer { interpolate } => {
            visitor.visit(imputer::median_imputer::<Option<f64>>(bus, 0, interpolate)?)
        }
        FeaturizerConfig::SimpleRollingWindow(spec) => {
            visitor.visit(rolling_window::grained_rolling_window::<f64, _>(bus, spec)?)
        }
        FeaturizerConfig::AnalyticalRollingWindow(spec) => {
            visitor.visit(rolling_window::grained_rolling_window::<f64, _>(bus, spec)?)
        }
    }
}

/// Trains the configured featurizer on `rows` and returns its saved transformer.
pub fn fit(
    config: &FeaturizerConfig,
    rows: Value,
    batch_size: NonZeroUsize,
) -> anyhow::Result<Vec<u8>> {
    visit_estimator(config, Fit { rows, batch_size })
}

/// Restores the transformer saved in `archive` and applies it to `rows`.
pub fn transform(
    config: &FeaturizerConfig,
    archive: &[u8],
    rows: Value,
) -> anyhow::Result<Vec<Value>> {
    visit_estimator(config, Transform { archive, rows })
}

struct Fit {
    rows: Value,
    batch_size: NonZeroUsize,
}

impl EstimatorVisitor for Fit {
    type Output = Vec<u8>;

    fn visit<E>(self, mut estimator: E) -> anyhow::Result<Vec<u8>>
    where
        E: TransformerEstimator,
        E::Input: DeserializeOwned,
        <E::Transformer as Transformer>::Output: Serialize,
    {
        let rows: Vec<E::Input> =
            serde_json::from_value(self.rows).context("Failed to parse training rows")?;
        if rows.is_empty() {
            bail!("Training data must contain at least one row");
        }

        let mut batches = vec![];
        let mut rows = rows.into_iter();
        loop {
            let batch = rows.by_ref().take(self.batch_size.get()).collect::<Vec<_>>();
            if batch.is_empty() {
                break;
            }
            batches.push(batch);
        }

        driver::train(&mut estimator, &batches)?;
        let transformer = estimator.create_transformer()?;
        let mut writer = ArchiveWriter::new();
        transformer.save(&mut writer)?;
        Ok(writer.into_bytes())
    }
}

struct Transform<'a> {
    archive: &'a [u8],
    rows: Value,
}

impl EstimatorVisitor for Transform<'_> {
    type Output = Vec<Value>;

    fn visit<E>(self, estimator: E) -> anyhow::Result<Vec<Value>>
    where
        E: TransformerEstimator,
        E::Input: DeserializeOwned,
        <E::Transformer as Transformer>::Output: Serialize,
    {
        let rows: Vec<E::Input> =
            serde_json::from_value(self.rows).context("Failed to parse input rows")?;

        let mut reader = ArchiveReader::new(self.archive);
        let mut transformer = estimator.load_transformer(&mut reader)?;
        reader.finish()?;

        driver::transform(&mut transformer, &rows)?
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()
            .context("Failed to encode transformed rows")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn batch_size(size: usize) -> NonZeroUsize {
        NonZeroUsize::new(size).unwrap()
    }

    #[test]
    fn test_mean_imputer() {
        let config = FeaturizerConfig::MeanImputer;
        let archive = fit(&config, json!([10, 20, null, 30, 40, null]), batch_size(4)).unwrap();
        let outputs = transform(&config, &archive, json!([null, 1, 2, 3, null])).unwrap();
        assert_eq!(outputs, vec![json!(25.0), json!(1.0), json!(2.0), json!(3.0), json!(25.0)]);
    }

    #[test]
    fn test_mode_imputer() {
        let config = FeaturizerConfig::ModeImputer;
        let archive = fit(&config, json!(["a", "b", null, "b"]), batch_size(1)).unwrap();
        let outputs = transform(&config, &archive, json!([null, "c"])).unwrap();
        assert_eq!(outputs, vec![json!("b"), json!("c")]);
    }

    #[test]
    fn test_rolling_window() {
        let config: FeaturizerConfig = serde_json::from_value(json!({
            "kind": "simple_rolling_window",
            "calculation": "Max",
            "horizon": 1,
            "max_window_size": 1,
        }))
        .unwrap();
        let archive = fit(&config, json!([[["a"], 0.0]]), batch_size(8)).unwrap();
        let outputs =
            transform(&config, &archive, json!([[["a"], 1.0], [["a"], 2.0], [["a"], 3.0]]))
                .unwrap();
        assert_eq!(outputs, vec![json!([null]), json!([1.0]), json!([2.0])]);
    }

    #[test]
    fn test_empty_training_data() {
        let err = fit(&FeaturizerConfig::MeanImputer, json!([]), batch_size(1)).unwrap_err();
        assert!(err.to_string().contains("at least one row"));
    }

    #[test]
    fn test_wrong_row_type() {
        let err = fit(&FeaturizerConfig::ModeImputer, json!([1, 2]), batch_size(1)).unwrap_err();
        assert!(err.to_string().contains("training rows"));
    }
}
