use std::{num::NonZeroUsize, path::PathBuf};

use chrono::Utc;
use featurizer_ops::FeaturizerConfig;
use tracing::info;

use crate::{featurizer, schema::saved_model::SavedModel, util};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct FitArg {
    /// Featurizer configuration (JSON)
    #[arg(long)]
    config: PathBuf,
    /// Training rows (JSON array)
    #[arg(long)]
    data: PathBuf,
    /// Number of rows per training batch
    #[arg(long, default_value = "1024")]
    batch_size: NonZeroUsize,
    /// Output model file path
    #[arg(long)]
    output: PathBuf,
}

pub(crate) fn run(arg: &FitArg) -> anyhow::Result<()> {
    let FitArg {
        config,
        data,
        batch_size,
        output,
    } = arg;

    let config: FeaturizerConfig = util::read_json_file("config", config)?;
    config.validate()?;
    let rows: serde_json::Value = util::read_json_file("training data", data)?;

    info!(featurizer = config.estimator_name(), "training");
    let archive = featurizer::fit(&config, rows, *batch_size)?;

    let model = SavedModel::new(&config, Utc::now(), archive)?;
    model.save(output)?;
    info!(path = %output.display(), bytes = model.archive.len(), "model saved");
    Ok(())
}
