use std::path::PathBuf;

use tracing::info;

use crate::{featurizer, schema::saved_model::SavedModel, util};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TransformArg {
    /// Model file written by `fit`
    #[arg(long)]
    model: PathBuf,
    /// Rows to transform (JSON array)
    #[arg(long)]
    data: PathBuf,
    /// Output file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &TransformArg) -> anyhow::Result<()> {
    let TransformArg {
        model,
        data,
        output,
    } = arg;

    let model = SavedModel::open(model)?;
    let config = model.config()?;
    info!(
        featurizer = config.estimator_name(),
        trained_at = %model.trained_at,
        "model loaded"
    );

    let rows: serde_json::Value = util::read_json_file("input data", data)?;
    let outputs = featurizer::transform(&config, &model.archive, rows)?;
    info!(rows = outputs.len(), "transformed");

    util::write_json(&outputs, output.as_deref())
}
