use std::{
    fs::File,
    io::{BufReader, BufWriter, Write as _},
    path::Path,
};

use anyhow::Context;
use chrono::{DateTime, Utc};
use featurizer_ops::FeaturizerConfig;
use serde::{Deserialize, Serialize};

/// Model file: the configuration that was trained plus the saved transformer.
///
/// The configuration is kept as JSON text. Its tagged representation needs a
/// self-describing format, which the `bincode` container is not.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SavedModel {
    pub config: String,
    pub trained_at: DateTime<Utc>,
    pub archive: Vec<u8>,
}

impl SavedModel {
    pub fn new(
        config: &FeaturizerConfig,
        trained_at: DateTime<Utc>,
        archive: Vec<u8>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            config: serde_json::to_string(config).context("Failed to encode configuration")?,
            trained_at,
            archive,
        })
    }

    pub fn config(&self) -> anyhow::Result<FeaturizerConfig> {
        let config: FeaturizerConfig =
            serde_json::from_str(&self.config).context("Failed to decode model configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn open<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open model file: {}", path.display()))?;
        bincode::deserialize_from(BufReader::new(file))
            .with_context(|| format!("Failed to parse model file: {}", path.display()))
    }

    pub fn save<P>(&self, path: P) -> anyhow::Result<()>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create model file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, self)
            .with_context(|| format!("Failed to write model file: {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush model file: {}", path.display()))
    }
}
