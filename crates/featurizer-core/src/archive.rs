//! Byte archives used to persist trained transformers.
//!
//! Values are encoded back to back with `bincode`. Every leaf transformer starts its payload
//! with a `(major, minor)` version tag written by [`ArchiveWriter::write_version`] and
//! checked by [`ArchiveReader::read_version`]. Composite transformers (chains, grains,
//! filters) delegate to the transformers they wrap in a fixed order, so an archive is only
//! readable by a loader that knows the same shape.

use serde::{Serialize, de::DeserializeOwned};

use crate::FeaturizerError;

/// The only archive version this crate writes and reads.
pub const ARCHIVE_VERSION: (u16, u16) = (1, 0);

/// Appends encoded values to an in-memory buffer.
#[derive(Debug, Default)]
pub struct ArchiveWriter {
    buffer: Vec<u8>,
}

impl ArchiveWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write<T>(&mut self, value: &T) -> Result<(), FeaturizerError>
    where
        T: Serialize + ?Sized,
    {
        bincode::serialize_into(&mut self.buffer, value).map_err(FeaturizerError::Archive)
    }

    /// Writes the current `(major, minor)` version tag.
    pub fn write_version(&mut self) -> Result<(), FeaturizerError> {
        let (major, minor) = ARCHIVE_VERSION;
        self.write(&major)?;
        self.write(&minor)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// Reads values back from a byte slice, in the order they were written.
#[derive(Debug, Clone)]
pub struct ArchiveReader<'a> {
    remaining: &'a [u8],
}

impl<'a> ArchiveReader<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { remaining: bytes }
    }

    pub fn read<T>(&mut self) -> Result<T, FeaturizerError>
    where
        T: DeserializeOwned,
    {
        bincode::deserialize_from(&mut self.remaining).map_err(FeaturizerError::Archive)
    }

    /// Reads a version tag and fails unless it matches [`ARCHIVE_VERSION`].
    ///
    /// # Errors
    ///
    /// Returns [`FeaturizerError::UnsupportedArchiveVersion`] for any other version.
    pub fn read_version(&mut self) -> Result<(), FeaturizerError> {
        let major: u16 = self.read()?;
        let minor: u16 = self.read()?;
        if (major, minor) != ARCHIVE_VERSION {
            return Err(FeaturizerError::UnsupportedArchiveVersion { major, minor });
        }
        Ok(())
    }

    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Consumes the reader, failing if any bytes were left unread.
    pub fn finish(self) -> Result<(), FeaturizerError> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(FeaturizerError::TrailingArchiveData)
        }
    }
}

/// Transformers that can be restored from an archive without outside information.
pub trait ArchiveLoad: Sized {
    fn load(reader: &mut ArchiveReader<'_>) -> Result<Self, FeaturizerError>;
}
