//! Read access to the source export archive.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::Result;

/// Source archive with lookups by entry path.
pub struct SourceArchive<R: Read + Seek> {
    zip: ZipArchive<R>,
}

impl SourceArchive<BufReader<File>> {
    /// Open an archive on disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or is not a zip archive.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> SourceArchive<R> {
    /// Wrap a reader positioned anywhere in a zip archive.
    ///
    /// # Errors
    /// Returns an error if the reader does not hold a zip archive.
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            zip: ZipArchive::new(reader)?,
        })
    }

    /// Whether an entry exists.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.zip.index_for_name(path).is_some()
    }

    /// Read an entry's bytes. Returns `None` if there is no such entry.
    ///
    /// # Errors
    /// Returns an error if the entry exists but cannot be read.
    pub fn read_bytes(&mut self, path: &str) -> Result<Option<Vec<u8>>> {
        let mut entry = match self.zip.by_name(path) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or_default());
        entry.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }

    /// Read an entry as text.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    ///
    /// # Errors
    /// Returns an error if the entry exists but cannot be read.
    pub fn read_string(&mut self, path: &str) -> Result<Option<String>> {
        Ok(self.read_bytes(path)?.map(|bytes| {
            String::from_utf8(bytes).unwrap_or_else(|e| {
                tracing::warn!(entry = %path, "Entry is not valid UTF-8, replacing invalid bytes");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            })
        }))
    }
}
