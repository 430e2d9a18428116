//! Transfer sources.
//!
//! A source is either a regular file of known length, which the engine can
//! hand to the zero-copy path chunk by chunk, or a stream of unknown length
//! that has to be read through a buffer until it reports end-of-stream.
//!
//! The marker [`STDIN_MARKER`](crate::STDIN_MARKER) always selects standard
//! input as a stream, even when stdin is redirected from a regular file.
//! Handles are closed when the source is dropped.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{Error, Result};
use crate::STDIN_MARKER;

/// Where the bytes of a transfer come from.
pub enum TransferSource {
    /// Regular file whose length was fixed when it was opened.
    SeekableFile {
        /// Open read-only handle
        file: File,
        /// Exact length in bytes
        total_size: u64,
        /// Offset of the next byte to transmit
        position: u64,
    },
    /// Sequential reader of unknown length.
    Stream {
        /// The underlying reader
        reader: Box<dyn Read>,
    },
}

impl TransferSource {
    /// Open a source from a command-line path, or stdin for `-`.
    ///
    /// Regular files become [`TransferSource::SeekableFile`] with their size
    /// cached. Pipes, character devices and sockets named by path become
    /// streams, since their metadata length is meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceOpen`] if the file cannot be opened or is a
    /// directory, and [`Error::SizeQuery`] if its metadata cannot be read.
    pub fn open(path: &str) -> Result<Self> {
        if path == STDIN_MARKER {
            tracing::debug!("Reading from standard input");
            return Ok(Self::stream(io::stdin()));
        }

        let file = File::open(Path::new(path)).map_err(|source| Error::SourceOpen {
            path: path.to_string(),
            source,
        })?;

        let metadata = file.metadata().map_err(|source| Error::SizeQuery {
            path: path.to_string(),
            source,
        })?;

        if metadata.is_dir() {
            return Err(Error::SourceOpen {
                path: path.to_string(),
                source: io::Error::from(io::ErrorKind::IsADirectory),
            });
        }

        if !metadata.is_file() {
            tracing::debug!("'{}' is not a regular file, streaming it", path);
            return Ok(Self::stream(file));
        }

        tracing::debug!("Opened '{}' ({} bytes)", path, metadata.len());
        Ok(Self::SeekableFile {
            file,
            total_size: metadata.len(),
            position: 0,
        })
    }

    /// Wrap an already-open regular file, caching its current length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SizeQuery`] if the file's metadata cannot be read.
    pub fn from_file(file: File) -> Result<Self> {
        let total_size = file
            .metadata()
            .map_err(|source| Error::SizeQuery {
                path: "<file>".to_string(),
                source,
            })?
            .len();

        Ok(Self::SeekableFile {
            file,
            total_size,
            position: 0,
        })
    }

    /// Wrap any reader as a stream source.
    pub fn stream<R: Read + 'static>(reader: R) -> Self {
        Self::Stream {
            reader: Box::new(reader),
        }
    }

    /// Total length, if known up front.
    #[must_use]
    pub const fn total_size(&self) -> Option<u64> {
        match self {
            Self::SeekableFile { total_size, .. } => Some(*total_size),
            Self::Stream { .. } => None,
        }
    }

    /// Whether this source goes through the zero-copy path.
    #[must_use]
    pub const fn is_seekable(&self) -> bool {
        matches!(self, Self::SeekableFile { .. })
    }
}

impl fmt::Debug for TransferSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SeekableFile {
                total_size,
                position,
                ..
            } => f
                .debug_struct("SeekableFile")
                .field("total_size", total_size)
                .field("position", position)
                .finish_non_exhaustive(),
            Self::Stream { .. } => f.debug_struct("Stream").finish_non_exhaustive(),
        }
    }
}

/// Read once from a stream source, folding the expected pipe conditions.
///
/// `Interrupted` is retried. `BrokenPipe` means the producer went away and is
/// reported as end-of-stream (`Ok(0)`).
pub(crate) fn read_stream(reader: &mut dyn Read, buf: &mut [u8]) -> Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!("Source pipe closed by writer, treating as end of stream");
                return Ok(0);
            }
            Err(e) => return Err(Error::Read(e)),
        }
    }
}
