//! Transfer engine for xmit.
//!
//! A [`TransferSession`] owns a connected [`Transport`] and a
//! [`TransferSource`] and moves every byte of the source onto the transport,
//! in order, exactly once.
//!
//! ## Modes
//!
//! The mode is chosen once, from the source variant:
//!
//! - **Chunked**: seekable files are sent with the zero-copy primitive in
//!   requests of at most `chunk_size` bytes. The last request is exactly the
//!   remainder. Requests are sequential, one in flight at a time.
//! - **Buffered**: streams are read through a `buffer_size` buffer and each
//!   non-empty read is sent in full. A zero-length read ends the transfer.
//!
//! Progress is reported once per request. Any error aborts the session; there
//! are no retries.

pub mod zero_copy;

use std::fs::File;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::progress::{ProgressReporter, ProgressSample};
use crate::source::{self, TransferSource};
use crate::{DEFAULT_BUFFER_SIZE, DEFAULT_CHUNK_SIZE, MAX_TRANSMIT_SIZE};

/// Destination of a transfer.
///
/// Both operations block until they have completed in full.
pub trait Transport {
    /// Transmit `len` bytes of `file` starting at `offset`, as one zero-copy request.
    ///
    /// # Errors
    ///
    /// Returns an error if the transmission fails or the file ends before
    /// `len` bytes were sent.
    fn transmit_file(&mut self, file: &File, offset: u64, len: u64) -> Result<()>;

    /// Send every byte of `buf`, continuing across partial writes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Send`] on a hard transport error.
    fn send_all(&mut self, buf: &[u8]) -> Result<()>;
}

/// How a session moves bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Zero-copy requests over a seekable file
    Chunked,
    /// Read-then-send over a stream
    Buffered,
}

/// Configuration for a transfer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    /// Largest zero-copy request, in bytes
    pub chunk_size: u64,
    /// Read buffer for streaming sources, in bytes
    pub buffer_size: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl TransferConfig {
    /// Set the chunk size.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the stream buffer size.
    #[must_use]
    pub const fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Check that both sizes are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for a zero size or a chunk size above
    /// [`MAX_TRANSMIT_SIZE`].
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig {
                key: "chunk_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.chunk_size > MAX_TRANSMIT_SIZE {
            return Err(Error::InvalidConfig {
                key: "chunk_size",
                reason: format!("must not exceed {MAX_TRANSMIT_SIZE} bytes"),
            });
        }
        if self.buffer_size == 0 {
            return Err(Error::InvalidConfig {
                key: "buffer_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Outcome of a successful session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSummary {
    /// Bytes sent
    pub bytes_transferred: u64,
    /// Source length, if it was known up front
    pub total_bytes: Option<u64>,
    /// Time spent in the send loop
    pub elapsed: Duration,
    /// Mode the session ran in
    pub mode: TransferMode,
}

impl TransferSummary {
    /// Final progress sample for this transfer.
    #[must_use]
    pub const fn sample(&self) -> ProgressSample {
        ProgressSample {
            bytes_transferred: self.bytes_transferred,
            total_bytes: self.total_bytes,
            elapsed: self.elapsed,
        }
    }
}

/// One run of the transfer engine.
///
/// The session is consumed by [`TransferSession::run`]; the source is closed
/// when it returns, on success or failure.
#[derive(Debug)]
pub struct TransferSession<T: Transport> {
    transport: T,
    source: TransferSource,
    bytes_transferred: u64,
    chunk_size: u64,
    buffer_size: usize,
    started_at: Instant,
}

impl<T: Transport> TransferSession<T> {
    /// Create a session over a connected transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn new(transport: T, source: TransferSource, config: TransferConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            transport,
            source,
            bytes_transferred: 0,
            chunk_size: config.chunk_size,
            buffer_size: config.buffer_size,
            started_at: Instant::now(),
        })
    }

    /// The mode [`run`](Self::run) will use.
    #[must_use]
    pub const fn mode(&self) -> TransferMode {
        match self.source {
            TransferSource::SeekableFile { .. } => TransferMode::Chunked,
            TransferSource::Stream { .. } => TransferMode::Buffered,
        }
    }

    /// Bytes sent so far.
    #[must_use]
    pub const fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    /// Send the whole source, then hand the transport back for closing.
    ///
    /// # Errors
    ///
    /// Returns the first transmit, send, wait or read error. Nothing is
    /// retried and no further bytes are sent after a failure.
    pub fn run(mut self, progress: &mut dyn ProgressReporter) -> Result<(TransferSummary, T)> {
        let mode = self.mode();
        let total_bytes = self.source.total_size();

        tracing::debug!(
            ?mode,
            ?total_bytes,
            chunk_size = self.chunk_size,
            "Starting transfer"
        );

        self.started_at = Instant::now();
        let started_at = self.started_at;
        let sample_at = move |bytes_transferred: u64| ProgressSample {
            bytes_transferred,
            total_bytes,
            elapsed: started_at.elapsed(),
        };

        match &mut self.source {
            TransferSource::SeekableFile {
                file,
                total_size,
                position,
            } => {
                let total_size = *total_size;
                while self.bytes_transferred < total_size {
                    let remaining = total_size - self.bytes_transferred;
                    let len = remaining.min(self.chunk_size);

                    tracing::trace!(offset = *position, len, "Transmitting chunk");
                    self.transport.transmit_file(file, *position, len)?;

                    *position += len;
                    self.bytes_transferred += len;
                    progress.tick(&sample_at(self.bytes_transferred));
                }
            }
            TransferSource::Stream { reader } => {
                let mut buf = vec![0u8; self.buffer_size];
                loop {
                    let n = source::read_stream(&mut **reader, &mut buf)?;
                    if n == 0 {
                        break;
                    }

                    self.transport.send_all(&buf[..n])?;
                    self.bytes_transferred += n as u64;
                    progress.tick(&sample_at(self.bytes_transferred));
                }
            }
        }

        let summary = TransferSummary {
            bytes_transferred: self.bytes_transferred,
            total_bytes,
            elapsed: self.started_at.elapsed(),
            mode,
        };
        progress.finish(&summary.sample());

        tracing::debug!(
            bytes = summary.bytes_transferred,
            elapsed_ms = summary.elapsed.as_millis(),
            "Transfer complete"
        );

        Ok((summary, self.transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Read};

    #[derive(Debug, Default)]
    struct RecordingTransport {
        transmits: Vec<(u64, u64)>,
        sends: Vec<Vec<u8>>,
        fail_on_call: Option<usize>,
    }

    impl RecordingTransport {
        fn calls(&self) -> usize {
            self.transmits.len() + self.sends.len()
        }

        fn check_failure(&self) -> Result<()> {
            if self.fail_on_call == Some(self.calls()) {
                return Err(Error::Send(io::Error::from(io::ErrorKind::ConnectionReset)));
            }
            Ok(())
        }
    }

    impl Transport for RecordingTransport {
        fn transmit_file(&mut self, _file: &File, offset: u64, len: u64) -> Result<()> {
            self.check_failure()?;
            self.transmits.push((offset, len));
            Ok(())
        }

        fn send_all(&mut self, buf: &[u8]) -> Result<()> {
            self.check_failure()?;
            self.sends.push(buf.to_vec());
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct RecordingProgress {
        ticks: Vec<ProgressSample>,
        finished: Option<ProgressSample>,
    }

    impl ProgressReporter for RecordingProgress {
        fn tick(&mut self, sample: &ProgressSample) {
            self.ticks.push(*sample);
        }

        fn finish(&mut self, sample: &ProgressSample) {
            assert!(self.finished.is_none(), "finish called twice");
            self.finished = Some(*sample);
        }
    }

    /// Yields `reads` blocks of `block` bytes, then end-of-stream.
    struct BlockReader {
        reads: usize,
        block: usize,
        next: u8,
    }

    impl Read for BlockReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.reads == 0 {
                return Ok(0);
            }
            self.reads -= 1;
            let n = self.block.min(buf.len());
            buf[..n].fill(self.next);
            self.next = self.next.wrapping_add(1);
            Ok(n)
        }
    }

    fn sized_source(len: u64) -> TransferSource {
        let file = tempfile::tempfile().expect("create temp file");
        file.set_len(len).expect("set length");
        TransferSource::from_file(file).expect("wrap file")
    }

    fn run_with(
        source: TransferSource,
        config: TransferConfig,
    ) -> (TransferSummary, RecordingTransport, RecordingProgress) {
        let session =
            TransferSession::new(RecordingTransport::default(), source, config).expect("session");
        let mut progress = RecordingProgress::default();
        let (summary, transport) = session.run(&mut progress).expect("run");
        (summary, transport, progress)
    }

    #[test]
    fn test_default_config() {
        let config = TransferConfig::default();
        assert_eq!(config.chunk_size, 2_097_152);
        assert_eq!(config.buffer_size, 65_536);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero_and_oversized_chunks() {
        let zero = TransferConfig::default().with_chunk_size(0);
        assert!(matches!(
            zero.validate(),
            Err(Error::InvalidConfig { key: "chunk_size", .. })
        ));

        let huge = TransferConfig::default().with_chunk_size(MAX_TRANSMIT_SIZE + 1);
        assert!(huge.validate().is_err());

        let max = TransferConfig::default().with_chunk_size(MAX_TRANSMIT_SIZE);
        assert!(max.validate().is_ok());

        let no_buffer = TransferConfig::default().with_buffer_size(0);
        assert!(matches!(
            no_buffer.validate(),
            Err(Error::InvalidConfig { key: "buffer_size", .. })
        ));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = TransferSession::new(
            RecordingTransport::default(),
            sized_source(10),
            TransferConfig::default().with_chunk_size(0),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_mode_selected_from_source() {
        let session = TransferSession::new(
            RecordingTransport::default(),
            sized_source(1),
            TransferConfig::default(),
        )
        .unwrap();
        assert_eq!(session.mode(), TransferMode::Chunked);

        let session = TransferSession::new(
            RecordingTransport::default(),
            TransferSource::stream(io::empty()),
            TransferConfig::default(),
        )
        .unwrap();
        assert_eq!(session.mode(), TransferMode::Buffered);
        assert_eq!(session.bytes_transferred(), 0);
    }

    #[test]
    fn test_five_megabyte_file_in_three_chunks() {
        let (summary, transport, progress) =
            run_with(sized_source(5_000_000), TransferConfig::default());

        assert_eq!(
            transport.transmits,
            vec![
                (0, 2_097_152),
                (2_097_152, 2_097_152),
                (4_194_304, 805_696)
            ]
        );
        assert!(transport.sends.is_empty());
        assert_eq!(summary.bytes_transferred, 5_000_000);
        assert_eq!(summary.mode, TransferMode::Chunked);

        let last = progress.finished.expect("finished");
        assert_eq!(last.percentage(), Some(100.0));
        assert!(last.render().contains("[100.00%]"));
    }

    #[test]
    fn test_chunk_count_and_sizes_match_source() {
        let chunk = 4096u64;
        for size in [1, chunk - 1, chunk, chunk + 1, 3 * chunk, 10 * chunk + 17] {
            let (summary, transport, _) =
                run_with(sized_source(size), TransferConfig::default().with_chunk_size(chunk));

            assert_eq!(transport.transmits.len() as u64, size.div_ceil(chunk));
            assert_eq!(transport.transmits.iter().map(|(_, len)| len).sum::<u64>(), size);
            assert!(transport.transmits.iter().all(|(_, len)| *len > 0 && *len <= chunk));
            assert_eq!(summary.bytes_transferred, size);
        }
    }

    #[test]
    fn test_offsets_are_contiguous() {
        let (_, transport, _) = run_with(
            sized_source(10_000),
            TransferConfig::default().with_chunk_size(3000),
        );

        let mut expected_offset = 0;
        for (offset, len) in &transport.transmits {
            assert_eq!(*offset, expected_offset);
            expected_offset += len;
        }
        assert_eq!(transport.transmits.last(), Some(&(9000, 1000)));
    }

    #[test]
    fn test_empty_file_sends_nothing_and_completes() {
        let (summary, transport, progress) = run_with(sized_source(0), TransferConfig::default());

        assert_eq!(transport.calls(), 0);
        assert!(progress.ticks.is_empty());
        assert_eq!(summary.bytes_transferred, 0);
        assert_eq!(progress.finished.unwrap().percentage(), Some(100.0));
    }

    #[test]
    fn test_progress_monotonic_and_reaches_completion() {
        let (_, _, progress) = run_with(
            sized_source(1_000_000),
            TransferConfig::default().with_chunk_size(65_536),
        );

        assert_eq!(progress.ticks.len(), 16);
        let percentages: Vec<f64> = progress
            .ticks
            .iter()
            .map(|s| s.percentage().unwrap())
            .collect();
        assert!(percentages.windows(2).all(|w| w[0] <= w[1]));
        assert!(progress
            .ticks
            .windows(2)
            .all(|w| w[0].bytes_transferred < w[1].bytes_transferred));
        assert_eq!(percentages.last(), Some(&100.0));
    }

    #[test]
    fn test_stream_ten_reads_then_eof() {
        let reader = BlockReader {
            reads: 10,
            block: 64 * 1024,
            next: 0,
        };
        let (summary, transport, progress) =
            run_with(TransferSource::stream(reader), TransferConfig::default());

        assert_eq!(transport.sends.len(), 10);
        assert!(transport.transmits.is_empty());
        assert!(transport.sends.iter().all(|s| s.len() == 64 * 1024));
        assert_eq!(transport.sends[3][0], 3);
        assert_eq!(summary.bytes_transferred, 655_360);
        assert_eq!(summary.total_bytes, None);
        assert_eq!(summary.mode, TransferMode::Buffered);
        assert!(progress.ticks.iter().all(|s| s.percentage().is_none()));
        assert!(progress.finished.unwrap().percentage().is_none());
    }

    #[test]
    fn test_stream_sends_exactly_what_was_read() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let (_, transport, _) = run_with(
            TransferSource::stream(io::Cursor::new(data.clone())),
            TransferConfig::default().with_buffer_size(4096),
        );

        assert_eq!(
            transport.sends.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![4096, 4096, 1808]
        );
        assert_eq!(transport.sends.concat(), data);
    }

    #[test]
    fn test_empty_stream_sends_nothing() {
        let (summary, transport, progress) =
            run_with(TransferSource::stream(io::empty()), TransferConfig::default());

        assert_eq!(transport.calls(), 0);
        assert_eq!(summary.bytes_transferred, 0);
        assert!(progress.finished.is_some());
    }

    #[test]
    fn test_transmit_failure_aborts_without_retry() {
        let transport = RecordingTransport {
            fail_on_call: Some(1),
            ..Default::default()
        };
        let session = TransferSession::new(
            transport,
            sized_source(10_000),
            TransferConfig::default().with_chunk_size(1000),
        )
        .unwrap();

        let mut progress = RecordingProgress::default();
        let err = session.run(&mut progress).unwrap_err();

        assert!(matches!(err, Error::Send(_)));
        assert_eq!(progress.ticks.len(), 1);
        assert!(progress.finished.is_none());
    }

    #[test]
    fn test_stream_read_error_is_fatal() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::InvalidData))
            }
        }

        let session = TransferSession::new(
            RecordingTransport::default(),
            TransferSource::stream(Broken),
            TransferConfig::default(),
        )
        .unwrap();

        let err = session.run(&mut RecordingProgress::default()).unwrap_err();
        assert!(matches!(err, Error::Read(_)));
    }
}
