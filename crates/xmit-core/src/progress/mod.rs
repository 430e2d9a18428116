//! Progress reporting.
//!
//! The engine produces a [`ProgressSample`] after every chunk (or every send
//! for streams) and hands it to a [`ProgressReporter`]. Samples are derived
//! values; nothing here feeds back into the transfer.

use std::io::{self, Write};
use std::time::Duration;

/// Bytes per displayed megabyte.
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A snapshot of transfer state at one reporting tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    /// Bytes on the socket so far
    pub bytes_transferred: u64,
    /// Total source length, when known
    pub total_bytes: Option<u64>,
    /// Wall-clock time since the transfer started
    pub elapsed: Duration,
}

impl ProgressSample {
    /// Percentage complete (0.0 - 100.0), or `None` for sources of unknown length.
    ///
    /// An empty source is reported as complete.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        let total = self.total_bytes?;
        if total == 0 {
            return Some(100.0);
        }
        let remaining = total.saturating_sub(self.bytes_transferred);
        Some(100.0 * (1.0 - remaining as f64 / total as f64))
    }

    /// Average throughput in megabytes per second; zero before any time has elapsed.
    #[must_use]
    pub fn throughput_mb_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            to_mb(self.bytes_transferred) / secs
        } else {
            0.0
        }
    }

    /// Render the one-line progress text, without any line control characters.
    #[must_use]
    pub fn render(&self) -> String {
        let transferred = to_mb(self.bytes_transferred);
        let speed = self.throughput_mb_per_sec();

        match (self.total_bytes, self.percentage()) {
            (Some(total), Some(pct)) => format!(
                "Transferred {transferred:.2} Mb of {:.2} Mb [{pct:.2}%] at avg {speed:.2} Mb/s",
                to_mb(total)
            ),
            _ => format!("Transferred {transferred:.2} Mb at avg {speed:.2} Mb/s"),
        }
    }
}

fn to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Receiver of progress ticks.
pub trait ProgressReporter {
    /// Called after each transmit or send.
    fn tick(&mut self, sample: &ProgressSample);

    /// Called once after the last byte has been sent.
    fn finish(&mut self, sample: &ProgressSample);
}

/// Reporter that discards all ticks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn tick(&mut self, _sample: &ProgressSample) {}

    fn finish(&mut self, _sample: &ProgressSample) {}
}

/// Reporter that redraws a single line on a terminal-like writer.
///
/// Each tick returns the cursor to the start of the line and overwrites the
/// previous text. `finish` terminates the line so later output starts clean.
/// Write failures are ignored; progress output never fails a transfer.
#[derive(Debug)]
pub struct ConsoleProgress<W: Write> {
    out: W,
    last_len: usize,
}

impl ConsoleProgress<io::Stdout> {
    /// Reporter writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleProgress<W> {
    /// Reporter writing to `out`.
    pub const fn new(out: W) -> Self {
        Self { out, last_len: 0 }
    }

    /// Consume the reporter and return the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn redraw(&mut self, sample: &ProgressSample) {
        let line = sample.render();
        let padding = self.last_len.saturating_sub(line.len());
        self.last_len = line.len();

        let _ = write!(self.out, "\r{line}{}", " ".repeat(padding));
        let _ = self.out.flush();
    }
}

impl<W: Write> ProgressReporter for ConsoleProgress<W> {
    fn tick(&mut self, sample: &ProgressSample) {
        self.redraw(sample);
    }

    fn finish(&mut self, sample: &ProgressSample) {
        self.redraw(sample);
        if let Err(e) = writeln!(self.out).and_then(|()| self.out.flush()) {
            tracing::debug!("Failed to terminate progress line: {}", e);
        }
        self.last_len = 0;
    }
}
