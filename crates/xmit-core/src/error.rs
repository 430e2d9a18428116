//! Error types for xmit.
//!
//! Every failure is terminal for a transfer. The variants exist so the
//! command line can name the operation that failed and, where the platform
//! reported one, its numeric error code.

use std::io;
use std::net::SocketAddrV4;

use thiserror::Error;

/// A specialized `Result` type for xmit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for xmit.
#[derive(Error, Debug)]
pub enum Error {
    /// The source file could not be opened
    #[error("failed to open file: {path}: {source}")]
    SourceOpen {
        /// Path that was requested
        path: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The length of a seekable source could not be determined
    #[error("failed to determine size of '{path}': {source}")]
    SizeQuery {
        /// Path of the source
        path: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Port argument is not a valid TCP port
    #[error("invalid port '{0}': expected a number between 1 and 65535")]
    InvalidPort(String),

    /// Name resolution failed
    #[error("failed to resolve '{host}': {source}")]
    Resolve {
        /// Host that was looked up
        host: String,
        /// Resolver diagnostic
        #[source]
        source: io::Error,
    },

    /// Name resolution succeeded but returned no IPv4 address
    #[error("no IPv4 address found for '{0}'")]
    NoIpv4Address(String),

    /// Connecting to the resolved endpoint failed
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Endpoint the connection was attempted against
        addr: SocketAddrV4,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A zero-copy transmit operation failed
    #[error("failed to send file at offset {offset} ({len} bytes): {source}")]
    Transmit {
        /// File offset of the failing chunk
        offset: u64,
        /// Requested chunk length
        len: u64,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The file ended before a transmit request was satisfied
    #[error("source ended early at offset {offset}: expected {expected} more bytes, sent {sent}")]
    ShortTransmit {
        /// File offset of the chunk
        offset: u64,
        /// Bytes requested
        expected: u64,
        /// Bytes actually sent
        sent: u64,
    },

    /// Waiting for a pending transmit to complete failed
    #[error("failed waiting for socket: {0}")]
    Wait(#[source] io::Error),

    /// A buffered send failed
    #[error("failed to send data: {0}")]
    Send(#[source] io::Error),

    /// Reading from the source failed
    #[error("failed to read source: {0}")]
    Read(#[source] io::Error),

    /// Invalid transfer configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidConfig {
        /// Configuration key
        key: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Returns the short name of the operation that failed.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::SourceOpen { .. } => "open",
            Self::SizeQuery { .. } => "stat",
            Self::InvalidPort(_) | Self::InvalidConfig { .. } => "configure",
            Self::Resolve { .. } | Self::NoIpv4Address(_) => "resolve",
            Self::Connect { .. } => "connect",
            Self::Transmit { .. } | Self::ShortTransmit { .. } => "transmit",
            Self::Wait(_) => "wait",
            Self::Send(_) => "send",
            Self::Read(_) => "read",
            Self::Io(_) => "io",
        }
    }

    /// Returns the raw OS error code behind this error, if the platform reported one.
    #[must_use]
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::SourceOpen { source, .. }
            | Self::SizeQuery { source, .. }
            | Self::Resolve { source, .. }
            | Self::Connect { source, .. }
            | Self::Transmit { source, .. } => source.raw_os_error(),
            Self::Wait(e) | Self::Send(e) | Self::Read(e) | Self::Io(e) => e.raw_os_error(),
            Self::InvalidPort(_)
            | Self::NoIpv4Address(_)
            | Self::ShortTransmit { .. }
            | Self::InvalidConfig { .. } => None,
        }
    }
}
