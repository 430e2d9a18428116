//! # xmit Core Library
//!
//! `xmit-core` moves the contents of a file, or of standard input, onto a
//! connected TCP socket while reporting progress.
//!
//! ## Features
//!
//! - **Zero-copy transfers**: regular files go out through `sendfile(2)` on Linux
//! - **Chunked transmission**: files larger than one transmit call are split deterministically
//! - **Streaming sources**: pipes and stdin are relayed through a fixed buffer
//! - **Live progress**: percentage and average throughput, one tick per chunk
//!
//! ## Modules
//!
//! - [`connection`] - Address resolution and the TCP connection lifecycle
//! - [`error`] - Error type shared by every operation
//! - [`progress`] - Progress samples and console rendering
//! - [`source`] - Seekable file and stream sources
//! - [`transfer`] - The transfer engine
//!
//! ## Example
//!
//! ```rust,no_run
//! use xmit_core::connection::{resolve, Connection};
//! use xmit_core::progress::ConsoleProgress;
//! use xmit_core::source::TransferSource;
//! use xmit_core::transfer::{TransferConfig, TransferSession};
//!
//! # fn main() -> xmit_core::Result<()> {
//! let addr = resolve("backup.local", "9000")?;
//! let connection = Connection::connect(addr)?;
//! let source = TransferSource::open("disk.img")?;
//!
//! let session = TransferSession::new(connection, source, TransferConfig::default())?;
//! let mut progress = ConsoleProgress::stdout();
//! let (summary, connection) = session.run(&mut progress)?;
//! connection.close()?;
//! println!("sent {} bytes", summary.bytes_transferred);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod connection;
pub mod error;
pub mod progress;
pub mod source;
pub mod transfer;

pub use error::{Error, Result};

/// Source argument that selects standard input
pub const STDIN_MARKER: &str = "-";

/// Default chunk size for zero-copy transmission (2 MiB)
pub const DEFAULT_CHUNK_SIZE: u64 = 2 * 1024 * 1024;

/// Largest request a single transmit call accepts (Linux `sendfile` ceiling)
pub const MAX_TRANSMIT_SIZE: u64 = 0x7fff_f000;

/// Default read buffer for streaming sources (64 KiB)
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;
