//! xmit CLI - transmit a file through a socket
//!
//! Sends a file, or standard input, to a TCP listener and shows progress.
//!
//! ## Quick Start
//!
//! ```bash
//! # Send a file
//! xmit ./disk.img backup.local 9000
//!
//! # Send the output of another program
//! tar c ./photos | xmit - 192.168.1.20 9000
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

use std::process::ExitCode;

use clap::Parser;

mod commands;

use commands::Cli;

/// Filter used when no other is configured.
const DEFAULT_LOG_FILTER: &str = "warn";

fn main() -> ExitCode {
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            tracing::debug!("Argument parsing failed: {}", e);
            commands::print_usage(&program_name());
            return ExitCode::FAILURE;
        }
    };

    if !cli.extra.is_empty() {
        tracing::debug!("Ignoring extra arguments: {:?}", cli.extra);
    }

    match commands::transmit::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(core) = e.downcast_ref::<xmit_core::Error>() {
                tracing::debug!(
                    operation = core.operation(),
                    os_code = ?core.os_code(),
                    "Transfer aborted"
                );
            }
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn program_name() -> String {
    std::env::args()
        .next()
        .unwrap_or_else(|| env!("CARGO_BIN_NAME").to_string())
}

/// Diagnostics go to stderr so they never mix with the progress line.
///
/// Development builds honour `RUST_LOG`; release builds always use the default filter.
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if cfg!(debug_assertions) {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    } else {
        EnvFilter::new(DEFAULT_LOG_FILTER)
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}
