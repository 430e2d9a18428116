//! Transmit command implementation.
//!
//! Resolves the target, connects, opens the source and runs one transfer
//! session with progress on stdout.

use anyhow::Result;

use xmit_core::connection::{resolve, Connection};
use xmit_core::progress::ConsoleProgress;
use xmit_core::source::TransferSource;
use xmit_core::transfer::{TransferConfig, TransferSession};

use super::Cli;

/// Run the transfer described by `args`.
pub fn run(args: &Cli) -> Result<()> {
    let addr = resolve(&args.host, &args.port)?;

    let connection = Connection::connect(addr)?;
    let source = TransferSource::open(&args.file)?;

    let session = TransferSession::new(connection, source, TransferConfig::default())?;
    tracing::debug!(
        "Sending '{}' to {} ({:?})",
        args.file,
        addr,
        session.mode()
    );

    let mut progress = ConsoleProgress::stdout();
    let (summary, connection) = session.run(&mut progress)?;
    connection.close()?;

    tracing::debug!(
        "Sent {} bytes in {:.2}s",
        summary.bytes_transferred,
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}
