//! CLI argument definitions and usage text.

use clap::Parser;

pub mod transmit;

/// xmit - transmit a file through a socket
///
/// Every argument is positional: `--help` and `--version` are not flags, and
/// arguments after the third are ignored.
#[derive(Parser, Debug)]
#[command(name = "xmit")]
#[command(about, long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// The full path to file to be transmitted or '-' for stdin
    #[arg(allow_hyphen_values = true)]
    pub file: String,

    /// Hostname or IPv4 address of target
    #[arg(allow_hyphen_values = true)]
    pub host: String,

    /// Service port target is listening on
    #[arg(allow_hyphen_values = true)]
    pub port: String,

    /// Ignored
    #[arg(hide = true, num_args = 0.., allow_hyphen_values = true)]
    pub extra: Vec<String>,
}

/// Build the usage text shown when arguments are missing.
pub fn usage(program: &str) -> String {
    format!(
        "transmit a file through a socket.\n\
         \n\
         usage: {program} <file> <host> <port>\n\
         \n\
         where\n\
         \n\
         <file>\tthe full path to file to be transmitted or '-' for stdin\n\
         <host>\thostname or ipv4 address of target\n\
         <port>\tservice port target is listening on\n"
    )
}

/// Print the usage text to stdout.
pub fn print_usage(program: &str) {
    print!("{}", usage(program));
}
