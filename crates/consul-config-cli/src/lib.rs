//! consul-config CLI library
//!
//! The binary is a thin wrapper: parse arguments, install logging, then
//! [`run_cli`] and exit with the returned code.
//!
//! ```rust,no_run
//! use clap::Parser;
//! use consul_config_cli::{init_tracing, run_cli, ConsulConfigCli};
//!
//! fn main() {
//!     let cli = ConsulConfigCli::parse();
//!     init_tracing(cli.verbose, cli.quiet, cli.log_json);
//!     let exit_code = run_cli(cli);
//!     std::process::exit(exit_code.into());
//! }
//! ```

pub mod cli;

pub use cli::{Commands, ConsulConfigCli, ExitCode, OutputFormat};

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// Logs go to stderr so structured command output on stdout stays clean.
/// `RUST_LOG` directives are honoured; `-v` flags raise the default level.
pub fn init_tracing(verbose: u8, quiet: bool, json: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Run a parsed command line, reporting errors on stderr
pub fn run_cli(cli: ConsulConfigCli) -> ExitCode {
    match cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from_error(&e)
        }
    }
}
