//! consul-config
//!
//! Render Consul agent configuration and reload the agent on change.
//!
//! # Usage
//!
//! ```bash
//! # Check a manifest without writing anything
//! consul-config validate --manifest consul.yaml
//!
//! # Validate a file of health checks, rejecting a lone alias field
//! consul-config --strict validate --checks checks.json
//!
//! # Show what would change, then apply
//! consul-config --config-dir /etc/consul.d plan -m consul.yaml
//! consul-config --config-dir /etc/consul.d --pretty apply -m consul.yaml --purge
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Validation failed
//! - 3: Invalid input or arguments
//! - 4: File not found or inaccessible
//! - 10: Internal error (including a failed reload)

use clap::Parser;
use consul_config_cli::{init_tracing, run_cli, ConsulConfigCli};

fn main() {
    let cli = ConsulConfigCli::parse();
    init_tracing(cli.verbose, cli.quiet, cli.log_json);

    let exit_code = run_cli(cli);
    std::process::exit(exit_code.into());
}
