//! CLI module for consul-config
//!
//! Argument parsing, command execution and result formatting.

pub mod commands;
pub mod output;

pub use commands::{Commands, ConsulConfigCli, ManifestArgs};
pub use output::{OutputFormat, ValidationOutput};

use consul_config_core::ConfigError;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful execution
    Success = 0,
    /// One or more definitions failed validation
    ValidationError = 1,
    /// Invalid input or arguments
    InvalidInput = 3,
    /// File not found or inaccessible
    FileError = 4,
    /// Internal error, including a failed reload
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Determine exit code from validation result
    pub fn from_validation_result(has_errors: bool) -> Self {
        if has_errors {
            ExitCode::ValidationError
        } else {
            ExitCode::Success
        }
    }

    /// Exit code for a failed command
    pub fn from_error(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<ConfigError>() {
            Some(e) if e.is_validation_error() => ExitCode::ValidationError,
            Some(ConfigError::FileError(_)) => ExitCode::FileError,
            Some(e) if e.is_user_error() => ExitCode::InvalidInput,
            _ => ExitCode::InternalError,
        }
    }
}

/// Run the CLI with the given arguments and return the exit code
pub fn run(cli: ConsulConfigCli) -> anyhow::Result<ExitCode> {
    let settings = cli.load_settings()?;
    let format = cli.format;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Validate { manifest, checks } => {
            commands::execute_validate(manifest, checks, &settings, format)
        }
        Commands::Render {
            manifest,
            name,
            show_secrets,
        } => commands::execute_render(manifest, name, show_secrets, &settings, format),
        Commands::Plan { manifest, purge } => {
            commands::execute_plan(manifest, purge, &settings, format, quiet)
        }
        Commands::Apply {
            manifest,
            purge,
            no_reload,
        } => commands::execute_apply(manifest, purge, no_reload, &settings, format, quiet),
    }
}
