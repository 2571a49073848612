//! Reload signalling
//!
//! Writers request a reload whenever a file flagged `reload_on_change`
//! actually changes. Requests are coalesced: one apply run fires the
//! reload action at most once, however many files changed.

use std::process::Command;
use tracing::{debug, info};

use crate::error::{ConfigError, Result};

/// Something that asks the running agent to re-read its configuration
#[cfg_attr(test, mockall::automock)]
pub trait ReloadHandle {
    /// Perform the reload. `reasons` lists the changed files.
    fn reload(&self, reasons: &[String]) -> Result<()>;
}

/// Runs an external command, `consul reload` by default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReload {
    program: String,
    args: Vec<String>,
}

impl Default for CommandReload {
    fn default() -> Self {
        Self {
            program: "consul".to_string(),
            args: vec!["reload".to_string()],
        }
    }
}

impl CommandReload {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from an argv list; the first element is the program
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        match argv.split_first() {
            Some((program, args)) if !program.is_empty() => Ok(Self::new(program.clone(), args.to_vec())),
            _ => Err(ConfigError::invalid_input("reload command must not be empty")),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl ReloadHandle for CommandReload {
    fn reload(&self, reasons: &[String]) -> Result<()> {
        info!(
            program = %self.program,
            changed = reasons.len(),
            "reloading agent configuration"
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| {
                ConfigError::ReloadFailed(format!("failed to run '{}': {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConfigError::ReloadFailed(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Reload action that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReload;

impl ReloadHandle for NoopReload {
    fn reload(&self, reasons: &[String]) -> Result<()> {
        debug!(changed = reasons.len(), "reload skipped (no-op handle)");
        Ok(())
    }
}

/// Pending reload requests for one apply run
#[derive(Debug, Default, Clone)]
pub struct ReloadSignal {
    reasons: Vec<String>,
}

impl ReloadSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `reason` (usually a file name) needs a reload
    pub fn request(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    pub fn is_pending(&self) -> bool {
        !self.reasons.is_empty()
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Invoke `handle` once if anything was requested, then clear.
    ///
    /// Returns whether a reload fired. Requests are kept if the handle
    /// fails so the caller can retry.
    pub fn fire(&mut self, handle: &dyn ReloadHandle) -> Result<bool> {
        if self.reasons.is_empty() {
            return Ok(false);
        }

        handle.reload(&self.reasons)?;
        self.reasons.clear();
        Ok(true)
    }
}
