//! Consul Config Core
//!
//! Renders JSON configuration files for a Consul agent (services, health
//! checks, watches, ACLs and the agent's own settings) and asks the agent to
//! reload when those files change.
//!
//! ## Architecture
//!
//! 1. **Check validation** (`check`): decides which single check type a
//!    health check declares and enforces the `interval` rule for it.
//!
//! 2. **Watch validation** (`watch`): per-type required parameters for
//!    watches.
//!
//! 3. **Resources** (`resources/`): assemble typed parameters into the
//!    documents the agent reads, with defaults and null-dropping.
//!
//! 4. **Rendering** (`render`): sorted-key JSON, compact or pretty, with
//!    secret-aware contents.
//!
//! 5. **Writer** (`writer`) and **reload** (`reload`): converge files on
//!    disk and coalesce reload requests.
//!
//! 6. **Converge** (`converge`): validate a whole manifest, then apply it.
//!
//! ## Example
//!
//! ```rust,no_run
//! use consul_config_core::{apply, ApplyOptions, ConfigWriter, Manifest, NoopReload, Plan, Settings};
//!
//! # fn main() -> consul_config_core::Result<()> {
//! let settings = Settings::default();
//! let manifest = Manifest::from_path("consul.yaml")?;
//!
//! let plan = Plan::build(&manifest, &settings.assemble_options())?;
//! let writer = ConfigWriter::new(&settings.config_dir, settings.json_style());
//! let report = apply(&plan, &writer, &NoopReload, &ApplyOptions::default())?;
//! println!("{} file(s) changed", report.changed_count());
//! # Ok(())
//! # }
//! ```

pub mod check;
pub mod converge;
pub mod error;
pub mod manifest;
pub mod reload;
pub mod render;
pub mod resources;
pub mod settings;
pub mod watch;
pub mod writer;

pub use check::{AliasMode, CheckSpec, CheckType, CheckValidationError, IntervalRule};
pub use converge::{apply, ApplyOptions, ApplyReport, Plan, PlannedFile};
pub use error::{ConfigError, Result};
pub use manifest::{Manifest, ManifestFormat};
pub use reload::{CommandReload, NoopReload, ReloadHandle, ReloadSignal};
pub use render::{file_name_for, render_json, Contents, JsonStyle, MAX_PRETTY_INDENT};
pub use resources::{
    AclDefinition, AgentConfig, AssembleOptions, CheckDefinition, Resource, ResourceKind,
    ServiceDefinition, WatchDefinition,
};
pub use settings::Settings;
pub use watch::WatchValidationError;
pub use writer::{ConfigFile, ConfigWriter, Ensure, FileAction, WriteOutcome};

/// Library version (from Cargo.toml)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
