//! CLI command definitions for consul-config
//!
//! Validate manifests and check files, print the rendered documents, show
//! what would change in the agent's configuration directory, and apply.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use consul_config_core::resources::strip_nulls;
use consul_config_core::{
    apply, check, ApplyOptions, CheckSpec, ConfigError, ConfigWriter, Manifest, ManifestFormat,
    NoopReload, Plan, ReloadHandle, Settings,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::output::{
    ChangesOutput, FindingOutput, OutputFormat, RenderOutput, RenderedFile, ValidationOutput,
};
use super::ExitCode;

/// Consul agent configuration renderer
///
/// Validates health checks and watches, renders service, check, watch, ACL
/// and agent definitions to JSON, and reloads the agent when they change.
#[derive(Parser, Debug)]
#[command(name = "consul-config")]
#[command(about = "Render and apply Consul agent configuration", long_about = None)]
#[command(version)]
pub struct ConsulConfigCli {
    /// Output verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Settings file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Agent configuration directory
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Pretty-print rendered JSON
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Reject a lone alias_node or alias_service check field
    #[arg(long, global = true)]
    pub strict: bool,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Manifest argument shared by most commands
#[derive(Args, Debug, Clone)]
pub struct ManifestArgs {
    /// Manifest declaring services, checks, watches, ACLs and agent settings
    #[arg(short, long, value_name = "FILE")]
    pub manifest: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a manifest or a file of health checks
    ///
    /// Reports every invalid definition instead of stopping at the first.
    Validate {
        /// Manifest to validate
        #[arg(short, long, value_name = "FILE", required_unless_present = "checks", conflicts_with = "checks")]
        manifest: Option<PathBuf>,

        /// File holding one check, a `{"check": ...}` document or a list of checks
        #[arg(long, value_name = "FILE")]
        checks: Option<PathBuf>,
    },

    /// Print the documents that would be written
    Render {
        #[command(flatten)]
        manifest: ManifestArgs,

        /// Only render the file with this name (e.g. service_web)
        #[arg(short, long)]
        name: Option<String>,

        /// Show sensitive contents instead of redacting them
        #[arg(long)]
        show_secrets: bool,
    },

    /// Show what apply would change, without writing
    Plan {
        #[command(flatten)]
        manifest: ManifestArgs,

        /// Include unmanaged files that apply would remove
        #[arg(long)]
        purge: bool,
    },

    /// Write changed files and reload the agent
    Apply {
        #[command(flatten)]
        manifest: ManifestArgs,

        /// Remove unmanaged *.json files from the directory
        #[arg(long)]
        purge: bool,

        /// Write files but never run the reload command
        #[arg(long)]
        no_reload: bool,
    },
}

impl ConsulConfigCli {
    /// Settings from the settings file, the environment, then flags
    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        self.load_settings_from(std::env::vars())
    }

    /// Like [`load_settings`](Self::load_settings) with explicit environment variables
    pub fn load_settings_from<I>(&self, vars: I) -> anyhow::Result<Settings>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut settings = match &self.settings {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        settings.apply_env_from(consul_config_core::settings::ENV_PREFIX, vars)?;

        if let Some(dir) = &self.config_dir {
            settings.config_dir = dir.clone();
        }
        if self.pretty {
            settings.pretty = true;
        }
        if self.strict {
            settings.strict_alias = true;
        }

        debug!(?settings, "resolved settings");
        Ok(settings)
    }
}

/// Execute the validate command
pub fn execute_validate(
    manifest: Option<PathBuf>,
    checks: Option<PathBuf>,
    settings: &Settings,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let output = match (manifest, checks) {
        (Some(path), _) => validate_manifest(&Manifest::from_path(&path)?, settings),
        (None, Some(path)) => validate_check_file(&path, settings)?,
        (None, None) => {
            return Err(ConfigError::invalid_input("either --manifest or --checks is required").into())
        }
    };

    output.render(format)?;
    Ok(ExitCode::from_validation_result(!output.valid))
}

/// Assemble every resource, collecting all validation failures
pub fn validate_manifest(manifest: &Manifest, settings: &Settings) -> ValidationOutput {
    let findings = Plan::validate(manifest, &settings.assemble_options())
        .iter()
        .map(FindingOutput::from_error)
        .collect();

    ValidationOutput::new(manifest.len(), findings)
}

/// Validate a file of checks: one check, `{"check": ...}`, `{"checks": [...]}` or a list
pub fn validate_check_file(path: &Path, settings: &Settings) -> anyhow::Result<ValidationOutput> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::file_error(format!("Failed to read check file '{}': {}", path.display(), e))
    })?;
    let value = ManifestFormat::from_path(path)?.parse(&content)?;
    let checks = checks_from_value(value)?;
    let mode = settings.alias_mode();

    let findings = checks
        .iter()
        .enumerate()
        .filter_map(|(index, spec)| {
            check::validate_with(strip_nulls(spec.clone()), mode)
                .err()
                .map(|e| FindingOutput::from_check(format!("checks[{}]", index), &e))
        })
        .collect();

    Ok(ValidationOutput::new(checks.len(), findings))
}

fn checks_from_value(value: Value) -> anyhow::Result<Vec<CheckSpec>> {
    let value = match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("check") => {
            map.remove("check").unwrap_or_default()
        }
        Value::Object(mut map) if map.len() == 1 && map.contains_key("checks") => {
            map.remove("checks").unwrap_or_default()
        }
        other => other,
    };

    let items = match value {
        Value::Array(items) => items,
        single @ Value::Object(_) => vec![single],
        _ => {
            return Err(
                ConfigError::invalid_input("check file must hold a mapping or a list of mappings")
                    .into(),
            )
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(spec) => Ok(spec),
            _ => Err(ConfigError::invalid_input(format!("checks[{}] must be a mapping", index)).into()),
        })
        .collect()
}

fn build_plan(manifest: &ManifestArgs, settings: &Settings) -> anyhow::Result<Plan> {
    let loaded = Manifest::from_path(&manifest.manifest)?;
    let plan = Plan::build(&loaded, &settings.assemble_options())?;
    debug!(files = plan.len(), "built plan");
    Ok(plan)
}

/// Execute the render command
pub fn execute_render(
    manifest: ManifestArgs,
    name: Option<String>,
    show_secrets: bool,
    settings: &Settings,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let plan = build_plan(&manifest, settings)?;
    let writer = ConfigWriter::new(&settings.config_dir, settings.json_style());

    let mut files = Vec::new();
    for planned in plan.files() {
        if name.as_deref().is_some_and(|n| n != planned.file.name) {
            continue;
        }
        let contents = writer.render(&planned.file)?;
        files.push(RenderedFile::new(planned, contents.expose(), show_secrets));
    }

    if let Some(name) = &name {
        if files.is_empty() {
            return Err(ConfigError::invalid_input(format!("no resource renders to '{}'", name)).into());
        }
    }

    RenderOutput { files }.render(format)?;
    Ok(ExitCode::Success)
}

/// Execute the plan command
pub fn execute_plan(
    manifest: ManifestArgs,
    purge: bool,
    settings: &Settings,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<ExitCode> {
    let plan = build_plan(&manifest, settings)?;
    let writer = ConfigWriter::new(&settings.config_dir, settings.json_style());
    let options = ApplyOptions {
        purge: purge || settings.purge,
    };

    let outcomes = plan.preview(&writer, &options)?;
    if !quiet {
        ChangesOutput::new(true, settings.config_dir.clone(), &outcomes, None).render(format)?;
    }
    Ok(ExitCode::Success)
}

/// Execute the apply command
pub fn execute_apply(
    manifest: ManifestArgs,
    purge: bool,
    no_reload: bool,
    settings: &Settings,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<ExitCode> {
    let plan = build_plan(&manifest, settings)?;
    let writer = ConfigWriter::new(&settings.config_dir, settings.json_style());
    let options = ApplyOptions {
        purge: purge || settings.purge,
    };

    let command_reload;
    let reload: &dyn ReloadHandle = if no_reload {
        &NoopReload
    } else {
        command_reload = settings.reload_handle()?;
        &command_reload
    };

    let report = apply(&plan, &writer, reload, &options).with_context(|| {
        format!(
            "failed to apply '{}' to {}",
            manifest.manifest.display(),
            settings.config_dir.display()
        )
    })?;
    info!(changed = report.changed_count(), reloaded = report.reloaded, "applied manifest");

    if !quiet {
        ChangesOutput::new(
            false,
            settings.config_dir.clone(),
            &report.outcomes,
            Some(report.reloaded),
        )
        .render(format)?;
    }
    Ok(ExitCode::Success)
}
