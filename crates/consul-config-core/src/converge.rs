//! Plan and apply
//!
//! [`Plan::build`] assembles and validates every declared resource before
//! anything touches disk, so one bad check aborts the whole run. [`apply`]
//! then converges each file and fires the reload signal at most once.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

use crate::error::{ConfigError, Result};
use crate::manifest::Manifest;
use crate::reload::{ReloadHandle, ReloadSignal};
use crate::resources::{AssembleOptions, Resource, ResourceKind};
use crate::writer::{ConfigFile, ConfigWriter, Ensure, FileAction, WriteOutcome};

/// One assembled file with the resource it came from
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFile {
    pub kind: ResourceKind,
    pub title: String,
    pub file: ConfigFile,
}

/// Validated set of files to converge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    files: Vec<PlannedFile>,
}

impl Plan {
    /// Assemble every resource in `manifest`, failing on the first invalid one
    pub fn build(manifest: &Manifest, options: &AssembleOptions) -> Result<Self> {
        let mut plan = Plan::default();
        for (title, resource) in manifest.resources() {
            plan.push(resource, title, options)?;
        }

        Ok(plan)
    }

    /// Assemble every resource, collecting every failure instead of
    /// stopping at the first. Empty when [`Plan::build`] would succeed.
    pub fn validate(manifest: &Manifest, options: &AssembleOptions) -> Vec<ConfigError> {
        let mut plan = Plan::default();
        manifest
            .resources()
            .into_iter()
            .filter_map(|(title, resource)| plan.push(resource, title, options).err())
            .collect()
    }

    fn push(&mut self, resource: &dyn Resource, title: &str, options: &AssembleOptions) -> Result<()> {
        let file = resource.to_config_file(title, options)?;
        let file_name = file.file_name();

        if let Some(other) = self.files.iter().find(|p| p.file.file_name() == file_name) {
            return Err(ConfigError::DuplicateFile {
                file: file_name,
                first: format!("{}/{}", other.kind, other.title),
                second: format!("{}/{}", resource.kind(), title),
            });
        }

        self.files.push(PlannedFile {
            kind: resource.kind(),
            title: title.to_string(),
            file,
        });
        Ok(())
    }

    pub fn files(&self) -> &[PlannedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// File names that should exist after apply
    pub fn managed_file_names(&self) -> BTreeSet<String> {
        self.files
            .iter()
            .filter(|p| p.file.ensure == Ensure::Present)
            .map(|p| p.file.file_name())
            .collect()
    }

    /// What apply would do, without writing anything
    pub fn preview(&self, writer: &ConfigWriter, options: &ApplyOptions) -> Result<Vec<WriteOutcome>> {
        let mut outcomes = self
            .files
            .iter()
            .map(|p| writer.plan(&p.file))
            .collect::<Result<Vec<_>>>()?;

        if options.purge {
            // Absent files are already reported by their own outcome.
            let planned: BTreeSet<String> = self.files.iter().map(|p| p.file.file_name()).collect();
            for (file_name, path) in writer.unmanaged_files(&planned)? {
                outcomes.push(WriteOutcome {
                    name: file_name.trim_end_matches(".json").to_string(),
                    path,
                    action: FileAction::Removed,
                    digest: None,
                    sensitive: false,
                });
            }
        }

        Ok(outcomes)
    }
}

/// Apply-time switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Remove unmanaged `*.json` files from the directory
    pub purge: bool,
}

/// Outcome of one apply run
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub outcomes: Vec<WriteOutcome>,
    pub reloaded: bool,
    pub applied_at: DateTime<Utc>,
}

impl ApplyReport {
    /// Files whose contents changed on disk
    pub fn changed(&self) -> impl Iterator<Item = &WriteOutcome> {
        self.outcomes.iter().filter(|o| o.action.is_change())
    }

    pub fn changed_count(&self) -> usize {
        self.changed().count()
    }
}

/// Converge every planned file, then reload once if anything asked for it
pub fn apply(
    plan: &Plan,
    writer: &ConfigWriter,
    reload: &dyn ReloadHandle,
    options: &ApplyOptions,
) -> Result<ApplyReport> {
    let mut signal = ReloadSignal::new();
    let mut outcomes = Vec::with_capacity(plan.len());

    for planned in plan.files() {
        outcomes.push(writer.write_config(&planned.file, &mut signal)?);
    }

    if options.purge {
        outcomes.extend(writer.purge_unmanaged(&plan.managed_file_names(), &mut signal)?);
    }

    let reloaded = signal.fire(reload)?;

    let report = ApplyReport {
        outcomes,
        reloaded,
        applied_at: Utc::now(),
    };
    info!(
        dir = %writer.dir().display(),
        files = report.outcomes.len(),
        changed = report.changed_count(),
        reloaded = report.reloaded,
        "apply finished"
    );
    Ok(report)
}
