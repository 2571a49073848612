//! Config-file writer
//!
//! Converges one JSON file per named resource in the agent's configuration
//! directory. Desired content is rendered, compared with what is on disk,
//! and written only when it differs. Writes replace the whole file through
//! a temporary file in the same directory, so a reader never sees a
//! partial document.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};
use crate::reload::ReloadSignal;
use crate::render::{file_name_for, render_json, Contents, JsonStyle};

/// Whether a file should exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

/// One file to converge
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Resource name; separators are replaced when deriving the path
    pub name: String,
    /// Document to serialize
    pub content: Value,
    pub ensure: Ensure,
    /// Request a reload when the file changes
    pub reload_on_change: bool,
    /// Treat rendered text as a secret
    pub sensitive: bool,
}

impl ConfigFile {
    pub fn new(name: impl Into<String>, content: Value) -> Self {
        Self {
            name: name.into(),
            content,
            ensure: Ensure::Present,
            reload_on_change: true,
            sensitive: false,
        }
    }

    pub fn with_ensure(mut self, ensure: Ensure) -> Self {
        self.ensure = ensure;
        self
    }

    pub fn with_reload_on_change(mut self, reload_on_change: bool) -> Self {
        self.reload_on_change = reload_on_change;
        self
    }

    pub fn with_sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }

    /// File name within the configuration directory
    pub fn file_name(&self) -> String {
        file_name_for(&self.name)
    }
}

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Created,
    Updated,
    Unchanged,
    Removed,
    /// Asked to be absent and already was
    Absent,
}

impl FileAction {
    /// True if the file on disk was modified
    pub fn is_change(&self) -> bool {
        matches!(self, FileAction::Created | FileAction::Updated | FileAction::Removed)
    }
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileAction::Created => "created",
            FileAction::Updated => "updated",
            FileAction::Unchanged => "unchanged",
            FileAction::Removed => "removed",
            FileAction::Absent => "absent",
        };
        f.write_str(label)
    }
}

/// Result of converging one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub name: String,
    pub path: PathBuf,
    pub action: FileAction,
    /// SHA-256 of the desired content (none for absent files)
    pub digest: Option<String>,
    pub sensitive: bool,
}

/// Hex SHA-256 digest of `data`
pub fn content_digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Writes config files into one directory with a fixed JSON style
#[derive(Debug, Clone)]
pub struct ConfigWriter {
    dir: PathBuf,
    style: JsonStyle,
}

impl ConfigWriter {
    pub fn new(dir: impl Into<PathBuf>, style: JsonStyle) -> Self {
        Self {
            dir: dir.into(),
            style,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn style(&self) -> JsonStyle {
        self.style
    }

    /// Path a file will be written to
    pub fn path_for(&self, file: &ConfigFile) -> PathBuf {
        self.dir.join(file.file_name())
    }

    /// Render a file's desired content without touching disk
    pub fn render(&self, file: &ConfigFile) -> Result<Contents> {
        let text = render_json(&file.content, self.style)?;
        Ok(Contents::new(text, file.sensitive))
    }

    /// Work out what [`write_config`](Self::write_config) would do
    pub fn plan(&self, file: &ConfigFile) -> Result<WriteOutcome> {
        self.assess(file).map(|(outcome, _)| outcome)
    }

    // Outcome plus the rendered text for present files, so a write
    // serializes the document once.
    fn assess(&self, file: &ConfigFile) -> Result<(WriteOutcome, Option<Contents>)> {
        let path = self.path_for(file);
        let existing = read_existing(&path)?;

        let (action, digest, contents) = match file.ensure {
            Ensure::Present => {
                let contents = self.render(file)?;
                let desired = contents.expose().as_bytes();
                let action = match existing {
                    None => FileAction::Created,
                    Some(current) if current == desired => FileAction::Unchanged,
                    Some(_) => FileAction::Updated,
                };
                let digest = content_digest(desired);
                (action, Some(digest), Some(contents))
            }
            Ensure::Absent => {
                let action = if existing.is_some() {
                    FileAction::Removed
                } else {
                    FileAction::Absent
                };
                (action, None, None)
            }
        };

        let outcome = WriteOutcome {
            name: file.name.clone(),
            path,
            action,
            digest,
            sensitive: file.sensitive,
        };
        Ok((outcome, contents))
    }

    /// Converge one file, requesting a reload on change when asked to
    pub fn write_config(&self, file: &ConfigFile, reload: &mut ReloadSignal) -> Result<WriteOutcome> {
        let (outcome, contents) = self.assess(file)?;

        match (outcome.action, contents) {
            (FileAction::Created | FileAction::Updated, Some(contents)) => {
                self.replace(&outcome.path, contents.expose().as_bytes())?;
                info!(
                    file = %outcome.path.display(),
                    action = %outcome.action,
                    sensitive = file.sensitive,
                    "wrote config file"
                );
            }
            (FileAction::Removed, _) => {
                fs::remove_file(&outcome.path).map_err(|e| {
                    ConfigError::file_error(format!(
                        "failed to remove '{}': {}",
                        outcome.path.display(),
                        e
                    ))
                })?;
                info!(file = %outcome.path.display(), "removed config file");
            }
            _ => {
                debug!(file = %outcome.path.display(), action = %outcome.action, "config file up to date");
            }
        }

        if file.reload_on_change && outcome.action.is_change() {
            reload.request(file.file_name());
        }

        Ok(outcome)
    }

    /// Remove `*.json` files in the directory whose names are not in `keep`
    ///
    /// Each removal requests a reload.
    pub fn purge_unmanaged(
        &self,
        keep: &BTreeSet<String>,
        reload: &mut ReloadSignal,
    ) -> Result<Vec<WriteOutcome>> {
        let mut removed = Vec::new();
        for (file_name, path) in self.unmanaged_files(keep)? {
            fs::remove_file(&path).map_err(|e| {
                ConfigError::file_error(format!("failed to purge '{}': {}", path.display(), e))
            })?;
            warn!(file = %path.display(), "purged unmanaged config file");
            reload.request(file_name.clone());
            removed.push(WriteOutcome {
                name: file_name.trim_end_matches(".json").to_string(),
                path,
                action: FileAction::Removed,
                digest: None,
                sensitive: false,
            });
        }
        Ok(removed)
    }

    /// `*.json` files in the directory not listed in `keep`, sorted by name
    pub fn unmanaged_files(&self, keep: &BTreeSet<String>) -> Result<Vec<(String, PathBuf)>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ConfigError::file_error(format!(
                    "failed to list '{}': {}",
                    self.dir.display(),
                    e
                )))
            }
        };

        let mut unmanaged = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.ends_with(".json") && !keep.contains(&file_name) {
                unmanaged.push((file_name, entry.path()));
            }
        }
        unmanaged.sort();
        Ok(unmanaged)
    }

    fn replace(&self, path: &Path, data: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            ConfigError::file_error(format!("failed to create '{}': {}", self.dir.display(), e))
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| {
            ConfigError::file_error(format!("failed to write '{}': {}", path.display(), e.error))
        })?;
        Ok(())
    }
}

fn read_existing(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::file_error(format!(
            "failed to read '{}': {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn writer(dir: &TempDir) -> ConfigWriter {
        ConfigWriter::new(dir.path(), JsonStyle::Compact)
    }

    #[test]
    fn test_create_then_unchanged() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);
        let file = ConfigFile::new("service_web", json!({"service": {"id": "web"}}));

        let mut reload = ReloadSignal::new();
        let first = writer.write_config(&file, &mut reload).unwrap();
        assert_eq!(first.action, FileAction::Created);
        assert_eq!(reload.reasons(), &["service_web.json".to_string()]);
        assert_eq!(
            fs::read_to_string(dir.path().join("service_web.json")).unwrap(),
            "{\"service\":{\"id\":\"web\"}}\n"
        );

        let mut reload = ReloadSignal::new();
        let second = writer.write_config(&file, &mut reload).unwrap();
        assert_eq!(second.action, FileAction::Unchanged);
        assert_eq!(second.digest, first.digest);
        assert!(!reload.is_pending());
    }

    #[test]
    fn test_update_requests_reload_only_when_asked() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);
        let mut reload = ReloadSignal::new();

        let file = ConfigFile::new("check_a", json!({"check": {"ttl": "5s"}}))
            .with_reload_on_change(false);
        writer.write_config(&file, &mut reload).unwrap();

        let changed = ConfigFile::new("check_a", json!({"check": {"ttl": "10s"}}))
            .with_reload_on_change(false);
        let outcome = writer.write_config(&changed, &mut reload).unwrap();
        assert_eq!(outcome.action, FileAction::Updated);
        assert!(!reload.is_pending());
    }

    #[test]
    fn test_style_change_rewrites_file() {
        let dir = TempDir::new().unwrap();
        let file = ConfigFile::new("config", json!({"datacenter": "dc1"}));
        let mut reload = ReloadSignal::new();

        writer(&dir).write_config(&file, &mut reload).unwrap();
        let pretty = ConfigWriter::new(dir.path(), JsonStyle::pretty());
        let outcome = pretty.write_config(&file, &mut reload).unwrap();
        assert_eq!(outcome.action, FileAction::Updated);
    }

    #[test]
    fn test_ensure_absent_removes_file() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);
        let mut reload = ReloadSignal::new();

        let file = ConfigFile::new("watch_w", json!({"watches": []}));
        writer.write_config(&file, &mut reload).unwrap();

        let mut reload = ReloadSignal::new();
        let absent = file.clone().with_ensure(Ensure::Absent);
        let outcome = writer.write_config(&absent, &mut reload).unwrap();
        assert_eq!(outcome.action, FileAction::Removed);
        assert!(!dir.path().join("watch_w.json").exists());
        assert!(reload.is_pending());

        let mut reload = ReloadSignal::new();
        let again = writer.write_config(&absent, &mut reload).unwrap();
        assert_eq!(again.action, FileAction::Absent);
        assert!(!reload.is_pending());
    }

    #[test]
    fn test_name_separators_are_sanitized() {
        let dir = TempDir::new().unwrap();
        let file = ConfigFile::new("service_app/web", json!({}));
        let outcome = writer(&dir).write_config(&file, &mut ReloadSignal::new()).unwrap();
        assert_eq!(outcome.path, dir.path().join("service_app_web.json"));
        assert!(outcome.path.exists());
    }

    #[test]
    fn test_plan_does_not_touch_disk() {
        let dir = TempDir::new().unwrap();
        let file = ConfigFile::new("acl", json!({"acl": {"tokens": {"agent": "t"}}})).with_sensitive(true);
        let outcome = writer(&dir).plan(&file).unwrap();
        assert_eq!(outcome.action, FileAction::Created);
        assert!(outcome.sensitive);
        assert!(!outcome.path.exists());
    }

    #[test]
    fn test_purge_unmanaged_keeps_listed_and_non_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("service_old.json"), "{}").unwrap();
        fs::write(dir.path().join("service_web.json"), "{}").unwrap();
        fs::write(dir.path().join("README"), "notes").unwrap();

        let keep: BTreeSet<String> = ["service_web.json".to_string()].into_iter().collect();
        let mut reload = ReloadSignal::new();
        let removed = writer(&dir).purge_unmanaged(&keep, &mut reload).unwrap();

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].name, "service_old");
        assert!(!dir.path().join("service_old.json").exists());
        assert!(dir.path().join("service_web.json").exists());
        assert!(dir.path().join("README").exists());
        assert_eq!(reload.reasons(), &["service_old.json".to_string()]);
    }

    #[test]
    fn test_missing_directory_is_created() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("consul.d");
        let writer = ConfigWriter::new(&nested, JsonStyle::Compact);
        assert!(writer.unmanaged_files(&BTreeSet::new()).unwrap().is_empty());

        let outcome = writer
            .write_config(&ConfigFile::new("config", json!({})), &mut ReloadSignal::new())
            .unwrap();
        assert_eq!(outcome.action, FileAction::Created);
        assert!(nested.join("config.json").exists());
    }

    #[test]
    fn test_written_bytes_match_planned_digest() {
        let dir = TempDir::new().unwrap();
        let writer = ConfigWriter::new(dir.path(), JsonStyle::pretty());
        let file = ConfigFile::new("acl", json!({"acl": {"tokens": {"agent": "t"}}}))
            .with_sensitive(true);

        let planned = writer.plan(&file).unwrap();
        let written = writer.write_config(&file, &mut ReloadSignal::new()).unwrap();
        let on_disk = fs::read(dir.path().join("acl.json")).unwrap();

        assert_eq!(written.digest, planned.digest);
        assert_eq!(written.digest, Some(content_digest(&on_disk)));
        assert!(written.sensitive);
    }

    #[test]
    fn test_content_digest_is_sha256_hex() {
        assert_eq!(
            content_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
