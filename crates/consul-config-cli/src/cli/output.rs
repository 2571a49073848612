//! Output formatting for the consul-config CLI
//!
//! Results render as a colored table for people, or as JSON/YAML for
//! scripts. Sensitive file contents are always shown as `[REDACTED]`
//! unless the caller explicitly asks to reveal them.

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use consul_config_core::{
    file_name_for, CheckValidationError, ConfigError, FileAction, PlannedFile,
    WatchValidationError, WriteOutcome,
};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};
use std::path::PathBuf;

/// Placeholder shown instead of sensitive contents
pub const REDACTED: &str = "[REDACTED]";

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable table format with colors
    #[default]
    Table,
    /// JSON format for machine processing
    Json,
    /// YAML format
    Yaml,
}

/// Serialize `value` in a structured format; `None` for tables
fn render_structured<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<Option<String>> {
    match format {
        OutputFormat::Json => Ok(Some(serde_json::to_string_pretty(value)?)),
        OutputFormat::Yaml => Ok(Some(serde_yaml::to_string(value)?)),
        OutputFormat::Table => Ok(None),
    }
}

/// Validation results for a manifest or a check file
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutput {
    pub valid: bool,
    /// Number of resources or checks examined
    pub checked: usize,
    pub error_count: usize,
    pub findings: Vec<FindingOutput>,
    pub summary: String,
}

/// One validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FindingOutput {
    /// Short machine-readable identifier
    pub code: String,
    /// Resource the finding belongs to, e.g. `check/web-health`
    pub resource: String,
    pub message: String,
}

impl FindingOutput {
    /// Describe a library error as a finding
    pub fn from_error(error: &ConfigError) -> Self {
        match error {
            ConfigError::Check { resource, source } => Self {
                code: check_code(source).to_string(),
                resource: resource.clone(),
                message: source.to_string(),
            },
            ConfigError::Watch { resource, source } => Self {
                code: watch_code(source).to_string(),
                resource: resource.clone(),
                message: source.to_string(),
            },
            ConfigError::DuplicateFile { second, .. } => Self {
                code: "duplicate-file".to_string(),
                resource: second.clone(),
                message: error.to_string(),
            },
            other => Self {
                code: "invalid-resource".to_string(),
                resource: String::new(),
                message: other.to_string(),
            },
        }
    }

    /// A check-rule failure on an item of a check file
    pub fn from_check(resource: impl Into<String>, error: &CheckValidationError) -> Self {
        Self {
            code: check_code(error).to_string(),
            resource: resource.into(),
            message: error.to_string(),
        }
    }
}

fn check_code(error: &CheckValidationError) -> &'static str {
    match error {
        CheckValidationError::WrongTypeCount { .. } => "check-type-count",
        CheckValidationError::Interval { .. } => "check-interval",
        CheckValidationError::IncompleteComposite { .. } => "check-incomplete-alias",
    }
}

fn watch_code(error: &WatchValidationError) -> &'static str {
    match error {
        WatchValidationError::MissingType => "watch-missing-type",
        WatchValidationError::UnknownType(_) => "watch-unknown-type",
        WatchValidationError::MissingParameter { .. } => "watch-missing-parameter",
        WatchValidationError::MissingHandler => "watch-missing-handler",
    }
}

impl ValidationOutput {
    pub fn new(checked: usize, findings: Vec<FindingOutput>) -> Self {
        let error_count = findings.len();
        let valid = error_count == 0;
        let summary = if valid {
            format!("{} definition(s) valid", checked)
        } else {
            format!("{} of {} definition(s) invalid", error_count, checked)
        };

        Self {
            valid,
            checked,
            error_count,
            findings,
            summary,
        }
    }

    pub fn render(&self, format: OutputFormat) -> anyhow::Result<()> {
        self.render_to(format, &mut io::stdout())
    }

    pub fn render_to(&self, format: OutputFormat, out: &mut dyn Write) -> anyhow::Result<()> {
        if let Some(text) = render_structured(self, format)? {
            writeln!(out, "{}", text)?;
            return Ok(());
        }

        writeln!(out)?;
        writeln!(out, "{}", "Validation Results".cyan().bold())?;
        writeln!(out, "{}", "=".repeat(60))?;
        writeln!(out)?;

        let status = if self.valid { "+".green() } else { "x".red() };
        writeln!(out, "{} {}", status, self.summary)?;

        if !self.findings.is_empty() {
            writeln!(out)?;
            writeln!(out, "{}", "Findings:".cyan().bold())?;
            writeln!(out, "{}", "-".repeat(60))?;
            for finding in &self.findings {
                writeln!(out)?;
                writeln!(
                    out,
                    "{} [{}] {} {}",
                    "x".red(),
                    finding.code.dimmed(),
                    "ERROR".red().bold(),
                    finding.message
                )?;
                if !finding.resource.is_empty() {
                    writeln!(out, "  {} {}", "Resource:".dimmed(), finding.resource.cyan())?;
                }
            }
        }

        out.flush()?;
        Ok(())
    }
}

/// One file in a plan or apply report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeOutput {
    pub file: String,
    pub path: PathBuf,
    pub action: FileAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub sensitive: bool,
}

impl OutcomeOutput {
    pub fn from_outcome(outcome: &WriteOutcome) -> Self {
        Self {
            file: file_name_for(&outcome.name),
            path: outcome.path.clone(),
            action: outcome.action,
            digest: outcome.digest.clone(),
            sensitive: outcome.sensitive,
        }
    }
}

/// Files touched (or to be touched) by a plan or apply
#[derive(Debug, Clone, Serialize)]
pub struct ChangesOutput {
    /// `true` when nothing was written yet
    pub dry_run: bool,
    pub config_dir: PathBuf,
    pub changed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reloaded: Option<bool>,
    pub files: Vec<OutcomeOutput>,
    pub summary: String,
}

impl ChangesOutput {
    pub fn new(
        dry_run: bool,
        config_dir: PathBuf,
        outcomes: &[WriteOutcome],
        reloaded: Option<bool>,
    ) -> Self {
        let changed = outcomes.iter().filter(|o| o.action.is_change()).count();
        let summary = match (dry_run, changed) {
            (_, 0) => "No changes, configuration is up to date".to_string(),
            (true, n) => format!("{} file(s) would change", n),
            (false, n) => format!("{} file(s) changed", n),
        };

        Self {
            dry_run,
            config_dir,
            changed,
            reloaded,
            files: outcomes.iter().map(OutcomeOutput::from_outcome).collect(),
            summary,
        }
    }

    pub fn render(&self, format: OutputFormat) -> anyhow::Result<()> {
        self.render_to(format, &mut io::stdout())
    }

    pub fn render_to(&self, format: OutputFormat, out: &mut dyn Write) -> anyhow::Result<()> {
        if let Some(text) = render_structured(self, format)? {
            writeln!(out, "{}", text)?;
            return Ok(());
        }

        let title = if self.dry_run { "Plan" } else { "Apply" };
        writeln!(out)?;
        writeln!(
            out,
            "{} {}",
            title.cyan().bold(),
            self.config_dir.display().to_string().dimmed()
        )?;
        writeln!(out, "{}", "=".repeat(60))?;

        for file in &self.files {
            let marker = if file.sensitive { " (sensitive)".dimmed() } else { "".normal() };
            writeln!(
                out,
                "  {} {:<10} {}{}",
                action_icon(file.action),
                action_label(file.action),
                file.file,
                marker
            )?;
        }

        writeln!(out)?;
        writeln!(out, "{}", self.summary)?;
        match self.reloaded {
            Some(true) => writeln!(out, "{}", "Agent reloaded".green())?,
            Some(false) if self.changed > 0 => {
                writeln!(out, "{}", "No reload requested".dimmed())?
            }
            _ => {}
        }

        out.flush()?;
        Ok(())
    }
}

fn action_icon(action: FileAction) -> ColoredString {
    match action {
        FileAction::Created => "+".green(),
        FileAction::Updated => "~".yellow(),
        FileAction::Removed => "-".red(),
        FileAction::Unchanged | FileAction::Absent => "=".dimmed(),
    }
}

fn action_label(action: FileAction) -> ColoredString {
    let label = action.to_string();
    match action {
        FileAction::Created => label.green().bold(),
        FileAction::Updated => label.yellow().bold(),
        FileAction::Removed => label.red().bold(),
        FileAction::Unchanged | FileAction::Absent => label.dimmed(),
    }
}

/// One rendered document
#[derive(Debug, Clone, Serialize)]
pub struct RenderedFile {
    pub file: String,
    pub kind: String,
    pub title: String,
    pub sensitive: bool,
    /// Document body, or the redaction placeholder
    pub content: Value,
    #[serde(skip)]
    text: String,
}

impl RenderedFile {
    /// Build from a planned file and its rendered text
    pub fn new(planned: &PlannedFile, text: &str, reveal: bool) -> Self {
        let hidden = planned.file.sensitive && !reveal;
        Self {
            file: planned.file.file_name(),
            kind: planned.kind.to_string(),
            title: planned.title.clone(),
            sensitive: planned.file.sensitive,
            content: if hidden {
                Value::String(REDACTED.to_string())
            } else {
                planned.file.content.clone()
            },
            text: if hidden {
                format!("{}\n", REDACTED)
            } else {
                text.to_string()
            },
        }
    }
}

/// Rendered documents, as the agent would read them
#[derive(Debug, Clone, Serialize)]
pub struct RenderOutput {
    pub files: Vec<RenderedFile>,
}

impl RenderOutput {
    pub fn render(&self, format: OutputFormat) -> anyhow::Result<()> {
        self.render_to(format, &mut io::stdout())
    }

    pub fn render_to(&self, format: OutputFormat, out: &mut dyn Write) -> anyhow::Result<()> {
        if let Some(text) = render_structured(self, format)? {
            writeln!(out, "{}", text)?;
            return Ok(());
        }

        for (index, file) in self.files.iter().enumerate() {
            if index > 0 {
                writeln!(out)?;
            }
            writeln!(
                out,
                "{} {} {}",
                "==>".cyan(),
                file.file.bold(),
                format!("({}/{})", file.kind, file.title).dimmed()
            )?;
            write!(out, "{}", file.text)?;
        }

        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consul_config_core::{check, ConfigFile, IntervalRule, ResourceKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn to_string(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> String {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn outcome(name: &str, action: FileAction) -> WriteOutcome {
        WriteOutcome {
            name: name.to_string(),
            path: PathBuf::from(format!("/etc/consul/{}.json", name)),
            action,
            digest: None,
            sensitive: false,
        }
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_finding_from_check_error() {
        let error = ConfigError::check(
            "check/heartbeat",
            CheckValidationError::Interval {
                check_type: "ttl".to_string(),
                requirement: IntervalRule::Forbidden,
            },
        );
        let finding = FindingOutput::from_error(&error);
        assert_eq!(
            finding,
            FindingOutput {
                code: "check-interval".to_string(),
                resource: "check/heartbeat".to_string(),
                message: "interval forbidden for check type 'ttl'".to_string(),
            }
        );
    }

    #[test]
    fn test_validation_table() {
        let err = check::validate(json!({"tcp": "x:1"}).as_object().cloned().unwrap()).unwrap_err();
        let output = ValidationOutput::new(2, vec![FindingOutput::from_check("checks[1]", &err)]);
        assert!(!output.valid);

        let text = to_string(|buf| output.render_to(OutputFormat::Table, buf));
        assert!(text.contains("1 of 2 definition(s) invalid"));
        assert!(text.contains("[check-interval] ERROR interval required for check type 'tcp'"));
        assert!(text.contains("Resource: checks[1]"));
    }

    #[test]
    fn test_validation_json() {
        let output = ValidationOutput::new(3, Vec::new());
        let text = to_string(|buf| output.render_to(OutputFormat::Json, buf));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["valid"], json!(true));
        assert_eq!(value["summary"], json!("3 definition(s) valid"));
    }

    #[test]
    fn test_changes_table() {
        let outcomes = vec![
            outcome("service_web", FileAction::Created),
            outcome("check_disk", FileAction::Unchanged),
        ];
        let output = ChangesOutput::new(true, PathBuf::from("/etc/consul"), &outcomes, None);
        assert_eq!(output.changed, 1);

        let text = to_string(|buf| output.render_to(OutputFormat::Table, buf));
        assert!(text.contains("+ created    service_web.json"));
        assert!(text.contains("= unchanged  check_disk.json"));
        assert!(text.contains("1 file(s) would change"));
    }

    #[test]
    fn test_changes_show_file_name_on_disk() {
        let outcomes = vec![outcome("service_app/web", FileAction::Created)];
        let output = ChangesOutput::new(true, PathBuf::from("/etc/consul"), &outcomes, None);
        assert_eq!(output.files[0].file, "service_app_web.json");

        let text = to_string(|buf| output.render_to(OutputFormat::Table, buf));
        assert!(text.contains("service_app_web.json"));
        assert!(!text.contains("service_app/web.json"));
    }

    #[test]
    fn test_changes_yaml_lists_actions() {
        let outcomes = vec![outcome("service_old", FileAction::Removed)];
        let output = ChangesOutput::new(false, PathBuf::from("/d"), &outcomes, Some(true));
        let text = to_string(|buf| output.render_to(OutputFormat::Yaml, buf));
        assert!(text.contains("action: removed"));
        assert!(text.contains("reloaded: true"));
    }

    #[test]
    fn test_sensitive_render_is_redacted() {
        let planned = PlannedFile {
            kind: ResourceKind::Acl,
            title: "acl".to_string(),
            file: ConfigFile::new("acl", json!({"acl": {"tokens": {"agent": "s3cret"}}}))
                .with_sensitive(true),
        };
        let text = "{\"acl\":{\"tokens\":{\"agent\":\"s3cret\"}}}\n";

        let hidden = RenderOutput {
            files: vec![RenderedFile::new(&planned, text, false)],
        };
        let table = to_string(|buf| hidden.render_to(OutputFormat::Table, buf));
        assert!(table.contains("==> acl.json (acl/acl)"));
        assert!(table.contains(REDACTED));
        assert!(!table.contains("s3cret"));
        let json = to_string(|buf| hidden.render_to(OutputFormat::Json, buf));
        assert!(!json.contains("s3cret"));

        let shown = RenderOutput {
            files: vec![RenderedFile::new(&planned, text, true)],
        };
        let table = to_string(|buf| shown.render_to(OutputFormat::Table, buf));
        assert!(table.contains("s3cret"));
    }
}
