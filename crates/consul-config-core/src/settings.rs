//! Renderer settings
//!
//! Settings come from an optional TOML file, then environment variables,
//! then whatever the caller sets explicitly (CLI flags). Environment
//! variables use the `PREFIX__KEY` convention, e.g.
//! `CONSUL_CONFIG__CONFIG_DIR=/etc/consul.d`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::check::AliasMode;
use crate::error::{ConfigError, Result};
use crate::reload::CommandReload;
use crate::render::{JsonStyle, DEFAULT_PRETTY_INDENT, MAX_PRETTY_INDENT};
use crate::resources::AssembleOptions;

/// Default environment variable prefix
pub const ENV_PREFIX: &str = "CONSUL_CONFIG";

/// Separator between prefix and key in variable names
pub const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory the agent loads configuration from
    pub config_dir: PathBuf,
    /// Pretty-print rendered JSON
    pub pretty: bool,
    /// Indentation width when pretty-printing
    pub pretty_indent: usize,
    /// Remove `*.json` files not declared in the manifest
    pub purge: bool,
    /// Reject a lone `alias_node`/`alias_service` check field
    pub strict_alias: bool,
    /// Request a reload when a file changes
    pub reload_on_change: bool,
    /// Program and arguments that reload the agent
    pub reload_command: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("/etc/consul"),
            pretty: false,
            pretty_indent: DEFAULT_PRETTY_INDENT,
            purge: false,
            strict_alias: false,
            reload_on_change: true,
            reload_command: vec!["consul".to_string(), "reload".to_string()],
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::file_error(format!(
                "Failed to read settings file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        debug!(settings = %path.display(), "loaded settings file");
        Ok(settings)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self, prefix: &str) -> Result<()> {
        self.apply_env_from(prefix, std::env::vars())
    }

    /// Apply overrides from an explicit list of variables
    pub fn apply_env_from<I>(&mut self, prefix: &str, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let var_prefix = format!("{}{}", prefix.to_uppercase(), ENV_SEPARATOR);

        for (name, value) in vars {
            let Some(key) = name.strip_prefix(&var_prefix) else {
                continue;
            };

            match key.to_lowercase().as_str() {
                "config_dir" => self.config_dir = PathBuf::from(value),
                "pretty" => self.pretty = parse_bool(&name, &value)?,
                "pretty_indent" => {
                    self.pretty_indent = value
                        .trim()
                        .parse::<usize>()
                        .ok()
                        .filter(|indent| *indent <= MAX_PRETTY_INDENT)
                        .ok_or_else(|| {
                            ConfigError::invalid_input(format!(
                                "{} must be an integer from 0 to {}, got '{}'",
                                name, MAX_PRETTY_INDENT, value
                            ))
                        })?
                }
                "purge" => self.purge = parse_bool(&name, &value)?,
                "strict_alias" => self.strict_alias = parse_bool(&name, &value)?,
                "reload_on_change" => self.reload_on_change = parse_bool(&name, &value)?,
                "reload_command" => {
                    self.reload_command = value.split_whitespace().map(String::from).collect()
                }
                _ => {
                    return Err(ConfigError::invalid_input(format!(
                        "unknown setting in environment: {}",
                        name
                    )))
                }
            }
            debug!(variable = %name, "applied environment override");
        }

        Ok(())
    }

    /// Reject values the renderer cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.pretty_indent > MAX_PRETTY_INDENT {
            return Err(ConfigError::invalid_input(format!(
                "pretty_indent must be at most {}, got {}",
                MAX_PRETTY_INDENT, self.pretty_indent
            )));
        }
        Ok(())
    }

    pub fn json_style(&self) -> JsonStyle {
        if self.pretty {
            JsonStyle::Pretty {
                indent: self.pretty_indent,
            }
        } else {
            JsonStyle::Compact
        }
    }

    pub fn alias_mode(&self) -> AliasMode {
        if self.strict_alias {
            AliasMode::Strict
        } else {
            AliasMode::Lenient
        }
    }

    pub fn assemble_options(&self) -> AssembleOptions {
        AssembleOptions {
            alias_mode: self.alias_mode(),
            reload_on_change: self.reload_on_change,
        }
    }

    pub fn reload_handle(&self) -> Result<CommandReload> {
        CommandReload::from_argv(&self.reload_command)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid_input(format!(
            "{} must be a boolean, got '{}'",
            name, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.config_dir, PathBuf::from("/etc/consul"));
        assert_eq!(settings.json_style(), JsonStyle::Compact);
        assert_eq!(settings.alias_mode(), AliasMode::Lenient);
        assert_eq!(settings.reload_handle().unwrap(), CommandReload::default());
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "config_dir = \"/etc/consul.d\"\npretty = true\npretty_indent = 2\n",
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.config_dir, PathBuf::from("/etc/consul.d"));
        assert_eq!(settings.json_style(), JsonStyle::Pretty { indent: 2 });
        assert!(settings.reload_on_change);
    }

    #[test]
    fn test_unknown_file_key_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "prety = true\n").unwrap();
        assert!(matches!(
            Settings::from_file(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_env_from(
                ENV_PREFIX,
                vars(&[
                    ("CONSUL_CONFIG__CONFIG_DIR", "/tmp/consul"),
                    ("CONSUL_CONFIG__PRETTY", "yes"),
                    ("CONSUL_CONFIG__STRICT_ALIAS", "1"),
                    ("CONSUL_CONFIG__RELOAD_COMMAND", "systemctl reload consul"),
                    ("PATH", "/usr/bin"),
                ]),
            )
            .unwrap();

        assert_eq!(settings.config_dir, PathBuf::from("/tmp/consul"));
        assert!(settings.pretty);
        assert_eq!(settings.alias_mode(), AliasMode::Strict);
        let reload = settings.reload_handle().unwrap();
        assert_eq!(reload.program(), "systemctl");
        assert_eq!(reload.args(), &["reload".to_string(), "consul".to_string()]);
    }

    #[test]
    fn test_env_bad_values() {
        let mut settings = Settings::default();
        assert!(settings
            .apply_env_from(ENV_PREFIX, vars(&[("CONSUL_CONFIG__PURGE", "maybe")]))
            .is_err());
        assert!(settings
            .apply_env_from(ENV_PREFIX, vars(&[("CONSUL_CONFIG__NOPE", "1")]))
            .is_err());
        assert!(settings
            .apply_env_from(ENV_PREFIX, vars(&[("CONSUL_CONFIG__PRETTY_INDENT", "-1")]))
            .is_err());
    }

    #[test]
    fn test_pretty_indent_is_bounded() {
        let mut settings = Settings::default();
        settings
            .apply_env_from(ENV_PREFIX, vars(&[("CONSUL_CONFIG__PRETTY_INDENT", "16")]))
            .unwrap();
        assert_eq!(settings.pretty_indent, 16);

        let err = settings
            .apply_env_from(
                ENV_PREFIX,
                vars(&[("CONSUL_CONFIG__PRETTY_INDENT", "18446744073709551615")]),
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInput(_)));
        assert_eq!(settings.pretty_indent, 16);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "pretty_indent = 64\n").unwrap();
        assert!(Settings::from_file(&path).is_err());
    }

    #[test]
    fn test_empty_reload_command_is_error() {
        let settings = Settings {
            reload_command: Vec::new(),
            ..Settings::default()
        };
        assert!(settings.reload_handle().is_err());
    }
}
