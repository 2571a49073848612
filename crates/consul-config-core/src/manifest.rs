//! Desired-state manifest
//!
//! A manifest declares every resource to render, keyed by title:
//!
//! ```yaml
//! agent:
//!   datacenter: dc1
//! services:
//!   web:
//!     port: 80
//!     checks:
//!       - http: http://localhost/health
//!         interval: 10s
//! checks:
//!   heartbeat:
//!     ttl: 30s
//! watches:
//!   app-config:
//!     type: key
//!     key: config/app
//!     handler: /usr/local/bin/reload-app
//! acl:
//!   enabled: true
//!   default_policy: deny
//! ```
//!
//! JSON, YAML and TOML are accepted; the format follows the file extension.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::resources::{
    AclDefinition, AgentConfig, CheckDefinition, Resource, ServiceDefinition, WatchDefinition,
};

/// Supported manifest encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Yaml,
    Toml,
}

impl ManifestFormat {
    /// Pick a format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "json" => Ok(ManifestFormat::Json),
            "yaml" | "yml" => Ok(ManifestFormat::Yaml),
            "toml" => Ok(ManifestFormat::Toml),
            _ => Err(ConfigError::invalid_input(format!(
                "Unsupported file format: {}. Supported formats: json, yaml, yml, toml",
                extension
            ))),
        }
    }

    /// Parse `content` into a JSON value
    pub fn parse(&self, content: &str) -> Result<Value> {
        match self {
            ManifestFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::parse_error(format!("Invalid JSON: {}", e))),
            ManifestFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| ConfigError::parse_error(format!("Invalid YAML: {}", e))),
            ManifestFormat::Toml => {
                let toml_value: toml::Value = toml::from_str(content)
                    .map_err(|e| ConfigError::parse_error(format!("Invalid TOML: {}", e)))?;
                serde_json::to_value(toml_value)
                    .map_err(|e| ConfigError::SerializationError(e.to_string()))
            }
        }
    }
}

/// Every resource to converge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    pub agent: Option<AgentConfig>,
    pub services: BTreeMap<String, ServiceDefinition>,
    pub checks: BTreeMap<String, CheckDefinition>,
    pub watches: BTreeMap<String, WatchDefinition>,
    pub acl: Option<AclDefinition>,
}

impl Manifest {
    /// Load a manifest file, choosing the parser by extension
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = ManifestFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::file_error(format!(
                "Failed to read manifest '{}': {}",
                path.display(),
                e
            ))
        })?;

        let manifest = Self::parse(&content, format)?;
        debug!(
            manifest = %path.display(),
            services = manifest.services.len(),
            checks = manifest.checks.len(),
            watches = manifest.watches.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    pub fn parse(content: &str, format: ManifestFormat) -> Result<Self> {
        Self::from_value(format.parse(content)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        // A YAML document holding only `~` parses to null.
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
            .map_err(|e| ConfigError::parse_error(format!("Invalid manifest: {}", e)))
    }

    /// Every declared resource with its title, in apply order: agent, acl,
    /// services, checks, watches
    pub fn resources(&self) -> Vec<(&str, &dyn Resource)> {
        let mut resources: Vec<(&str, &dyn Resource)> = Vec::with_capacity(self.len());
        if let Some(agent) = &self.agent {
            resources.push(("agent", agent));
        }
        if let Some(acl) = &self.acl {
            resources.push(("acl", acl));
        }
        for (title, service) in &self.services {
            resources.push((title.as_str(), service));
        }
        for (title, check) in &self.checks {
            resources.push((title.as_str(), check));
        }
        for (title, watch) in &self.watches {
            resources.push((title.as_str(), watch));
        }
        resources
    }

    /// Number of declared resources
    pub fn len(&self) -> usize {
        self.agent.iter().count()
            + self.services.len()
            + self.checks.len()
            + self.watches.len()
            + self.acl.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const YAML: &str = r#"
agent:
  datacenter: dc1
services:
  web:
    port: 80
    checks:
      - http: http://localhost/health
        interval: 10s
checks:
  heartbeat:
    ttl: 30s
watches:
  app:
    type: key
    key: config/app
    handler: /bin/true
acl:
  enabled: true
"#;

    #[test]
    fn test_parse_yaml_manifest() {
        let manifest = Manifest::parse(YAML, ManifestFormat::Yaml).unwrap();
        assert_eq!(manifest.len(), 5);
        assert_eq!(manifest.services["web"].port, Some(80));
        assert_eq!(manifest.checks["heartbeat"].ttl.as_deref(), Some("30s"));
        assert_eq!(manifest.watches["app"].key.as_deref(), Some("config/app"));
        assert_eq!(manifest.acl.as_ref().unwrap().enabled, Some(true));
    }

    #[test]
    fn test_parse_toml_manifest() {
        let content = r#"
[services.api]
port = 9000
tags = ["v1"]

[checks.api-ttl]
ttl = "15s"
"#;
        let manifest = Manifest::parse(content, ManifestFormat::Toml).unwrap();
        assert_eq!(manifest.services["api"].tags, vec!["v1".to_string()]);
        assert!(manifest.checks.contains_key("api-ttl"));
    }

    #[test]
    fn test_parse_json_manifest() {
        let manifest =
            Manifest::parse(r#"{"checks": {"c": {"tcp": "localhost:22", "interval": "5s"}}}"#, ManifestFormat::Json)
                .unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn test_resources_in_apply_order() {
        let manifest = Manifest::parse(YAML, ManifestFormat::Yaml).unwrap();
        let order: Vec<_> = manifest
            .resources()
            .iter()
            .map(|(title, resource)| format!("{}/{}", resource.kind(), title))
            .collect();
        assert_eq!(
            order,
            vec!["agent/agent", "acl/acl", "service/web", "check/heartbeat", "watch/app"]
        );
    }

    #[test]
    fn test_null_yaml_is_empty_manifest() {
        let manifest = Manifest::parse("~", ManifestFormat::Yaml).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = Manifest::parse("servics: {}", ManifestFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ManifestFormat::from_path(&PathBuf::from("a.yml")).unwrap(),
            ManifestFormat::Yaml
        );
        assert_eq!(
            ManifestFormat::from_path(&PathBuf::from("a.JSON")).unwrap(),
            ManifestFormat::Json
        );
        assert!(ManifestFormat::from_path(&PathBuf::from("a.ini")).is_err());
    }
}
