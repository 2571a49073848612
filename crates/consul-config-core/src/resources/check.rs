//! Standalone health checks: `check_<id>.json` holding `{"check": {...}}`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{
    carries_token, file_stem, insert_opt, merge, strip_nulls, AssembleOptions, Resource,
    ResourceKind,
};
use crate::check;
use crate::error::{ConfigError, Result};
use crate::writer::{ConfigFile, Ensure};

/// Typed check parameters
///
/// Keys not listed here (`method`, `header`, `tls_skip_verify`, ...) are
/// collected in `extra` and passed through to the check body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckDefinition {
    pub id: Option<String>,
    pub name: Option<String>,
    pub service_id: Option<String>,
    pub notes: Option<String>,
    pub token: Option<String>,
    pub status: Option<String>,
    pub interval: Option<String>,
    pub timeout: Option<String>,
    pub args: Option<Vec<String>>,
    pub http: Option<String>,
    pub tcp: Option<String>,
    pub udp: Option<String>,
    pub grpc: Option<String>,
    pub docker_container_id: Option<String>,
    pub os_service: Option<String>,
    pub ttl: Option<String>,
    pub h2ping: Option<String>,
    pub alias_node: Option<String>,
    pub alias_service: Option<String>,
    pub ensure: Ensure,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CheckDefinition {
    pub fn id_for(&self, title: &str) -> String {
        self.id.clone().unwrap_or_else(|| title.to_string())
    }

    /// Flat check body before validation
    pub fn body(&self, title: &str) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("id".to_string(), Value::String(self.id_for(title)));
        body.insert(
            "name".to_string(),
            Value::String(self.name.clone().unwrap_or_else(|| title.to_string())),
        );

        let fields = [
            ("service_id", &self.service_id),
            ("notes", &self.notes),
            ("token", &self.token),
            ("status", &self.status),
            ("interval", &self.interval),
            ("timeout", &self.timeout),
            ("http", &self.http),
            ("tcp", &self.tcp),
            ("udp", &self.udp),
            ("grpc", &self.grpc),
            ("docker_container_id", &self.docker_container_id),
            ("os_service", &self.os_service),
            ("ttl", &self.ttl),
            ("h2ping", &self.h2ping),
            ("alias_node", &self.alias_node),
            ("alias_service", &self.alias_service),
        ];
        for (key, value) in fields {
            insert_opt(&mut body, key, value.clone());
        }
        insert_opt(&mut body, "args", self.args.clone());

        merge(&mut body, &self.extra);
        strip_nulls(body)
    }

    /// The validated `{"check": {...}}` document
    pub fn to_document(&self, title: &str, options: &AssembleOptions) -> Result<Value> {
        let body = check::validate_with(self.body(title), options.alias_mode)
            .map_err(|e| ConfigError::check(format!("check/{}", title), e))?;

        let mut document = Map::new();
        document.insert("check".to_string(), Value::Object(body));
        Ok(Value::Object(document))
    }
}

impl Resource for CheckDefinition {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Check
    }

    fn to_config_file(&self, title: &str, options: &AssembleOptions) -> Result<ConfigFile> {
        let content = self.to_document(title, options)?;
        let sensitive = carries_token(&content["check"]);
        Ok(
            ConfigFile::new(file_stem(ResourceKind::Check, &self.id_for(title)), content)
                .with_ensure(self.ensure)
                .with_reload_on_change(options.reload_on_change)
                .with_sensitive(sensitive),
        )
    }
}
