//! Service definitions: `service_<id>.json` holding `{"service": {...}}`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{
    carries_token, file_stem, insert_opt, merge, strip_nulls, AssembleOptions, Resource,
    ResourceKind,
};
use crate::check::{self, CheckSpec};
use crate::error::{ConfigError, Result};
use crate::writer::{ConfigFile, Ensure};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceDefinition {
    /// Registered name; defaults to the title
    pub service_name: Option<String>,
    /// Service id; defaults to the title
    pub id: Option<String>,
    pub address: Option<String>,
    pub port: Option<u16>,
    pub tags: Vec<String>,
    /// Embedded health checks, each validated like a standalone check
    pub checks: Vec<CheckSpec>,
    pub token: Option<String>,
    pub meta: Option<Map<String, Value>>,
    pub enable_tag_override: bool,
    pub ensure: Ensure,
    /// Extra keys merged into the service body last
    pub service_config_hash: Map<String, Value>,
}

impl ServiceDefinition {
    pub fn id_for(&self, title: &str) -> String {
        self.id.clone().unwrap_or_else(|| title.to_string())
    }

    /// The `{"service": {...}}` document, with its checks validated
    pub fn to_document(&self, title: &str, options: &AssembleOptions) -> Result<Value> {
        let mut body = Map::new();
        body.insert("id".to_string(), Value::String(self.id_for(title)));
        body.insert(
            "name".to_string(),
            Value::String(self.service_name.clone().unwrap_or_else(|| title.to_string())),
        );
        insert_opt(&mut body, "address", self.address.clone());
        insert_opt(&mut body, "port", self.port);
        body.insert("tags".to_string(), Value::from(self.tags.clone()));
        body.insert(
            "checks".to_string(),
            Value::Array(self.checks.iter().cloned().map(Value::Object).collect()),
        );
        insert_opt(&mut body, "token", self.token.clone());
        insert_opt(&mut body, "meta", self.meta.clone());
        body.insert(
            "enable_tag_override".to_string(),
            Value::Bool(self.enable_tag_override),
        );
        merge(&mut body, &self.service_config_hash);

        let mut body = strip_nulls(body);
        if let Some(checks) = body.get("checks") {
            let checks = validated_checks(title, checks, options)?;
            body.insert("checks".to_string(), Value::Array(checks));
        }

        let mut document = Map::new();
        document.insert("service".to_string(), Value::Object(body));
        Ok(Value::Object(document))
    }
}

fn validated_checks(title: &str, checks: &Value, options: &AssembleOptions) -> Result<Vec<Value>> {
    let items = checks.as_array().ok_or_else(|| {
        ConfigError::invalid_input(format!("service '{}': checks must be a list", title))
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let spec = item.as_object().cloned().ok_or_else(|| {
                ConfigError::invalid_input(format!(
                    "service '{}': checks[{}] must be a mapping",
                    title, index
                ))
            })?;
            check::validate_with(spec, options.alias_mode)
                .map(Value::Object)
                .map_err(|e| ConfigError::check(format!("service/{} checks[{}]", title, index), e))
        })
        .collect()
}

impl Resource for ServiceDefinition {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Service
    }

    fn to_config_file(&self, title: &str, options: &AssembleOptions) -> Result<ConfigFile> {
        let content = self.to_document(title, options)?;
        let sensitive = carries_token(&content["service"]);
        Ok(
            ConfigFile::new(file_stem(ResourceKind::Service, &self.id_for(title)), content)
                .with_ensure(self.ensure)
                .with_reload_on_change(options.reload_on_change)
                .with_sensitive(sensitive),
        )
    }
}
