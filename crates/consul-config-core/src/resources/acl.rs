//! Agent ACL stanza: `acl.json` holding `{"acl": {...}}`
//!
//! The stanza carries tokens, so the file is always rendered as sensitive.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::{insert_opt, merge, strip_nulls, AssembleOptions, Resource, ResourceKind};
use crate::error::{ConfigError, Result};
use crate::writer::{ConfigFile, Ensure};

/// Accepted values for `default_policy`
pub const DEFAULT_POLICIES: &[&str] = &["allow", "deny"];

/// Accepted values for `down_policy`
pub const DOWN_POLICIES: &[&str] = &["allow", "deny", "extend-cache", "async-cache"];

/// File name of the ACL stanza
pub const ACL_FILE: &str = "acl";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AclDefinition {
    pub enabled: Option<bool>,
    pub default_policy: Option<String>,
    pub down_policy: Option<String>,
    pub enable_token_persistence: Option<bool>,
    /// Token role (`agent`, `default`, `initial_management`, ...) to secret
    pub tokens: BTreeMap<String, String>,
    pub ensure: Ensure,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AclDefinition {
    pub fn to_document(&self) -> Result<Value> {
        check_policy("default_policy", self.default_policy.as_deref(), DEFAULT_POLICIES)?;
        check_policy("down_policy", self.down_policy.as_deref(), DOWN_POLICIES)?;

        let mut body = Map::new();
        insert_opt(&mut body, "enabled", self.enabled);
        insert_opt(&mut body, "default_policy", self.default_policy.clone());
        insert_opt(&mut body, "down_policy", self.down_policy.clone());
        insert_opt(&mut body, "enable_token_persistence", self.enable_token_persistence);
        if !self.tokens.is_empty() {
            let tokens: Map<String, Value> = self
                .tokens
                .iter()
                .map(|(role, token)| (role.clone(), Value::String(token.clone())))
                .collect();
            body.insert("tokens".to_string(), Value::Object(tokens));
        }
        merge(&mut body, &self.extra);

        let mut document = Map::new();
        document.insert("acl".to_string(), Value::Object(strip_nulls(body)));
        Ok(Value::Object(document))
    }
}

fn check_policy(field: &str, value: Option<&str>, allowed: &[&str]) -> Result<()> {
    match value {
        Some(policy) if !allowed.contains(&policy) => Err(ConfigError::invalid_input(format!(
            "acl {} must be one of [{}], got '{}'",
            field,
            allowed.join(", "),
            policy
        ))),
        _ => Ok(()),
    }
}

impl Resource for AclDefinition {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Acl
    }

    fn to_config_file(&self, _title: &str, options: &AssembleOptions) -> Result<ConfigFile> {
        let content = self.to_document()?;
        Ok(ConfigFile::new(ACL_FILE, content)
            .with_ensure(self.ensure)
            .with_reload_on_change(options.reload_on_change)
            .with_sensitive(true))
    }
}
