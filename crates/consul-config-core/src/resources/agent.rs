//! Top-level agent configuration, written unwrapped to `config.json`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{strip_nulls, AssembleOptions, Resource, ResourceKind};
use crate::error::Result;
use crate::writer::ConfigFile;

/// File name of the agent configuration
pub const AGENT_FILE: &str = "config";

/// Keys whose presence makes the agent file secret
const SECRET_KEYS: &[&str] = &["encrypt", "acl"];

/// Free-form agent settings (`datacenter`, `data_dir`, `server`, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentConfig(pub Map<String, Value>);

impl AgentConfig {
    pub fn is_sensitive(&self) -> bool {
        SECRET_KEYS.iter().any(|key| self.0.contains_key(*key))
    }

    pub fn to_document(&self) -> Value {
        Value::Object(strip_nulls(self.0.clone()))
    }
}

impl Resource for AgentConfig {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Agent
    }

    fn to_config_file(&self, _title: &str, options: &AssembleOptions) -> Result<ConfigFile> {
        Ok(ConfigFile::new(AGENT_FILE, self.to_document())
            .with_reload_on_change(options.reload_on_change)
            .with_sensitive(self.is_sensitive()))
    }
}
