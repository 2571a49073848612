//! Resource assemblers
//!
//! Each resource kind takes typed parameters, fills in defaults (an `id`
//! falls back to the resource title), drops unset fields, merges free-form
//! extras, validates where there are rules to check, and yields the
//! [`ConfigFile`] the writer converges.

pub mod acl;
pub mod agent;
pub mod check;
pub mod service;
pub mod watch;

pub use acl::AclDefinition;
pub use agent::AgentConfig;
pub use check::CheckDefinition;
pub use service::ServiceDefinition;
pub use watch::WatchDefinition;

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::check::AliasMode;
use crate::error::Result;
use crate::writer::ConfigFile;

/// Kinds of rendered resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Agent,
    Acl,
    Service,
    Check,
    Watch,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Agent => write!(f, "agent"),
            ResourceKind::Acl => write!(f, "acl"),
            ResourceKind::Service => write!(f, "service"),
            ResourceKind::Check => write!(f, "check"),
            ResourceKind::Watch => write!(f, "watch"),
        }
    }
}

/// Options shared by all assemblers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssembleOptions {
    /// Treatment of a lone `alias_node`/`alias_service`
    pub alias_mode: AliasMode,
    /// Mark assembled files to request a reload when they change
    pub reload_on_change: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            alias_mode: AliasMode::Lenient,
            reload_on_change: true,
        }
    }
}

/// A declared resource that renders to one config file
pub trait Resource {
    fn kind(&self) -> ResourceKind;

    /// Assemble and validate, producing the file to converge
    fn to_config_file(&self, title: &str, options: &AssembleOptions) -> Result<ConfigFile>;
}

/// Insert `value` under `key` when it is set
pub(crate) fn insert_opt<T: Into<Value>>(map: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value.into());
    }
}

/// Overlay `extra` onto `map`; extra keys win
pub(crate) fn merge(map: &mut Map<String, Value>, extra: &Map<String, Value>) {
    for (key, value) in extra {
        map.insert(key.clone(), value.clone());
    }
}

/// Remove null values from objects, recursively
pub fn strip_nulls(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key, strip_value(value)))
        .collect()
}

fn strip_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(strip_nulls(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_value).collect()),
        other => other,
    }
}

/// True when `body`, or a check embedded in its `checks` list, sets a `token`
pub(crate) fn carries_token(body: &Value) -> bool {
    let Some(map) = body.as_object() else {
        return false;
    };

    map.contains_key("token")
        || map
            .get("checks")
            .and_then(Value::as_array)
            .is_some_and(|checks| {
                checks
                    .iter()
                    .any(|check| check.get("token").is_some())
            })
}

/// `kind_escaped-id` file name stem, e.g. `service_web`
pub(crate) fn file_stem(kind: ResourceKind, id: &str) -> String {
    format!("{}_{}", kind, id)
}
