//! Watch type validation
//!
//! A watch names its `type`; each type takes its own parameters, some of
//! which are mandatory. Parameters are given under their manifest names
//! (`keyprefix`, `service_tag`, `event_name`) and emitted under the names
//! the agent reads (`prefix`, `tag`, `name`).

use serde_json::{Map, Value};
use thiserror::Error;

/// Watch parameters keyed by manifest name
pub type WatchSpec = Map<String, Value>;

/// Parameters and output keys for one watch type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchTypeRule {
    /// Value of the `type` field
    pub name: &'static str,
    /// Parameters that must be set
    pub required: &'static [&'static str],
    /// `(parameter, output key)` pairs emitted for this type
    pub emits: &'static [(&'static str, &'static str)],
}

/// Recognised watch types
pub const WATCH_TYPES: &[WatchTypeRule] = &[
    WatchTypeRule {
        name: "key",
        required: &["key"],
        emits: &[("key", "key")],
    },
    WatchTypeRule {
        name: "keyprefix",
        required: &["keyprefix"],
        emits: &[("keyprefix", "prefix")],
    },
    WatchTypeRule {
        name: "service",
        required: &["service"],
        emits: &[
            ("service", "service"),
            ("service_tag", "tag"),
            ("passingonly", "passingonly"),
        ],
    },
    WatchTypeRule {
        name: "checks",
        required: &[],
        emits: &[("service", "service"), ("state", "state")],
    },
    WatchTypeRule {
        name: "event",
        required: &[],
        emits: &[("event_name", "name")],
    },
    WatchTypeRule {
        name: "nodes",
        required: &[],
        emits: &[],
    },
    WatchTypeRule {
        name: "services",
        required: &[],
        emits: &[],
    },
];

/// Parameters every watch type carries through unchanged
const COMMON_FIELDS: &[&str] = &["handler", "args", "datacenter", "token"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchValidationError {
    #[error("watch type is required")]
    MissingType,

    #[error("'{0}' is an unrecognised watch type")]
    UnknownType(String),

    #[error("{parameter} is required for watch type [{watch_type}]")]
    MissingParameter {
        watch_type: String,
        parameter: String,
    },

    #[error("watch must define a handler or an args list")]
    MissingHandler,
}

/// Look up the rule for a watch type name
pub fn watch_type(name: &str) -> Option<&'static WatchTypeRule> {
    WATCH_TYPES.iter().find(|rule| rule.name == name)
}

/// Check `params` against the rule for its `type`
pub fn validate(params: &WatchSpec) -> Result<&'static WatchTypeRule, WatchValidationError> {
    let type_name = params
        .get("type")
        .and_then(Value::as_str)
        .ok_or(WatchValidationError::MissingType)?;

    let rule = watch_type(type_name)
        .ok_or_else(|| WatchValidationError::UnknownType(type_name.to_string()))?;

    if let Some(missing) = rule.required.iter().find(|p| !params.contains_key(**p)) {
        return Err(WatchValidationError::MissingParameter {
            watch_type: rule.name.to_string(),
            parameter: missing.to_string(),
        });
    }

    if !params.contains_key("handler") && !params.contains_key("args") {
        return Err(WatchValidationError::MissingHandler);
    }

    Ok(rule)
}

/// Validate and translate parameters to the agent's watch object
///
/// Parameters that do not belong to the watch's type are dropped.
pub fn render(params: &WatchSpec) -> Result<Map<String, Value>, WatchValidationError> {
    let rule = validate(params)?;

    let mut watch = Map::new();
    watch.insert("type".to_string(), Value::String(rule.name.to_string()));

    for field in COMMON_FIELDS {
        if let Some(value) = params.get(*field) {
            watch.insert(field.to_string(), value.clone());
        }
    }

    for (param, key) in rule.emits {
        if let Some(value) = params.get(*param) {
            watch.insert(key.to_string(), value.clone());
        }
    }

    Ok(watch)
}
