//! Watches: `watch_<id>.json` holding `{"watches": [{...}]}`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{carries_token, file_stem, insert_opt, AssembleOptions, Resource, ResourceKind};
use crate::error::{ConfigError, Result};
use crate::watch::{self, WatchSpec};
use crate::writer::{ConfigFile, Ensure};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchDefinition {
    /// File id; defaults to the title
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub watch_type: Option<String>,
    pub handler: Option<String>,
    pub args: Option<Vec<String>>,
    pub datacenter: Option<String>,
    pub token: Option<String>,
    pub key: Option<String>,
    pub keyprefix: Option<String>,
    pub service: Option<String>,
    pub service_tag: Option<String>,
    pub passingonly: Option<bool>,
    pub state: Option<String>,
    pub event_name: Option<String>,
    pub ensure: Ensure,
}

impl WatchDefinition {
    pub fn id_for(&self, title: &str) -> String {
        self.id.clone().unwrap_or_else(|| title.to_string())
    }

    /// Set parameters keyed by manifest name
    pub fn params(&self) -> WatchSpec {
        let mut params = Map::new();
        insert_opt(&mut params, "type", self.watch_type.clone());
        insert_opt(&mut params, "handler", self.handler.clone());
        insert_opt(&mut params, "args", self.args.clone());
        insert_opt(&mut params, "datacenter", self.datacenter.clone());
        insert_opt(&mut params, "token", self.token.clone());
        insert_opt(&mut params, "key", self.key.clone());
        insert_opt(&mut params, "keyprefix", self.keyprefix.clone());
        insert_opt(&mut params, "service", self.service.clone());
        insert_opt(&mut params, "service_tag", self.service_tag.clone());
        insert_opt(&mut params, "passingonly", self.passingonly);
        insert_opt(&mut params, "state", self.state.clone());
        insert_opt(&mut params, "event_name", self.event_name.clone());
        params
    }

    pub fn to_document(&self, title: &str) -> Result<Value> {
        let watch = watch::render(&self.params())
            .map_err(|e| ConfigError::watch(format!("watch/{}", title), e))?;

        let mut document = Map::new();
        document.insert(
            "watches".to_string(),
            Value::Array(vec![Value::Object(watch)]),
        );
        Ok(Value::Object(document))
    }
}

impl Resource for WatchDefinition {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Watch
    }

    fn to_config_file(&self, title: &str, options: &AssembleOptions) -> Result<ConfigFile> {
        let content = self.to_document(title)?;
        let sensitive = carries_token(&content["watches"][0]);
        Ok(
            ConfigFile::new(file_stem(ResourceKind::Watch, &self.id_for(title)), content)
                .with_ensure(self.ensure)
                .with_reload_on_change(options.reload_on_change)
                .with_sensitive(sensitive),
        )
    }
}
