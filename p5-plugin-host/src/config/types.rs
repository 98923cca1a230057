// SPDX-License-Identifier: Apache-2.0
//! Data types for one side of the config merge: [`PluginConfig`],
//! [`MergedConfig`], [`RefreshTrigger`], plus conversion from a parsed TOML
//! document into the raw (pre-merge) shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::RawConfigDoc;

/// The richer, in-memory form of a single config value. Config is
/// `string -> any` in memory; only the wire boundary flattens it to
/// strings at the wire boundary only. JSON's value model is a convenient
/// stand-in for "any" here since every TOML value has an unambiguous JSON
/// equivalent.
pub type ConfigValue = JsonValue;

/// A nullable-boolean triple deciding when a plugin's credentials must be
/// refreshed. Absent fields take their documented default: workspace and
/// stack changes trigger a refresh by default, config changes do not.
///
/// A `None` receiver (no `[plugins.<name>.refresh]` table at all) must
/// behave identically to an all-default `RefreshTrigger`, enforced by
/// routing both through the same accessor methods rather than branching on
/// `Option<RefreshTrigger>` at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshTrigger {
    pub on_workspace_change: Option<bool>,
    pub on_stack_change: Option<bool>,
    pub on_config_change: Option<bool>,
}

impl RefreshTrigger {
    pub fn on_workspace_change(&self) -> bool {
        self.on_workspace_change.unwrap_or(true)
    }

    pub fn on_stack_change(&self) -> bool {
        self.on_stack_change.unwrap_or(true)
    }

    pub fn on_config_change(&self) -> bool {
        self.on_config_change.unwrap_or(false)
    }

    /// Override wholesale if `over` was actually present in the override
    /// document. The merge rule for this field is not field-by-field.
    pub(crate) fn merge(base: RefreshTrigger, over: Option<RefreshTrigger>) -> RefreshTrigger {
        over.unwrap_or(base)
    }
}

/// One plugin's declaration: where to find it (or that it's a built-in),
/// its nested config, its refresh triggers, and its capability flags.
#[derive(Debug, Clone, Default)]
pub struct PluginConfig {
    /// Empty means "this must be a registered built-in".
    pub command: String,
    pub args: Vec<String>,
    pub config: HashMap<String, ConfigValue>,
    pub refresh: RefreshTrigger,
    pub import_helper: bool,
    pub resource_opener: bool,
    pub use_auth_env: bool,
    /// Whether this document's declaration carried a `[plugins.x.refresh]`
    /// table at all. Needed only to implement the "override wholesale if
    /// present" merge rule for `refresh`; irrelevant after merging.
    pub(crate) refresh_declared: bool,
}

impl PluginConfig {
    pub fn is_builtin_only(&self) -> bool {
        self.command.is_empty()
    }
}

/// The merged view of every declared plugin plus the effective execution
/// ordering, ready for `PluginRegistry`/subprocess instantiation.
#[derive(Debug, Clone, Default)]
pub struct MergedConfig {
    pub plugins: HashMap<String, PluginConfig>,
    pub order: Vec<String>,
}

/// Parse a `toml::Value` shaped like:
///
/// ```toml
/// [plugins.aws]
/// cmd = "/path/to/aws-plugin"
/// args = ["--flag"]
/// import_helper = true
/// [plugins.aws.config]
/// region = "us-west-2"
/// [plugins.aws.refresh]
/// onWorkspaceChange = true
/// order = ["aws"]
/// ```
pub(crate) fn doc_from_toml_value(value: &toml::Value) -> Result<RawConfigDoc, toml::de::Error> {
    let mut doc = RawConfigDoc::default();

    if let Some(order) = value.get("order").and_then(|v| v.as_array()) {
        doc.order = order
            .iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect();
    }

    let Some(plugins_table) = value.get("plugins").and_then(|v| v.as_table()) else {
        return Ok(doc);
    };

    for (name, plugin_value) in plugins_table {
        let plugin_config = plugin_config_from_toml(plugin_value)?;
        doc.plugins.insert(name.clone(), plugin_config);
    }

    Ok(doc)
}

fn plugin_config_from_toml(value: &toml::Value) -> Result<PluginConfig, toml::de::Error> {
    let mut pc = PluginConfig::default();

    if let Some(cmd) = value.get("cmd").and_then(|v| v.as_str()) {
        pc.command = cmd.to_owned();
    }
    if let Some(args) = value.get("args").and_then(|v| v.as_array()) {
        pc.args = args
            .iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect();
    }
    if let Some(true) = value.get("import_helper").and_then(|v| v.as_bool()) {
        pc.import_helper = true;
    }
    if let Some(true) = value.get("resource_opener").and_then(|v| v.as_bool()) {
        pc.resource_opener = true;
    }
    if let Some(true) = value.get("use_auth_env").and_then(|v| v.as_bool()) {
        pc.use_auth_env = true;
    }
    if let Some(config_table) = value.get("config").and_then(|v| v.as_table()) {
        for (k, v) in config_table {
            let json: JsonValue = toml_to_json(v);
            pc.config.insert(k.clone(), json);
        }
    }
    if let Some(refresh_table) = value.get("refresh") {
        pc.refresh = RefreshTrigger {
            on_workspace_change: refresh_table.get("onWorkspaceChange").and_then(|v| v.as_bool()),
            on_stack_change: refresh_table.get("onStackChange").and_then(|v| v.as_bool()),
            on_config_change: refresh_table.get("onConfigChange").and_then(|v| v.as_bool()),
        };
        pc.refresh_declared = true;
    }

    Ok(pc)
}

/// TOML has no null and distinguishes dates/times from strings; everything
/// else maps onto JSON directly. Dates are flattened to their TOML string
/// representation since the fingerprint/wire layers only need a stable,
/// comparable encoding, not a typed calendar value.
pub(crate) fn toml_to_json(value: &toml::Value) -> JsonValue {
    match value {
        toml::Value::String(s) => JsonValue::String(s.clone()),
        toml::Value::Integer(i) => JsonValue::Number((*i).into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        toml::Value::Boolean(b) => JsonValue::Bool(*b),
        toml::Value::Datetime(d) => JsonValue::String(d.to_string()),
        toml::Value::Array(arr) => JsonValue::Array(arr.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            let map = table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect();
            JsonValue::Object(map)
        }
    }
}
