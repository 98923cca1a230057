// SPDX-License-Identifier: Apache-2.0
//! The `string -> any` to `string -> string` flattening applied only at the
//! subprocess RPC boundary.
//! The richer in-memory form is what fingerprinting and merging operate on;
//! this conversion must never run before that, or distinct values that
//! happen to flatten identically would be indistinguishable too early.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

use crate::config::ConfigValue;

pub fn flatten_config(config: &HashMap<String, ConfigValue>) -> HashMap<String, String> {
    config
        .iter()
        .map(|(k, v)| (k.clone(), flatten_value(v)))
        .collect()
}

fn flatten_value(value: &ConfigValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Null => String::new(),
        // Arrays/objects have no canonical textual form of their own; a
        // compact JSON literal is at least stable and round-trippable by a
        // plugin that cares to parse it back.
        other => other.to_string(),
    }
}
