// SPDX-License-Identifier: Apache-2.0
//! Stack overlay loading: `<workDir>/Pulumi.<stack>.(yaml|yml)`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};

use super::types::ConfigValue;
use super::STACK_PLUGINS_KEY;

/// The per-plugin config sections found under `config -> p5:plugins -> *`
/// in a stack overlay file, plus the optional top-level secrets provider.
#[derive(Debug, Clone, Default)]
pub struct StackOverlay {
    pub plugin_config: HashMap<String, HashMap<String, ConfigValue>>,
    pub secrets_provider: Option<String>,
}

impl StackOverlay {
    pub fn config_for(&self, plugin_name: &str) -> HashMap<String, ConfigValue> {
        self.plugin_config.get(plugin_name).cloned().unwrap_or_default()
    }
}

pub(crate) fn load(work_dir: &Path, stack_name: &str) -> Result<StackOverlay> {
    let Some(path) = find_overlay_path(work_dir, stack_name) else {
        return Ok(StackOverlay::default());
    };

    let text = std::fs::read_to_string(&path).map_err(|e| Error::config(Some(path.clone()), e))?;
    let doc: YamlValue =
        serde_yaml::from_str(&text).map_err(|e| Error::config(Some(path.clone()), e))?;

    let secrets_provider = doc
        .get("secretsprovider")
        .and_then(|v| v.as_str())
        .map(str::to_owned);

    let mut plugin_config = HashMap::new();

    if let Some(plugins_node) = doc
        .get("config")
        .and_then(|c| c.get(STACK_PLUGINS_KEY))
        .and_then(|v| v.as_mapping())
    {
        for (name_key, plugin_value) in plugins_node {
            let Some(name) = name_key.as_str() else {
                continue;
            };
            let resolved = resolve_plugin_section(plugin_value);
            plugin_config.insert(name.to_owned(), resolved);
        }
    }

    Ok(StackOverlay {
        plugin_config,
        secrets_provider,
    })
}

/// A plugin's section is either the mapping itself, or, if it contains a
/// nested `config` key, that nested mapping instead.
fn resolve_plugin_section(value: &YamlValue) -> HashMap<String, ConfigValue> {
    let effective = value.get("config").unwrap_or(value);
    yaml_mapping_to_json_map(effective)
}

fn yaml_mapping_to_json_map(value: &YamlValue) -> HashMap<String, ConfigValue> {
    let Some(mapping) = value.as_mapping() else {
        return HashMap::new();
    };
    mapping
        .iter()
        .filter_map(|(k, v)| {
            let key = k.as_str()?.to_owned();
            Some((key, yaml_to_json(v)))
        })
        .collect()
}

fn yaml_to_json(value: &YamlValue) -> ConfigValue {
    match value {
        YamlValue::Null => serde_json::Value::Null,
        YamlValue::Bool(b) => serde_json::Value::Bool(*b),
        YamlValue::Number(n) => serde_json::to_value(n).unwrap_or(serde_json::Value::Null),
        YamlValue::String(s) => serde_json::Value::String(s.clone()),
        YamlValue::Sequence(seq) => serde_json::Value::Array(seq.iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(map) => {
            let obj = map
                .iter()
                .filter_map(|(k, v)| Some((k.as_str()?.to_owned(), yaml_to_json(v))))
                .collect();
            serde_json::Value::Object(obj)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

fn find_overlay_path(work_dir: &Path, stack_name: &str) -> Option<PathBuf> {
    for ext in ["yaml", "yml"] {
        let candidate = work_dir.join(format!("Pulumi.{stack_name}.{ext}"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_overlay_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let overlay = load(dir.path(), "dev").unwrap();
        assert!(overlay.plugin_config.is_empty());
        assert!(overlay.secrets_provider.is_none());
    }

    #[test]
    fn parses_nested_config_key_and_secrets_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Pulumi.dev.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
secretsprovider: "awskms://alias/foo"
config:
  p5:plugins:
    aws:
      config:
        region: us-west-2
        role: my-role
    kubernetes:
      context: my-context
"#
        )
        .unwrap();

        let overlay = load(dir.path(), "dev").unwrap();
        assert_eq!(
            overlay.secrets_provider.as_deref(),
            Some("awskms://alias/foo")
        );
        let aws = overlay.config_for("aws");
        assert_eq!(aws.get("region").unwrap(), "us-west-2");
        assert_eq!(aws.get("role").unwrap(), "my-role");

        let k8s = overlay.config_for("kubernetes");
        assert_eq!(k8s.get("context").unwrap(), "my-context");
    }

    #[test]
    fn yml_extension_is_also_recognized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Pulumi.prod.yml");
        std::fs::write(&path, "config:\n  p5:plugins:\n    gcp:\n      project: my-proj\n").unwrap();
        let overlay = load(dir.path(), "prod").unwrap();
        assert_eq!(overlay.config_for("gcp").get("project").unwrap(), "my-proj");
    }
}
