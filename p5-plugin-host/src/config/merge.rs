// SPDX-License-Identifier: Apache-2.0
//! Field-by-field merge of a program document over a global document.

use super::types::{MergedConfig, PluginConfig, RefreshTrigger};
use super::RawConfigDoc;

/// Merge `program` over `global`. Every global plugin is preserved; each
/// program plugin's non-empty fields overlay it (or are used as-is if the
/// plugin is new); `order` takes program's if non-empty, else global's.
pub fn merge(global: &RawConfigDoc, program: &RawConfigDoc) -> MergedConfig {
    let mut plugins = global.plugins.clone();

    for (name, override_cfg) in &program.plugins {
        match plugins.get(name) {
            Some(base_cfg) => {
                let merged = merge_plugin_config(base_cfg, override_cfg);
                plugins.insert(name.clone(), merged);
            }
            None => {
                plugins.insert(name.clone(), override_cfg.clone());
            }
        }
    }

    let order = if !program.order.is_empty() {
        program.order.clone()
    } else {
        global.order.clone()
    };

    MergedConfig { plugins, order }
}

fn merge_plugin_config(base: &PluginConfig, over: &PluginConfig) -> PluginConfig {
    let command = if !over.command.is_empty() {
        over.command.clone()
    } else {
        base.command.clone()
    };

    let args = if !over.args.is_empty() {
        over.args.clone()
    } else {
        base.args.clone()
    };

    let mut config = base.config.clone();
    for (k, v) in &over.config {
        config.insert(k.clone(), v.clone());
    }

    let refresh = RefreshTrigger::merge(
        base.refresh,
        over.refresh_declared.then_some(over.refresh),
    );

    // Capability flags are asymmetric: `true` wins, `false` in the override
    // cannot disable a `true` set by the base. This is intentional and must
    // be preserved even though it means global cannot be overridden-off by
    // program for a capability program leaves false, since absence and
    // `false` are indistinguishable at this boundary.
    let import_helper = base.import_helper || over.import_helper;
    let resource_opener = base.resource_opener || over.resource_opener;
    let use_auth_env = base.use_auth_env || over.use_auth_env;

    PluginConfig {
        command,
        args,
        config,
        refresh,
        import_helper,
        resource_opener,
        use_auth_env,
        refresh_declared: base.refresh_declared || over.refresh_declared,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc_with(name: &str, pc: PluginConfig, order: &[&str]) -> RawConfigDoc {
        let mut doc = RawConfigDoc::default();
        doc.plugins.insert(name.to_owned(), pc);
        doc.order = order.iter().map(|s| s.to_string()).collect();
        doc
    }

    #[test]
    fn merge_overlays_program_config_onto_global_keeping_base_only_keys() {
        // global: aws {cmd:"/global/aws", config:{region:"eu-west-1", profile:"default"}}
        let mut global_aws = PluginConfig::default();
        global_aws.command = "/global/aws".to_owned();
        global_aws.config.insert("region".into(), json!("eu-west-1"));
        global_aws.config.insert("profile".into(), json!("default"));
        let global = doc_with("aws", global_aws, &[]);

        // program: aws {config:{region:"us-west-2", role:"my-role"}}
        let mut program_aws = PluginConfig::default();
        program_aws.config.insert("region".into(), json!("us-west-2"));
        program_aws.config.insert("role".into(), json!("my-role"));
        let program = doc_with("aws", program_aws, &[]);

        let merged = merge(&global, &program);
        let aws = merged.plugins.get("aws").unwrap();

        assert_eq!(aws.command, "/global/aws");
        assert_eq!(aws.config.get("region").unwrap(), &json!("us-west-2"));
        assert_eq!(aws.config.get("profile").unwrap(), &json!("default"));
        assert_eq!(aws.config.get("role").unwrap(), &json!("my-role"));
    }

    #[test]
    fn order_prefers_program_when_non_empty() {
        let global = doc_with("aws", PluginConfig::default(), &["aws", "gcp"]);
        let program = doc_with("gcp", PluginConfig::default(), &["gcp"]);
        let merged = merge(&global, &program);
        assert_eq!(merged.order, vec!["gcp".to_string()]);
    }

    #[test]
    fn order_falls_back_to_global_when_program_empty() {
        let global = doc_with("aws", PluginConfig::default(), &["aws"]);
        let program = RawConfigDoc::default();
        let merged = merge(&global, &program);
        assert_eq!(merged.order, vec!["aws".to_string()]);
    }

    #[test]
    fn false_in_program_cannot_disable_true_in_global() {
        let mut global_aws = PluginConfig::default();
        global_aws.import_helper = true;
        let global = doc_with("aws", global_aws, &[]);

        // program leaves import_helper false (the default, indistinguishable
        // from "not specified" at this boundary) -- must not disable it.
        let program = doc_with("aws", PluginConfig::default(), &[]);

        let merged = merge(&global, &program);
        assert!(merged.plugins.get("aws").unwrap().import_helper);
    }

    #[test]
    fn refresh_trigger_overrides_wholesale_when_declared() {
        let mut global_aws = PluginConfig::default();
        global_aws.refresh = RefreshTrigger {
            on_workspace_change: Some(true),
            on_stack_change: Some(true),
            on_config_change: Some(true),
        };
        global_aws.refresh_declared = true;
        let global = doc_with("aws", global_aws, &[]);

        let mut program_aws = PluginConfig::default();
        program_aws.refresh = RefreshTrigger {
            on_workspace_change: Some(false),
            on_stack_change: None,
            on_config_change: None,
        };
        program_aws.refresh_declared = true;
        let program = doc_with("aws", program_aws, &[]);

        let merged = merge(&global, &program);
        let trigger = merged.plugins.get("aws").unwrap().refresh;
        // program's trigger wins wholesale: on_stack_change/on_config_change
        // fall back to RefreshTrigger's own defaults, not global's values.
        assert_eq!(trigger.on_workspace_change(), false);
        assert_eq!(trigger.on_stack_change(), true);
        assert_eq!(trigger.on_config_change(), false);
    }
}
