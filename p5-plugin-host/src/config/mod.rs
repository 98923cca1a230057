// SPDX-License-Identifier: Apache-2.0
//! `ConfigStore`: loads and merges the global file, the program file, and
//! per-stack overlays into a [`MergedConfig`].

mod fingerprint;
mod merge;
mod stack;
mod types;

pub use fingerprint::hash_config;
pub use merge::merge;
pub use stack::StackOverlay;
pub use types::{ConfigValue, MergedConfig, PluginConfig, RefreshTrigger};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// `p5:plugins` is the well-known key under which both the program file's
/// embedding document and a stack's `config` section nest plugin config.
pub const PROGRAM_CONFIG_KEY: &str = "p5";
pub const STACK_PLUGINS_KEY: &str = "p5:plugins";

/// The two documents plus any stack overlay, merged into one [`MergedConfig`]
/// plus whatever stack-level secrets-provider string was declared.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    pub merged: MergedConfig,
    pub secrets_provider: Option<String>,
}

impl ConfigStore {
    /// Load the global file (nearest VCS root, else `work_dir`) and the
    /// program file (the document embedded under [`PROGRAM_CONFIG_KEY`]),
    /// and merge them. Absence of either file yields an empty document for
    /// that side; a present-but-unparseable file is fatal.
    pub fn load(work_dir: &Path, program_document: Option<&toml::Value>) -> Result<ConfigStore> {
        let global_path = find_global_config_path(work_dir);
        let global = match &global_path {
            Some(path) => load_raw_config(path)?,
            None => RawConfigDoc::default(),
        };

        let program = match program_document {
            Some(doc) => extract_program_config(doc)?,
            None => RawConfigDoc::default(),
        };

        let merged = merge(&global, &program);

        Ok(ConfigStore {
            merged,
            secrets_provider: None,
        })
    }

    /// Load the stack-scoped overlay for `stack_name` under `work_dir`, if a
    /// `Pulumi.<stack>.(yaml|yml)` file exists there. A missing file is not
    /// an error.
    pub fn load_stack_overlay(
        work_dir: &Path,
        stack_name: &str,
    ) -> Result<stack::StackOverlay> {
        stack::load(work_dir, stack_name)
    }

    /// Produce the ordered enumeration of plugins: `order` entries that
    /// name a declared plugin, in declared order (skipping duplicates and
    /// entries absent from the plugin map), followed by every remaining
    /// plugin in unspecified order.
    pub fn ordered_plugin_names(&self) -> Vec<String> {
        ordered_enumeration(&self.merged)
    }
}

/// Raw, pre-merge view of one document's `{plugins, order}` shape, with
/// plugin config values still in their richer (non-string) form.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawConfigDoc {
    pub plugins: HashMap<String, PluginConfig>,
    pub order: Vec<String>,
}

fn find_global_config_path(work_dir: &Path) -> Option<PathBuf> {
    let vcs_root = find_vcs_root(work_dir);
    let candidates = [vcs_root.as_deref(), Some(work_dir)];
    for dir in candidates.into_iter().flatten() {
        let candidate = dir.join("P5.toml");
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn find_vcs_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => return None,
        }
    }
}

fn load_raw_config(path: &Path) -> Result<RawConfigDoc> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::config(Some(path.to_path_buf()), e))?;
    let value: toml::Value =
        toml::from_str(&text).map_err(|e| Error::config(Some(path.to_path_buf()), e))?;
    types::doc_from_toml_value(&value)
        .map_err(|e| Error::config(Some(path.to_path_buf()), e))
}

/// Extract the `p5` subtree of an already-parsed program document (e.g. a
/// project file the embedding application parsed for its own purposes) and
/// re-parse it as the `{plugins, order}` shape.
fn extract_program_config(doc: &toml::Value) -> Result<RawConfigDoc> {
    let Some(sub) = doc.get(PROGRAM_CONFIG_KEY) else {
        return Ok(RawConfigDoc::default());
    };
    types::doc_from_toml_value(sub).map_err(|e| Error::config(None, e))
}

/// Produce the ordered enumeration directly from a [`MergedConfig`], for
/// callers (like `Manager`) that hold one without a full `ConfigStore`.
pub fn ordered_enumeration(merged: &MergedConfig) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for name in &merged.order {
        if merged.plugins.contains_key(name) && seen.insert(name.clone()) {
            out.push(name.clone());
        }
    }

    // Remaining plugins, stable order by name so the "unspecified order" is
    // at least deterministic within a process (HashMap iteration is not).
    let mut rest: Vec<&String> = merged
        .plugins
        .keys()
        .filter(|name| !seen.contains(*name))
        .collect();
    rest.sort();
    out.extend(rest.into_iter().cloned());

    out
}
