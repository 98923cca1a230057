// SPDX-License-Identifier: Apache-2.0
//! `PluginRegistry`: the process-wide catalog of built-in plugins,
//! populated by self-registration at program start.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::capabilities::{Authenticator, ImportHelper, ResourceOpener};

/// A built-in plugin's capability bundle. Built directly with its
/// capability slots rather than via a single trait object with downcasting,
/// modeling the three capabilities as optional references rather than an
/// inheritance hierarchy.
pub struct BuiltinPlugin {
    pub name: String,
    pub authenticator: Arc<dyn Authenticator>,
    pub import_helper: Option<Arc<dyn ImportHelper>>,
    pub resource_opener: Option<Arc<dyn ResourceOpener>>,
}

impl BuiltinPlugin {
    pub fn new(name: impl Into<String>, authenticator: Arc<dyn Authenticator>) -> Self {
        BuiltinPlugin {
            name: name.into(),
            authenticator,
            import_helper: None,
            resource_opener: None,
        }
    }

    pub fn with_import_helper(mut self, helper: Arc<dyn ImportHelper>) -> Self {
        self.import_helper = Some(helper);
        self
    }

    pub fn with_resource_opener(mut self, opener: Arc<dyn ResourceOpener>) -> Self {
        self.resource_opener = Some(opener);
        self
    }
}

type Catalog = HashMap<String, Arc<BuiltinPlugin>>;

static REGISTRY: OnceLock<RwLock<Catalog>> = OnceLock::new();

fn catalog() -> &'static RwLock<Catalog> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register a built-in plugin. Registration order is immaterial. Later
/// registrations for the same name replace earlier ones, which is useful
/// for test fixtures but otherwise not relied upon.
pub fn register(plugin: BuiltinPlugin) {
    let name = plugin.name.clone();
    catalog()
        .write()
        .expect("plugin registry lock poisoned")
        .insert(name, Arc::new(plugin));
}

pub fn get(name: &str) -> Option<Arc<BuiltinPlugin>> {
    catalog()
        .read()
        .expect("plugin registry lock poisoned")
        .get(name)
        .cloned()
}

pub fn exists(name: &str) -> bool {
    catalog()
        .read()
        .expect("plugin registry lock poisoned")
        .contains_key(name)
}

pub fn list() -> Vec<String> {
    catalog()
        .read()
        .expect("plugin registry lock poisoned")
        .keys()
        .cloned()
        .collect()
}

/// Swap the entire catalog out for `replacement`, run `body`, then restore
/// the original catalog. This is the seam test isolation needs so tests
/// can register fixture plugins without leaking them across tests.
pub fn with_test_registry<F, R>(replacement: Catalog, body: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = std::mem::replace(
        &mut *catalog().write().expect("plugin registry lock poisoned"),
        replacement,
    );
    let result = body();
    *catalog().write().expect("plugin registry lock poisoned") = previous;
    result
}
