// SPDX-License-Identifier: Apache-2.0
//! Registration of the host's compiled-in plugins.
//!
//! Each built-in self-registers into [`crate::registry`] the same way
//! `register_builtin_providers` populates a `ProviderRegistry` in a
//! provider-plugin system: one function, called once at process start, that
//! inserts every built-in by name. Registration order is immaterial.

mod console_opener;
mod env_file;

use std::sync::Arc;

use crate::registry::{self, BuiltinPlugin};

/// Register every compiled-in plugin. Idempotent: calling it twice simply
/// re-registers the same names.
pub fn register_builtin_plugins() {
    registry::register(BuiltinPlugin::new(
        env_file::NAME,
        Arc::new(env_file::EnvFileAuthenticator),
    ));

    registry::register(
        BuiltinPlugin::new(
            console_opener::NAME,
            Arc::new(console_opener::ConsoleOpener),
        )
        .with_resource_opener(Arc::new(console_opener::ConsoleOpener)),
    );
}
