// SPDX-License-Identifier: Apache-2.0
//! `PluginInstance`: the uniform handle over a built-in or subprocess
//! plugin that everything above this module operates on.

use std::sync::Arc;

use crate::capabilities::{Authenticator, ImportHelper, ResourceOpener};
use crate::config::PluginConfig;
use crate::error::{Error, Result};
use crate::registry;

use super::process::PluginProcess;
use super::subprocess::{dispense, SubprocessAuthenticator, SubprocessImportHelper, SubprocessResourceOpener};

pub struct PluginInstance {
    pub name: String,
    pub built_in: bool,
    pub authenticator: Arc<dyn Authenticator>,
    pub import_helper: Option<Arc<dyn ImportHelper>>,
    pub resource_opener: Option<Arc<dyn ResourceOpener>>,
    pub use_auth_env: bool,
    /// `Some` iff not built-in.
    process: Option<Arc<PluginProcess>>,
}

impl PluginInstance {
    /// Look the plugin up in [`registry`]; the returned object's
    /// authenticator is always used, the optional capability slots are
    /// filled only when both the declaration asks for them and the
    /// built-in actually offers them.
    pub fn from_builtin(name: &str, declared: &PluginConfig) -> Result<Self> {
        let builtin = registry::get(name).ok_or_else(|| Error::UnrunnablePlugin(name.to_owned()))?;

        Ok(PluginInstance {
            name: name.to_owned(),
            built_in: true,
            authenticator: builtin.authenticator.clone(),
            import_helper: declared
                .import_helper
                .then(|| builtin.import_helper.clone())
                .flatten(),
            resource_opener: declared
                .resource_opener
                .then(|| builtin.resource_opener.clone())
                .flatten(),
            use_auth_env: declared.use_auth_env,
            process: None,
        })
    }

    /// Spawn the child, perform the handshake, and dispense capabilities.
    /// Failure to dispense "auth" is fatal (the instance cannot be used at
    /// all); failure to dispense an optional capability only leaves that
    /// slot empty.
    pub async fn from_subprocess(name: &str, declared: &PluginConfig) -> Result<Self> {
        let process = Arc::new(PluginProcess::spawn(name, &declared.command, &declared.args).await?);

        let auth_available = dispense(&process, "auth")
            .await
            .map_err(|e| Error::plugin_load(name, e))?;
        if !auth_available {
            return Err(Error::plugin_load(
                name,
                std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "plugin did not dispense the required 'auth' capability",
                ),
            ));
        }
        let authenticator: Arc<dyn Authenticator> =
            Arc::new(SubprocessAuthenticator::new(process.clone()));

        let import_helper = if declared.import_helper {
            dispense_optional(&process, "import_helper", name, |p| {
                Arc::new(SubprocessImportHelper::new(p)) as Arc<dyn ImportHelper>
            })
            .await
        } else {
            None
        };

        let resource_opener = if declared.resource_opener {
            dispense_optional(&process, "resource_opener", name, |p| {
                Arc::new(SubprocessResourceOpener::new(p)) as Arc<dyn ResourceOpener>
            })
            .await
        } else {
            None
        };

        Ok(PluginInstance {
            name: name.to_owned(),
            built_in: false,
            authenticator,
            import_helper,
            resource_opener,
            use_auth_env: declared.use_auth_env,
            process: Some(process),
        })
    }

    /// Idempotent; safe even if the instance was never used for anything.
    pub async fn close(&self) {
        if let Some(process) = &self.process {
            process.close().await;
        }
    }
}

/// Dispense an optional capability, downgrading any failure (dispense
/// reporting unavailable, or a transport error) to "not available" rather
/// than propagating. A failure on an optional capability is never fatal.
async fn dispense_optional<T, F>(
    process: &Arc<PluginProcess>,
    capability: &str,
    plugin_name: &str,
    build: F,
) -> Option<Arc<T>>
where
    T: ?Sized,
    F: FnOnce(Arc<PluginProcess>) -> Arc<T>,
{
    match dispense(process, capability).await {
        Ok(true) => Some(build(process.clone())),
        Ok(false) => None,
        Err(e) => {
            log::warn!(
                "plugin '{plugin_name}' capability '{capability}' unavailable: {e}"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{AuthRequest, AuthResponse};
    use crate::registry::{with_test_registry, BuiltinPlugin};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use test_log::test;

    struct AlwaysSucceeds;

    #[async_trait]
    impl Authenticator for AlwaysSucceeds {
        async fn authenticate(&self, _request: &AuthRequest) -> AuthResponse {
            AuthResponse {
                success: true,
                env: HashMap::new(),
                ttl_seconds: 0,
                error: String::new(),
            }
        }
    }

    #[test(tokio::test)]
    async fn builtin_lookup_fails_with_unrunnable_plugin_error() {
        let err = PluginInstance::from_builtin("not-registered", &PluginConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::UnrunnablePlugin(_)));
    }

    #[test(tokio::test)]
    async fn builtin_without_import_helper_flag_leaves_slot_empty() {
        let mut catalog = HashMap::new();
        catalog.insert(
            "fixture".to_owned(),
            Arc::new(BuiltinPlugin::new("fixture", Arc::new(AlwaysSucceeds))),
        );

        with_test_registry(catalog, || {
            let declared = PluginConfig::default(); // import_helper: false
            let instance = PluginInstance::from_builtin("fixture", &declared).unwrap();
            assert!(instance.import_helper.is_none());
            assert!(instance.built_in);
        });
    }
}
