// SPDX-License-Identifier: Apache-2.0
//! `Manager`: orchestrates config loading, plugin lifecycle, parallel
//! authentication, and context-change-driven invalidation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::RwLock;
use tokio::task::JoinSet;

use crate::aggregator::{self, Candidate, SuggestionOutcome};
use crate::capabilities::{
    AuthRequest, ImportSuggestionsRequest, OpenResourceRequest, OpenResourceResponse,
};
use crate::config::{ConfigStore, ConfigValue, MergedConfig, StackOverlay};
use crate::context::AuthContext;
use crate::credentials::{Credentials, CredentialStore};
use crate::error::{Error, Result};
use crate::plugin::PluginInstance;
use crate::refresh;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Cached, non-expired credentials satisfied this plugin without a call.
    CacheHit,
    Authenticated,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct PerPluginResult {
    pub plugin: String,
    pub outcome: AuthOutcome,
}

#[derive(Debug, Clone)]
pub struct CredentialsSummaryEntry {
    pub plugin_name: String,
    pub env_var_names: Vec<String>,
    pub expires_at: Option<SystemTime>,
    pub always_refresh: bool,
}

/// Everything the readers-writer lock protects: the plugin map, credential
/// map, current context, and merged config. Nothing in here is ever
/// mutated except under the write side, and no plugin call happens while
/// either side of the lock is held.
struct ManagerState {
    work_dir: PathBuf,
    merged_config: MergedConfig,
    stack_overlay: StackOverlay,
    instances: HashMap<String, Arc<PluginInstance>>,
    credentials: CredentialStore,
    context: Option<AuthContext>,
}

impl Default for ManagerState {
    fn default() -> Self {
        ManagerState {
            work_dir: PathBuf::new(),
            merged_config: MergedConfig::default(),
            stack_overlay: StackOverlay::default(),
            instances: HashMap::new(),
            credentials: CredentialStore::new(),
            context: None,
        }
    }
}

pub struct Manager {
    state: RwLock<ManagerState>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    pub fn new() -> Self {
        Manager {
            state: RwLock::new(ManagerState::default()),
        }
    }

    /// Load config, (re)build instances, and authenticate everything.
    /// `program_document` is the embedding application's own already-parsed
    /// document, from which the `p5` subtree is extracted.
    pub async fn initialize(
        &self,
        work_dir: &Path,
        program_name: &str,
        stack_name: &str,
        program_document: Option<&toml::Value>,
    ) -> Result<Vec<PerPluginResult>> {
        let config_store = ConfigStore::load(work_dir, program_document)?;
        let stack_overlay = ConfigStore::load_stack_overlay(work_dir, stack_name)?;
        let ordered_names = config_store.ordered_plugin_names();

        // Close whatever was previously loaded before building the new set,
        // so a reload never leaks subprocesses. Credentials are untouched:
        // their lifecycle is governed by TTL/invalidation, not by reload,
        // so a plugin with still-fresh credentials cache-hits the
        // `authenticate_all` call below instead of re-authenticating.
        self.release_instances().await;

        let mut loaded: Vec<(String, PluginInstance)> = Vec::new();
        for name in &ordered_names {
            let declared = config_store
                .merged
                .plugins
                .get(name)
                .expect("ordered_plugin_names only yields declared plugins");

            let instance_result = if declared.is_builtin_only() {
                PluginInstance::from_builtin(name, declared)
            } else {
                PluginInstance::from_subprocess(name, declared).await
            };

            match instance_result {
                Ok(instance) => loaded.push((name.clone(), instance)),
                Err(source) => {
                    let rolled_back = loaded.len();
                    for (_, instance) in &loaded {
                        instance.close().await;
                    }
                    return Err(Error::PluginLoadBatch {
                        rolled_back,
                        source: Box::new(source),
                    });
                }
            }
        }

        {
            let mut state = self.state.write().await;
            state.work_dir = work_dir.to_path_buf();
            state.merged_config = config_store.merged;
            state.stack_overlay = stack_overlay;
            state.instances = loaded
                .into_iter()
                .map(|(name, instance)| (name, Arc::new(instance)))
                .collect();
        }

        self.authenticate_all(program_name, stack_name).await
    }

    /// Authenticate every declared plugin not already holding fresh
    /// credentials. Follows a snapshot/release/reacquire protocol: plugin
    /// calls happen with no lock held at all.
    pub async fn authenticate_all(
        &self,
        program_name: &str,
        stack_name: &str,
    ) -> Result<Vec<PerPluginResult>> {
        struct Snapshot {
            name: String,
            instance: Arc<PluginInstance>,
            program_config: HashMap<String, ConfigValue>,
            stack_config: HashMap<String, ConfigValue>,
        }

        let (to_call, mut results, order, mut fingerprints): (
            Vec<Snapshot>,
            Vec<PerPluginResult>,
            Vec<String>,
            HashMap<String, String>,
        ) = {
            let state = self.state.read().await;
            let now = SystemTime::now();
            let mut to_call = Vec::new();
            let mut collected_results = Vec::new();
            // Task-submission order follows the declared plugin order,
            // not `instances`' HashMap iteration order.
            let order = crate::config::ordered_enumeration(&state.merged_config);
            // Seed from the previous context so a cache-hit plugin keeps its
            // fingerprint entry; only plugins actually re-authenticated this
            // round overwrite theirs below.
            let mut fingerprints = state
                .context
                .as_ref()
                .map(|c| c.fingerprints.clone())
                .unwrap_or_default();

            for name in &order {
                if state.credentials.has_fresh(name, now) {
                    collected_results.push(PerPluginResult {
                        plugin: name.clone(),
                        outcome: AuthOutcome::CacheHit,
                    });
                    continue;
                }
                let Some(instance) = state.instances.get(name) else {
                    fingerprints.remove(name);
                    continue;
                };
                let program_config = state
                    .merged_config
                    .plugins
                    .get(name)
                    .map(|pc| pc.config.clone())
                    .unwrap_or_default();
                let stack_config = state.stack_overlay.config_for(name);
                to_call.push(Snapshot {
                    name: name.clone(),
                    instance: instance.clone(),
                    program_config,
                    stack_config,
                });
            }
            (to_call, collected_results, order, fingerprints)
        };

        let mut join_set = JoinSet::new();

        for snapshot in to_call {
            let program_name = program_name.to_owned();
            let stack_name = stack_name.to_owned();
            join_set.spawn(async move {
                let fingerprint = crate::config::hash_config(
                    &snapshot.program_config,
                    &snapshot.stack_config,
                );
                let request = AuthRequest {
                    program_config: snapshot.program_config,
                    stack_config: snapshot.stack_config,
                    stack_name,
                    program_name,
                };
                let response = snapshot.instance.authenticator.authenticate(&request).await;
                (snapshot.name, fingerprint, response)
            });
        }

        let now = SystemTime::now();
        let mut to_insert = Vec::new();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((name, fingerprint, response)) => {
                    fingerprints.insert(name.clone(), fingerprint);
                    if response.success {
                        let credentials =
                            Credentials::from_ttl(name.clone(), response.env, response.ttl_seconds, now);
                        to_insert.push(credentials);
                        results.push(PerPluginResult {
                            plugin: name,
                            outcome: AuthOutcome::Authenticated,
                        });
                    } else {
                        results.push(PerPluginResult {
                            plugin: name,
                            outcome: AuthOutcome::Failed(response.error),
                        });
                    }
                }
                Err(join_error) => {
                    // A panicking task is equivalent to an exception from
                    // the call; its plugin name is unknown by this point,
                    // so record it generically rather than drop it.
                    results.push(PerPluginResult {
                        plugin: "<unknown>".to_owned(),
                        outcome: AuthOutcome::Failed(join_error.to_string()),
                    });
                }
            }
        }

        {
            let mut state = self.state.write().await;
            for credentials in to_insert {
                state.credentials.upsert(credentials);
            }
            state.context = Some(AuthContext::new(
                state.work_dir.clone(),
                stack_name,
                program_name,
                fingerprints,
            ));
        }

        // Stable order: the declared order first, for whichever entries are
        // present in `results`, then anything else (cache hits interleave
        // with this already since both loops pushed in declared order).
        results.sort_by_key(|r| order.iter().position(|n| n == &r.plugin).unwrap_or(usize::MAX));

        Ok(results)
    }

    /// Pure decision, consulting only the stored context and config, no
    /// plugin call.
    pub async fn should_refresh_credentials(
        &self,
        name: &str,
        new_work_dir: &Path,
        new_stack_name: &str,
        new_program_config: &HashMap<String, ConfigValue>,
        new_stack_config: &HashMap<String, ConfigValue>,
    ) -> bool {
        let state = self.state.read().await;
        let trigger = state
            .merged_config
            .plugins
            .get(name)
            .map(|pc| pc.refresh)
            .unwrap_or_default();

        refresh::should_refresh(state.context.as_ref(), new_work_dir, new_stack_name, trigger, || {
            let old_fingerprint = state.context.as_ref().and_then(|c| c.fingerprints.get(name));
            let new_fingerprint = crate::config::hash_config(new_program_config, new_stack_config);
            match old_fingerprint {
                Some(fp) => fp != &new_fingerprint,
                None => true,
            }
        })
    }

    /// Drop credentials for every plugin whose trigger fires against the
    /// workspace/stack deltas alone. Unlike `should_refresh_credentials`,
    /// this does not consult config fingerprints.
    pub async fn invalidate_credentials_for_context(&self, new_work_dir: &Path, new_stack_name: &str) {
        let mut state = self.state.write().await;
        let Some(previous) = state.context.clone() else {
            return;
        };

        let workspace_changed = previous.workspace_changed(&new_work_dir.to_path_buf());
        let stack_changed = previous.stack_changed(new_stack_name);

        let to_drop: Vec<String> = state
            .credentials
            .plugin_names()
            .filter(|name| {
                let trigger = state
                    .merged_config
                    .plugins
                    .get(*name)
                    .map(|pc| pc.refresh)
                    .unwrap_or_default();
                (workspace_changed && trigger.on_workspace_change())
                    || (stack_changed && trigger.on_stack_change())
            })
            .map(str::to_owned)
            .collect();

        for name in to_drop {
            state.credentials.remove(&name);
        }
    }

    pub async fn invalidate_credentials(&self, name: &str) {
        self.state.write().await.credentials.remove(name);
    }

    pub async fn invalidate_all_credentials(&self) {
        self.state.write().await.credentials.clear();
    }

    pub async fn get_merged_auth_env(&self) -> HashMap<String, String> {
        self.state.read().await.credentials.merged_auth_env(SystemTime::now())
    }

    pub async fn apply_env_to_process(&self) {
        for (key, value) in self.get_merged_auth_env().await {
            std::env::set_var(key, value);
        }
    }

    pub async fn get_credentials_summary(&self) -> Vec<CredentialsSummaryEntry> {
        let state = self.state.read().await;
        state
            .credentials
            .iter()
            .map(|c| CredentialsSummaryEntry {
                plugin_name: c.plugin_name.clone(),
                env_var_names: c.env.keys().cloned().collect(),
                expires_at: c.expires_at,
                always_refresh: c.always_refresh,
            })
            .collect()
    }

    /// Fan out to every plugin with a populated import-helper slot and
    /// gather every suggestion offered, tagged with its source plugin.
    /// One plugin's failure does not affect the others.
    pub async fn get_import_suggestions(
        &self,
        request: ImportSuggestionsRequest,
    ) -> Vec<SuggestionOutcome> {
        let (candidates, auth_env): (
            Vec<Candidate<dyn crate::capabilities::ImportHelper, ImportSuggestionsRequest>>,
            _,
        ) = {
            let state = self.state.read().await;
            let candidates = state
                .instances
                .values()
                .filter_map(|instance| {
                    let helper = instance.import_helper.clone()?;
                    let mut req = request.clone();
                    req.program_config = state
                        .merged_config
                        .plugins
                        .get(&instance.name)
                        .map(|pc| pc.config.clone())
                        .unwrap_or_default();
                    req.stack_config = state.stack_overlay.config_for(&instance.name);
                    req.auth_env = None;
                    Some(Candidate {
                        plugin_name: instance.name.clone(),
                        capability: helper,
                        request: req,
                        use_auth_env: instance.use_auth_env,
                    })
                })
                .collect();
            (candidates, state.credentials.merged_auth_env(SystemTime::now()))
        };

        aggregator::gather_import_suggestions(candidates, &auth_env).await
    }

    /// Iterate plugins with a populated resource-opener slot in declared
    /// order and return the first that reports it can open the resource.
    /// `None` means no plugin could open it.
    pub async fn open_resource(
        &self,
        request: OpenResourceRequest,
    ) -> Option<(String, OpenResourceResponse)> {
        let (candidates, auth_env): (
            Vec<Candidate<dyn crate::capabilities::ResourceOpener, OpenResourceRequest>>,
            _,
        ) = {
            let state = self.state.read().await;
            let order = crate::config::ordered_enumeration(&state.merged_config);
            let candidates = order
                .iter()
                .filter_map(|name| state.instances.get(name).map(|instance| (name, instance)))
                .filter_map(|(name, instance)| {
                    let opener = instance.resource_opener.clone()?;
                    let mut req = request.clone();
                    req.program_config = state
                        .merged_config
                        .plugins
                        .get(name)
                        .map(|pc| pc.config.clone())
                        .unwrap_or_default();
                    req.stack_config = state.stack_overlay.config_for(name);
                    req.auth_env = None;
                    Some(Candidate {
                        plugin_name: instance.name.clone(),
                        capability: opener,
                        request: req,
                        use_auth_env: instance.use_auth_env,
                    })
                })
                .collect();
            (candidates, state.credentials.merged_auth_env(SystemTime::now()))
        };

        aggregator::open_resource(candidates, &auth_env).await
    }

    /// Close every loaded instance and empty `state.instances`, leaving
    /// credentials untouched. Used both by the public `close` and by
    /// `initialize`, which rebuilds instances without discarding caches.
    async fn release_instances(&self) {
        let instances: Vec<Arc<PluginInstance>> = {
            let state = self.state.read().await;
            state.instances.values().cloned().collect()
        };
        for instance in &instances {
            instance.close().await;
        }

        let mut state = self.state.write().await;
        state.instances.clear();
    }

    /// Close every instance, then empty both instance and credential
    /// stores.
    pub async fn close(&self) {
        self.release_instances().await;
        self.state.write().await.credentials.clear();
    }
}
