// SPDX-License-Identifier: Apache-2.0
//! The three orthogonal plugin capabilities: `Authenticator` (required),
//! `ImportHelper` and `ResourceOpener` (optional). Built-ins and subprocess
//! plugins both dispense these as plain trait objects. Nothing above
//! `PluginInstance` branches on whether a given capability came from a
//! built-in or an RPC call.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::ConfigValue;

#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    pub program_config: HashMap<String, ConfigValue>,
    pub stack_config: HashMap<String, ConfigValue>,
    pub stack_name: String,
    pub program_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct AuthResponse {
    pub success: bool,
    pub env: HashMap<String, String>,
    pub ttl_seconds: i32,
    pub error: String,
}

/// Required capability: given the current program/stack configuration and
/// identifiers, return an environment-variable mapping plus a TTL hint.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> AuthResponse;
}

#[derive(Debug, Clone, Default)]
pub struct ImportSuggestionsRequest {
    pub resource_type: String,
    pub resource_name: String,
    pub resource_urn: String,
    pub parent_urn: String,
    pub inputs: HashMap<String, String>,
    pub program_config: HashMap<String, ConfigValue>,
    pub stack_config: HashMap<String, ConfigValue>,
    pub stack_name: String,
    pub program_name: String,
    /// Populated only when the plugin's declaration sets `use_auth_env = true`.
    pub auth_env: Option<HashMap<String, String>>,
    pub provider_urn: String,
    pub provider_inputs: HashMap<String, String>,
}

/// One suggested import identifier for a resource. Identifier must be
/// non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSuggestion {
    pub id: String,
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportSuggestionsResponse {
    pub can_provide: bool,
    pub suggestions: Vec<ImportSuggestion>,
    pub error: Option<String>,
}

/// Optional capability: suggest import IDs for a resource.
#[async_trait]
pub trait ImportHelper: Send + Sync {
    async fn get_import_suggestions(
        &self,
        request: &ImportSuggestionsRequest,
    ) -> ImportSuggestionsResponse;
}

#[derive(Debug, Clone, Default)]
pub struct OpenResourceRequest {
    pub resource_type: String,
    pub resource_name: String,
    pub resource_urn: String,
    pub provider_urn: String,
    pub provider_inputs: HashMap<String, String>,
    pub inputs: HashMap<String, String>,
    pub outputs: HashMap<String, String>,
    pub program_config: HashMap<String, ConfigValue>,
    pub stack_config: HashMap<String, ConfigValue>,
    pub stack_name: String,
    pub program_name: String,
    pub auth_env: Option<HashMap<String, String>>,
}

/// Tagged variant: exactly one of `Browser`/`Exec` is populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenAction {
    Browser {
        url: String,
    },
    Exec {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct OpenResourceResponse {
    pub can_open: bool,
    pub action: Option<OpenAction>,
    pub error: Option<String>,
}

/// Optional capability: advertise which resource types can be "opened"
/// (e.g. in a cloud console) and perform that open.
#[async_trait]
pub trait ResourceOpener: Send + Sync {
    /// Regular-expression patterns describing resource types this opener
    /// can handle.
    async fn get_supported_open_types(&self) -> Vec<String>;

    async fn open_resource(&self, request: &OpenResourceRequest) -> OpenResourceResponse;
}
