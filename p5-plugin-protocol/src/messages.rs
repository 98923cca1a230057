// SPDX-License-Identifier: Apache-2.0
//! Message shapes exchanged between the plugin host and a subprocess plugin.
//!
//! These types describe *what* crosses the wire, not *how*. The handshake
//! and framing live in [`crate::framing`] and [`crate::handshake`]. Field
//! names mirror the plugin RPC surface so a plugin implementation in any
//! language can be checked against this shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Protocol version spoken by this crate. Bumped on any breaking change to
/// the message shapes below; a mismatched handshake is a fatal load error.
pub const PROTOCOL_VERSION: u32 = 1;

/// First message the host sends after spawning a plugin process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hello {
    pub protocol_version: u32,
}

/// Reply a well-behaved plugin sends to [`Hello`]. The `cookie` is an
/// opaque value the plugin invents and the host does not interpret beyond
/// requiring it be non-empty; it exists only so a host can distinguish a
/// real plugin handshake from a process that happens to share stdio shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloAck {
    pub protocol_version: u32,
    pub cookie: String,
}

/// Every subsequent message is wrapped in an envelope naming which RPC it
/// carries, so a single framed stream can multiplex all four operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "body")]
pub enum Request {
    Authenticate(AuthenticateRequest),
    GetImportSuggestions(GetImportSuggestionsRequest),
    GetSupportedOpenTypes,
    OpenResource(OpenResourceRequest),
    /// Dispense a named capability handle. Requesting "auth" must succeed
    /// for a plugin to load at all; "import_helper" / "resource_opener"
    /// are optional and a failure there is downgraded to "not available".
    DispenseCapability { name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "body")]
pub enum Response {
    Authenticate(AuthenticateResponse),
    GetImportSuggestions(GetImportSuggestionsResponse),
    GetSupportedOpenTypes(GetSupportedOpenTypesResponse),
    OpenResource(OpenResourceResponse),
    DispenseCapability(DispenseCapabilityResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthenticateRequest {
    pub program_config: HashMap<String, String>,
    pub stack_config: HashMap<String, String>,
    pub stack_name: String,
    pub program_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthenticateResponse {
    pub success: bool,
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// `< 0` => always-refresh; `0` => never expires; `> 0` => seconds until expiry.
    pub ttl_seconds: i32,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GetImportSuggestionsRequest {
    pub resource_type: String,
    pub resource_name: String,
    pub resource_urn: String,
    pub parent_urn: String,
    #[serde(default)]
    pub inputs: HashMap<String, String>,
    pub program_config: HashMap<String, String>,
    pub stack_config: HashMap<String, String>,
    pub stack_name: String,
    pub program_name: String,
    /// Only populated when the plugin's declaration sets `use_auth_env = true`.
    #[serde(default)]
    pub auth_env: Option<HashMap<String, String>>,
    #[serde(default)]
    pub provider_urn: String,
    #[serde(default)]
    pub provider_inputs: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImportSuggestionWire {
    pub id: String,
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GetImportSuggestionsResponse {
    pub can_provide: bool,
    #[serde(default)]
    pub suggestions: Vec<ImportSuggestionWire>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GetSupportedOpenTypesResponse {
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenResourceRequest {
    pub resource_type: String,
    pub resource_name: String,
    pub resource_urn: String,
    #[serde(default)]
    pub provider_urn: String,
    #[serde(default)]
    pub provider_inputs: HashMap<String, String>,
    #[serde(default)]
    pub inputs: HashMap<String, String>,
    #[serde(default)]
    pub outputs: HashMap<String, String>,
    pub program_config: HashMap<String, String>,
    pub stack_config: HashMap<String, String>,
    pub stack_name: String,
    pub program_name: String,
    #[serde(default)]
    pub auth_env: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpenActionWire {
    Browser {
        url: String,
    },
    Exec {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenResourceResponse {
    pub can_open: bool,
    #[serde(default)]
    pub action: Option<OpenActionWire>,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseCapabilityResponse {
    pub available: bool,
}
