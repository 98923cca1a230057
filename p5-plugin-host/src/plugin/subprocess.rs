// SPDX-License-Identifier: Apache-2.0
//! Adapters that make a subprocess plugin's RPC surface satisfy the same
//! [`Authenticator`]/[`ImportHelper`]/[`ResourceOpener`] traits a built-in
//! implements directly, so `PluginInstance` never branches on built-in-ness.

use std::sync::Arc;

use async_trait::async_trait;
use p5_plugin_protocol::{
    AuthenticateRequest, DispenseCapabilityResponse, GetImportSuggestionsRequest,
    GetSupportedOpenTypesResponse, ImportSuggestionWire, OpenActionWire, OpenResourceRequest,
    Request, Response,
};

use crate::capabilities::{
    AuthRequest, AuthResponse, ImportSuggestion, ImportSuggestionsRequest,
    ImportSuggestionsResponse, OpenAction, OpenResourceResponse,
};
use crate::capabilities::{Authenticator, ImportHelper, ResourceOpener};
use crate::capabilities::OpenResourceRequest as HostOpenResourceRequest;
use crate::error::Result;

use super::process::PluginProcess;
use super::wire::flatten_config;

/// Ask a live subprocess to dispense capability `name`; returns `Ok(true)`
/// when it reports available, `Ok(false)` when it reports unavailable (a
/// normal, non-fatal outcome for optional capabilities), and `Err` for a
/// transport-level failure.
pub(super) async fn dispense(process: &PluginProcess, name: &str) -> Result<bool> {
    let response = process
        .call(Request::DispenseCapability {
            name: name.to_owned(),
        })
        .await?;
    match response {
        Response::DispenseCapability(DispenseCapabilityResponse { available }) => Ok(available),
        _ => Ok(false),
    }
}

pub struct SubprocessAuthenticator {
    process: Arc<PluginProcess>,
}

impl SubprocessAuthenticator {
    pub fn new(process: Arc<PluginProcess>) -> Self {
        SubprocessAuthenticator { process }
    }
}

#[async_trait]
impl Authenticator for SubprocessAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> AuthResponse {
        let wire_request = AuthenticateRequest {
            program_config: flatten_config(&request.program_config),
            stack_config: flatten_config(&request.stack_config),
            stack_name: request.stack_name.clone(),
            program_name: request.program_name.clone(),
        };

        match self.process.call(Request::Authenticate(wire_request)).await {
            Ok(Response::Authenticate(resp)) => AuthResponse {
                success: resp.success,
                env: resp.env,
                ttl_seconds: resp.ttl_seconds,
                error: resp.error,
            },
            Ok(_) => AuthResponse {
                success: false,
                env: Default::default(),
                ttl_seconds: 0,
                error: format!("plugin '{}' returned an unexpected response shape", self.process.name()),
            },
            Err(e) => AuthResponse {
                success: false,
                env: Default::default(),
                ttl_seconds: 0,
                error: e.to_string(),
            },
        }
    }
}

pub struct SubprocessImportHelper {
    process: Arc<PluginProcess>,
}

impl SubprocessImportHelper {
    pub fn new(process: Arc<PluginProcess>) -> Self {
        SubprocessImportHelper { process }
    }
}

#[async_trait]
impl ImportHelper for SubprocessImportHelper {
    async fn get_import_suggestions(
        &self,
        request: &ImportSuggestionsRequest,
    ) -> ImportSuggestionsResponse {
        let wire_request = GetImportSuggestionsRequest {
            resource_type: request.resource_type.clone(),
            resource_name: request.resource_name.clone(),
            resource_urn: request.resource_urn.clone(),
            parent_urn: request.parent_urn.clone(),
            inputs: request.inputs.clone(),
            program_config: flatten_config(&request.program_config),
            stack_config: flatten_config(&request.stack_config),
            stack_name: request.stack_name.clone(),
            program_name: request.program_name.clone(),
            auth_env: request.auth_env.clone(),
            provider_urn: request.provider_urn.clone(),
            provider_inputs: request.provider_inputs.clone(),
        };

        match self
            .process
            .call(Request::GetImportSuggestions(wire_request))
            .await
        {
            Ok(Response::GetImportSuggestions(resp)) => ImportSuggestionsResponse {
                can_provide: resp.can_provide,
                suggestions: resp
                    .suggestions
                    .into_iter()
                    .map(|ImportSuggestionWire { id, label, description }| ImportSuggestion {
                        id,
                        label,
                        description,
                    })
                    .collect(),
                error: (!resp.error.is_empty()).then_some(resp.error),
            },
            Ok(_) => ImportSuggestionsResponse {
                can_provide: false,
                suggestions: Vec::new(),
                error: Some(format!(
                    "plugin '{}' returned an unexpected response shape",
                    self.process.name()
                )),
            },
            Err(e) => ImportSuggestionsResponse {
                can_provide: false,
                suggestions: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

pub struct SubprocessResourceOpener {
    process: Arc<PluginProcess>,
}

impl SubprocessResourceOpener {
    pub fn new(process: Arc<PluginProcess>) -> Self {
        SubprocessResourceOpener { process }
    }
}

#[async_trait]
impl ResourceOpener for SubprocessResourceOpener {
    async fn get_supported_open_types(&self) -> Vec<String> {
        match self.process.call(Request::GetSupportedOpenTypes).await {
            Ok(Response::GetSupportedOpenTypes(GetSupportedOpenTypesResponse { patterns })) => {
                patterns
            }
            _ => Vec::new(),
        }
    }

    async fn open_resource(&self, request: &HostOpenResourceRequest) -> OpenResourceResponse {
        let wire_request = OpenResourceRequest {
            resource_type: request.resource_type.clone(),
            resource_name: request.resource_name.clone(),
            resource_urn: request.resource_urn.clone(),
            provider_urn: request.provider_urn.clone(),
            provider_inputs: request.provider_inputs.clone(),
            inputs: request.inputs.clone(),
            outputs: request.outputs.clone(),
            program_config: flatten_config(&request.program_config),
            stack_config: flatten_config(&request.stack_config),
            stack_name: request.stack_name.clone(),
            program_name: request.program_name.clone(),
            auth_env: request.auth_env.clone(),
        };

        match self.process.call(Request::OpenResource(wire_request)).await {
            Ok(Response::OpenResource(resp)) => OpenResourceResponse {
                can_open: resp.can_open,
                action: resp.action.map(|action| match action {
                    OpenActionWire::Browser { url } => OpenAction::Browser { url },
                    OpenActionWire::Exec { command, args, env } => {
                        OpenAction::Exec { command, args, env }
                    }
                }),
                error: (!resp.error.is_empty()).then_some(resp.error),
            },
            Ok(_) => OpenResourceResponse {
                can_open: false,
                action: None,
                error: Some(format!(
                    "plugin '{}' returned an unexpected response shape",
                    self.process.name()
                )),
            },
            Err(e) => OpenResourceResponse {
                can_open: false,
                action: None,
                error: Some(e.to_string()),
            },
        }
    }
}
