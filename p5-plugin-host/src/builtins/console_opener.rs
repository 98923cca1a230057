// SPDX-License-Identifier: Apache-2.0
//! Console-opener built-in: a representative ResourceOpener that
//! needs no credentials of its own (its Authenticator is a no-op success)
//! but knows how to build a cloud-console URL for resource types matching
//! its declared patterns.

use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;

use crate::capabilities::{
    AuthRequest, AuthResponse, Authenticator, OpenAction, OpenResourceRequest,
    OpenResourceResponse, ResourceOpener,
};
use crate::config::ConfigValue;

pub const NAME: &str = "console-opener";

pub struct ConsoleOpener;

#[async_trait]
impl Authenticator for ConsoleOpener {
    /// This plugin opens URLs in a browser; it has no credentials of its
    /// own to vend, so it always succeeds with an empty, never-expiring
    /// environment.
    async fn authenticate(&self, _request: &AuthRequest) -> AuthResponse {
        AuthResponse {
            success: true,
            env: HashMap::new(),
            ttl_seconds: 0,
            error: String::new(),
        }
    }
}

#[async_trait]
impl ResourceOpener for ConsoleOpener {
    async fn get_supported_open_types(&self) -> Vec<String> {
        // A static set, representative of the contract rather than a real
        // cloud provider's resource-type taxonomy.
        vec![
            r"^aws:.*".to_owned(),
            r"^gcp:.*".to_owned(),
            r"^azure:.*".to_owned(),
        ]
    }

    async fn open_resource(&self, request: &OpenResourceRequest) -> OpenResourceResponse {
        let patterns = self.get_supported_open_types().await;
        let matches = patterns.iter().any(|pattern| {
            Regex::new(pattern)
                .map(|re| re.is_match(&request.resource_type))
                .unwrap_or(false)
        });

        if !matches {
            return OpenResourceResponse {
                can_open: false,
                action: None,
                error: None,
            };
        }

        let Some(base_url) = lookup_field(request, "console_base_url") else {
            return OpenResourceResponse {
                can_open: false,
                action: None,
                error: Some("console_base_url is required to build a console link".to_owned()),
            };
        };

        let url = format!(
            "{}/resources/{}",
            base_url.trim_end_matches('/'),
            urlencoding_lite(&request.resource_urn)
        );

        OpenResourceResponse {
            can_open: true,
            action: Some(OpenAction::Browser { url }),
            error: None,
        }
    }
}

/// Priority chain: provider inputs, then stack config, then
/// program config.
fn lookup_field(request: &OpenResourceRequest, key: &str) -> Option<String> {
    if let Some(v) = request.provider_inputs.get(key) {
        return Some(v.clone());
    }
    if let Some(v) = stringify(request.stack_config.get(key)) {
        return Some(v);
    }
    stringify(request.program_config.get(key))
}

fn stringify(value: Option<&ConfigValue>) -> Option<String> {
    value.and_then(|v| v.as_str().map(str::to_owned))
}

/// A minimal, dependency-free percent-encoding sufficient for URN path
/// segments; full RFC 3986 coverage is unnecessary for this example
/// contract.
fn urlencoding_lite(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~') {
                c.to_string()
            } else {
                format!("%{:02X}", c as u32)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(resource_type: &str, fields: HashMap<String, ConfigValue>) -> OpenResourceRequest {
        OpenResourceRequest {
            resource_type: resource_type.to_owned(),
            resource_name: "my-bucket".into(),
            resource_urn: "urn:pulumi:dev::proj::aws:s3/bucket:Bucket::my-bucket".into(),
            provider_urn: String::new(),
            provider_inputs: HashMap::new(),
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            program_config: fields,
            stack_config: HashMap::new(),
            stack_name: "dev".into(),
            program_name: "prog".into(),
            auth_env: None,
        }
    }

    #[tokio::test]
    async fn non_matching_type_is_neutral_not_supported() {
        let response = ConsoleOpener
            .open_resource(&request("kubernetes:core/v1:Pod", HashMap::new()))
            .await;
        assert!(!response.can_open);
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn missing_required_field_is_an_error() {
        let response = ConsoleOpener.open_resource(&request("aws:s3/bucket:Bucket", HashMap::new())).await;
        assert!(!response.can_open);
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn matching_type_with_field_builds_a_browser_action() {
        let mut fields = HashMap::new();
        fields.insert("console_base_url".into(), json!("https://console.aws.amazon.com"));
        let response = ConsoleOpener
            .open_resource(&request("aws:s3/bucket:Bucket", fields))
            .await;
        assert!(response.can_open);
        assert!(matches!(response.action, Some(OpenAction::Browser { .. })));
    }

    #[tokio::test]
    async fn provider_inputs_take_priority_over_program_config() {
        let mut fields = HashMap::new();
        fields.insert("console_base_url".into(), json!("https://wrong.example"));
        let mut req = request("aws:s3/bucket:Bucket", fields);
        req.provider_inputs
            .insert("console_base_url".into(), "https://right.example".into());

        let response = ConsoleOpener.open_resource(&req).await;
        match response.action {
            Some(OpenAction::Browser { url }) => assert!(url.starts_with("https://right.example")),
            other => panic!("expected browser action, got {other:?}"),
        }
    }
}
