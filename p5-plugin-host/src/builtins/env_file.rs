// SPDX-License-Identifier: Apache-2.0
//! Environment-file authenticator: resolves one or more sources, a file of
//! `KEY=VALUE` lines, a static mapping, or a command's stdout, into an
//! environment mapping, concatenated in declaration order.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::capabilities::{AuthRequest, AuthResponse, Authenticator};
use crate::config::ConfigValue;

pub const NAME: &str = "env-file";

pub struct EnvFileAuthenticator;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SourceSpec {
    File {
        path: String,
    },
    Static {
        #[serde(default)]
        env: HashMap<String, String>,
    },
    Exec {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        working_dir: Option<String>,
    },
}

#[async_trait]
impl Authenticator for EnvFileAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> AuthResponse {
        // Stack-level config overrides program-level, mirroring the
        // program-over-global precedence ConfigStore applies elsewhere.
        let mut effective: HashMap<String, ConfigValue> = request.program_config.clone();
        for (k, v) in &request.stack_config {
            effective.insert(k.clone(), v.clone());
        }

        let sources = match collect_sources(&effective) {
            Ok(sources) => sources,
            Err(message) => return error_response(message),
        };

        if sources.is_empty() {
            return error_response("env-file plugin requires at least one source".to_owned());
        }

        let mut env = HashMap::new();
        for source in &sources {
            match resolve_source(source).await {
                Ok(resolved) => env.extend(resolved),
                Err(message) => return error_response(message),
            }
        }

        AuthResponse {
            success: true,
            env,
            ttl_seconds: 0,
            error: String::new(),
        }
    }
}

fn error_response(message: String) -> AuthResponse {
    AuthResponse {
        success: false,
        env: HashMap::new(),
        ttl_seconds: 0,
        error: message,
    }
}

/// A single top-level source, or a `sources` array of them.
fn collect_sources(config: &HashMap<String, ConfigValue>) -> Result<Vec<SourceSpec>, String> {
    if let Some(JsonValue::Array(list)) = config.get("sources") {
        return list
            .iter()
            .map(|v| serde_json::from_value(v.clone()).map_err(|e| e.to_string()))
            .collect();
    }

    if config.contains_key("type") {
        let as_object: JsonValue = JsonValue::Object(
            config
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );
        let source = serde_json::from_value(as_object).map_err(|e| e.to_string())?;
        return Ok(vec![source]);
    }

    Ok(Vec::new())
}

async fn resolve_source(source: &SourceSpec) -> Result<HashMap<String, String>, String> {
    match source {
        SourceSpec::Static { env } => Ok(env.clone()),
        SourceSpec::File { path } => {
            let expanded = expand_home(path);
            let text = tokio::fs::read_to_string(&expanded)
                .await
                .map_err(|e| format!("reading '{}': {e}", expanded.display()))?;
            Ok(parse_env_lines(&text))
        }
        SourceSpec::Exec {
            command,
            args,
            working_dir,
        } => {
            let mut cmd = tokio::process::Command::new(command);
            cmd.args(args);
            if let Some(dir) = working_dir {
                cmd.current_dir(expand_home(dir));
            }
            let output = cmd
                .output()
                .await
                .map_err(|e| format!("running '{command}': {e}"))?;
            if !output.status.success() {
                return Err(format!(
                    "'{command}' exited with {}",
                    output.status
                ));
            }
            let text = String::from_utf8_lossy(&output.stdout);
            Ok(parse_env_lines(&text))
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn parse_env_lines(text: &str) -> HashMap<String, String> {
    let mut env = HashMap::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        env.insert(key.trim().to_owned(), strip_matched_quotes(value.trim()));
    }
    env
}

fn strip_matched_quotes(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return value[1..value.len() - 1].to_owned();
        }
    }
    value.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_with(config: HashMap<String, ConfigValue>) -> AuthRequest {
        AuthRequest {
            program_config: config,
            stack_config: HashMap::new(),
            stack_name: "dev".into(),
            program_name: "prog".into(),
        }
    }

    #[test]
    fn parses_key_value_lines_ignoring_blanks_and_comments() {
        let parsed = parse_env_lines(
            "# a comment\n\nFOO=bar\nBAZ=\"quoted\"\nSINGLE='q'\nNOVALUE\n",
        );
        assert_eq!(parsed.get("FOO").unwrap(), "bar");
        assert_eq!(parsed.get("BAZ").unwrap(), "quoted");
        assert_eq!(parsed.get("SINGLE").unwrap(), "q");
        assert!(!parsed.contains_key("NOVALUE"));
    }

    #[tokio::test]
    async fn empty_source_list_is_an_error() {
        let response = EnvFileAuthenticator.authenticate(&request_with(HashMap::new())).await;
        assert!(!response.success);
        assert!(!response.error.is_empty());
    }

    #[tokio::test]
    async fn static_source_is_returned_verbatim() {
        let mut config = HashMap::new();
        config.insert("type".into(), json!("static"));
        config.insert("env".into(), json!({"TOKEN": "abc123"}));
        let response = EnvFileAuthenticator.authenticate(&request_with(config)).await;
        assert!(response.success);
        assert_eq!(response.env.get("TOKEN").unwrap(), "abc123");
    }

    #[tokio::test]
    async fn missing_file_source_is_an_error_response_not_a_panic() {
        let mut config = HashMap::new();
        config.insert("type".into(), json!("file"));
        config.insert("path".into(), json!("/definitely/does/not/exist.env"));
        let response = EnvFileAuthenticator.authenticate(&request_with(config)).await;
        assert!(!response.success);
        assert!(!response.error.is_empty());
    }

    #[tokio::test]
    async fn multiple_sources_merge_in_declaration_order_later_wins() {
        let mut first = HashMap::new();
        first.insert("TOKEN".into(), "first".into());
        let mut second = HashMap::new();
        second.insert("TOKEN".into(), "second".into());
        second.insert("EXTRA".into(), "yes".into());

        let mut config = HashMap::new();
        config.insert(
            "sources".into(),
            json!([
                {"type": "static", "env": first},
                {"type": "static", "env": second},
            ]),
        );

        let response = EnvFileAuthenticator.authenticate(&request_with(config)).await;
        assert!(response.success);
        assert_eq!(response.env.get("TOKEN").unwrap(), "second");
        assert_eq!(response.env.get("EXTRA").unwrap(), "yes");
    }
}
