// SPDX-License-Identifier: Apache-2.0
//! The error taxonomy for the plugin host.
//!
//! Four kinds of failure are distinguished because they carry different
//! fatality: configuration errors and plugin-load errors abort the whole
//! `Initialize` call, authentication errors and aggregator errors are
//! recorded per-plugin and never abort a batch.

use std::path::PathBuf;

/// `Result` which uses [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An unparseable or malformed global/program/stack configuration file.
    /// Fatal at `Initialize`: no state is installed.
    #[error("configuration error{}: {source}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Config {
        path: Option<PathBuf>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A plugin failed to come up at all: missing built-in, subprocess spawn
    /// failure, handshake mismatch, or an undispensable Authenticator.
    /// Fatal for the whole load; earlier successful loads are rolled back.
    #[error("failed to load plugin '{plugin}': {source}")]
    PluginLoad {
        plugin: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Composite form of `PluginLoad` describing a batch that failed partway
    /// through, after some plugins had already started.
    #[error("plugin load failed, rolled back {rolled_back} already-started plugin(s): {source}")]
    PluginLoadBatch {
        rolled_back: usize,
        #[source]
        source: Box<Error>,
    },

    /// A plugin raised or returned `success = false` during authentication.
    /// Recorded per-plugin; never fatal to the batch.
    #[error("authentication failed for plugin '{plugin}': {message}")]
    Auth { plugin: String, message: String },

    /// The plugin declared in config has no `cmd` and is not a registered
    /// built-in, so it is unrunnable. Caught at load time rather than at
    /// spawn time.
    #[error("plugin '{0}' has no command and is not a registered built-in")]
    UnrunnablePlugin(String),

    /// `cmd`, `working_dir`, or plugin capability dispense that could not be
    /// resolved to anything sensible.
    #[error("plugin '{plugin}' capability '{capability}' could not be dispensed: {message}")]
    CapabilityUnavailable {
        plugin: String,
        capability: String,
        message: String,
    },

    /// A call raced a concurrent `close` and lost: the subprocess's stdio
    /// was already torn down, or the call arrived after shutdown began.
    #[error("plugin '{0}' is closed")]
    PluginClosed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("plugin transport error: {0}")]
    Transport(#[from] p5_plugin_protocol::FramingError),

    #[error("plugin handshake error: {0}")]
    Handshake(#[from] p5_plugin_protocol::HandshakeError),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config<E>(path: Option<PathBuf>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Config {
            path,
            source: Box::new(source),
        }
    }

    pub fn plugin_load<E>(plugin: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::PluginLoad {
            plugin: plugin.into(),
            source: Box::new(source),
        }
    }

    pub fn auth(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Auth {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_includes_path() {
        let err = Error::config(
            Some(PathBuf::from("/tmp/Pulumi.dev.yaml")),
            std::io::Error::new(std::io::ErrorKind::Other, "bad yaml"),
        );
        let msg = err.to_string();
        assert!(msg.contains("Pulumi.dev.yaml"));
    }

    #[test]
    fn auth_error_names_plugin() {
        let err = Error::auth("aws", "invalid credentials");
        assert!(err.to_string().contains("aws"));
        assert!(err.to_string().contains("invalid credentials"));
    }
}
