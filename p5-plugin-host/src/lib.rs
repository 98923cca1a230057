// SPDX-License-Identifier: Apache-2.0
//! Plugin-host core: config loading/merging, plugin lifecycle (built-in and
//! subprocess), TTL-cached authentication, and capability aggregation for
//! an infrastructure-as-code CLI companion.
//!
//! [`Manager`] is the single entry point everything above this crate talks
//! to; [`builtins::register_builtin_plugins`] must be called once at
//! process start before the first [`Manager::initialize`], the way
//! `register_builtin_providers` is an explicit call in a provider-registry
//! system rather than something that happens automatically at link time.

pub mod aggregator;
pub mod builtins;
pub mod capabilities;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
mod plugin;
pub mod refresh;
mod registry;

mod manager;

pub use aggregator::{Candidate, SuggestionOutcome};
pub use capabilities::{
    AuthRequest, AuthResponse, Authenticator, ImportHelper, ImportSuggestion,
    ImportSuggestionsRequest, ImportSuggestionsResponse, OpenAction, OpenResourceRequest,
    OpenResourceResponse, ResourceOpener,
};
pub use config::{ConfigStore, ConfigValue, MergedConfig, PluginConfig, RefreshTrigger, StackOverlay};
pub use context::AuthContext;
pub use credentials::{CredentialStore, Credentials};
pub use error::{Error, Result};
pub use manager::{AuthOutcome, CredentialsSummaryEntry, Manager, PerPluginResult};
pub use plugin::PluginInstance;
pub use registry::{register, with_test_registry, BuiltinPlugin};
