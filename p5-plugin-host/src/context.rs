// SPDX-License-Identifier: Apache-2.0
//! The context that scopes a round of authentication.

use std::collections::HashMap;
use std::path::PathBuf;

/// The tuple that scopes an authentication round, plus the per-plugin config
/// fingerprints captured the last time `AuthenticateAll` ran, so a later
/// context change can be compared against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub work_dir: PathBuf,
    pub stack_name: String,
    pub program_name: String,
    /// Per-plugin fingerprints covering both program-level and stack-level
    /// config, captured for every declared plugin (even ones whose
    /// authentication failed), so later refresh decisions see the current
    /// configuration.
    pub fingerprints: HashMap<String, String>,
}

impl AuthContext {
    pub fn new(
        work_dir: PathBuf,
        stack_name: impl Into<String>,
        program_name: impl Into<String>,
        fingerprints: HashMap<String, String>,
    ) -> Self {
        AuthContext {
            work_dir,
            stack_name: stack_name.into(),
            program_name: program_name.into(),
            fingerprints,
        }
    }

    pub fn workspace_changed(&self, new_work_dir: &PathBuf) -> bool {
        &self.work_dir != new_work_dir
    }

    pub fn stack_changed(&self, new_stack_name: &str) -> bool {
        self.stack_name != new_stack_name
    }
}
