// SPDX-License-Identifier: Apache-2.0
//! `RefreshPolicy`: the pure decision function behind
//! `ShouldRefreshCredentials`.

use crate::config::RefreshTrigger;
use crate::context::AuthContext;

/// Decide whether a plugin's credentials must be refreshed given the
/// previous context (if any), the new context, and that plugin's
/// `RefreshTrigger`. With no previous context, the decision is always
/// "refresh", since there is nothing to compare against.
///
/// Workspace change is checked before stack change; either firing is
/// sufficient.
pub fn should_refresh(
    previous: Option<&AuthContext>,
    new_work_dir: &std::path::Path,
    new_stack_name: &str,
    trigger: RefreshTrigger,
    fingerprint_changed: impl FnOnce() -> bool,
) -> bool {
    let Some(previous) = previous else {
        return true;
    };

    let workspace_changed = previous.work_dir != new_work_dir;
    let stack_changed = previous.stack_name != new_stack_name;

    if workspace_changed && trigger.on_workspace_change() {
        return if trigger.on_config_change() {
            fingerprint_changed()
        } else {
            true
        };
    }

    if stack_changed && trigger.on_stack_change() {
        return if trigger.on_config_change() {
            fingerprint_changed()
        } else {
            true
        };
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn ctx(work_dir: &str, stack: &str) -> AuthContext {
        AuthContext::new(PathBuf::from(work_dir), stack, "pulumi-prog", HashMap::new())
    }

    fn trigger(workspace: bool, stack: bool, config: bool) -> RefreshTrigger {
        RefreshTrigger {
            on_workspace_change: Some(workspace),
            on_stack_change: Some(stack),
            on_config_change: Some(config),
        }
    }

    #[test]
    fn no_previous_context_always_refreshes() {
        assert!(should_refresh(
            None,
            &PathBuf::from("/a"),
            "dev",
            RefreshTrigger::default(),
            || panic!("fingerprint should not be consulted"),
        ));
    }

    #[test]
    fn workspace_change_without_config_gate_always_refreshes() {
        let previous = ctx("/old", "dev");
        let refreshed = should_refresh(
            Some(&previous),
            &PathBuf::from("/new"),
            "dev",
            trigger(true, true, false),
            || panic!("should not consult fingerprint"),
        );
        assert!(refreshed);
    }

    #[test]
    fn refresh_gated_by_fingerprint_when_config_flag_set() {
        // previous "/old", trigger {onWorkspaceChange:true, onConfigChange:true}
        let previous = ctx("/old", "dev");
        let trig = trigger(true, true, true);

        let no_config_change = should_refresh(
            Some(&previous),
            &PathBuf::from("/new"),
            "dev",
            trig,
            || false,
        );
        assert!(!no_config_change);

        let config_changed = should_refresh(
            Some(&previous),
            &PathBuf::from("/new"),
            "dev",
            trig,
            || true,
        );
        assert!(config_changed);
    }

    #[test]
    fn stack_change_without_config_gate_always_refreshes() {
        let previous = ctx("/wd", "dev");
        let refreshed = should_refresh(
            Some(&previous),
            &PathBuf::from("/wd"),
            "prod",
            trigger(true, true, false),
            || panic!("should not consult fingerprint"),
        );
        assert!(refreshed);
    }

    #[test]
    fn stack_change_with_config_gate() {
        let previous = ctx("/wd", "dev");
        let trig = trigger(true, true, true);
        assert!(!should_refresh(Some(&previous), &PathBuf::from("/wd"), "prod", trig, || false));
        assert!(should_refresh(Some(&previous), &PathBuf::from("/wd"), "prod", trig, || true));
    }

    #[test]
    fn neither_changed_means_no_refresh() {
        let previous = ctx("/wd", "dev");
        assert!(!should_refresh(
            Some(&previous),
            &PathBuf::from("/wd"),
            "dev",
            trigger(true, true, false),
            || panic!("should not consult fingerprint"),
        ));
    }

    #[test]
    fn workspace_checked_before_stack_either_firing_suffices() {
        let previous = ctx("/old", "dev");
        // both change, but only workspace trigger is on
        let trig = RefreshTrigger {
            on_workspace_change: Some(true),
            on_stack_change: Some(false),
            on_config_change: Some(false),
        };
        assert!(should_refresh(Some(&previous), &PathBuf::from("/new"), "prod", trig, || false));
    }

    #[test]
    fn disabled_trigger_never_refreshes_on_that_dimension() {
        let previous = ctx("/old", "dev");
        let trig = RefreshTrigger {
            on_workspace_change: Some(false),
            on_stack_change: Some(false),
            on_config_change: Some(false),
        };
        assert!(!should_refresh(Some(&previous), &PathBuf::from("/new"), "prod", trig, || true));
    }
}
