// SPDX-License-Identifier: Apache-2.0
//! `Aggregator`: fan-out-gather-all for import suggestions, fan-out
//! first-success for resource opening.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::capabilities::{
    ImportHelper, ImportSuggestion, ImportSuggestionsRequest, OpenResourceRequest,
    OpenResourceResponse, ResourceOpener,
};

#[derive(Debug, Clone)]
pub struct SuggestionOutcome {
    pub plugin_name: String,
    pub suggestion: ImportSuggestion,
}

/// One plugin's populated capability slot, its already-scoped request (the
/// caller's resource fields plus that plugin's own program/stack config),
/// and whether its declaration set `use_auth_env`.
pub struct Candidate<T: ?Sized, R> {
    pub plugin_name: String,
    pub capability: Arc<T>,
    pub request: R,
    pub use_auth_env: bool,
}

/// Fan out to every candidate concurrently; discard "cannot provide" and
/// errored responses; a panicking task is equivalent to an error for that
/// plugin and does not affect the others.
pub async fn gather_import_suggestions(
    candidates: Vec<Candidate<dyn ImportHelper, ImportSuggestionsRequest>>,
    merged_auth_env: &HashMap<String, String>,
) -> Vec<SuggestionOutcome> {
    let mut join_set = JoinSet::new();

    for candidate in candidates {
        let mut req = candidate.request;
        req.auth_env = candidate.use_auth_env.then(|| merged_auth_env.clone());
        let plugin_name = candidate.plugin_name;
        let helper = candidate.capability;
        join_set.spawn(async move {
            let response = helper.get_import_suggestions(&req).await;
            (plugin_name, response)
        });
    }

    let mut out = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        let Ok((plugin_name, response)) = joined else {
            continue;
        };
        if !response.can_provide || response.error.is_some() {
            continue;
        }
        out.extend(response.suggestions.into_iter().map(|suggestion| SuggestionOutcome {
            plugin_name: plugin_name.clone(),
            suggestion,
        }));
    }

    out
}

/// Iterate candidates in declared order and return the first whose
/// response reports "can open"; an error skips that candidate rather than
/// aborting the iteration. Iteration is sequential, not concurrent, because
/// "first" is meaningful only under a fixed order, and a fan-out here would
/// make the result depend on completion timing.
pub async fn open_resource(
    candidates: Vec<Candidate<dyn ResourceOpener, OpenResourceRequest>>,
    merged_auth_env: &HashMap<String, String>,
) -> Option<(String, OpenResourceResponse)> {
    for candidate in candidates {
        let mut req = candidate.request;
        req.auth_env = candidate.use_auth_env.then(|| merged_auth_env.clone());
        let response = candidate.capability.open_resource(&req).await;
        if response.error.is_some() {
            continue;
        }
        if response.can_open {
            return Some((candidate.plugin_name, response));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::OpenAction;
    use async_trait::async_trait;

    struct CannotOpen;
    #[async_trait]
    impl ResourceOpener for CannotOpen {
        async fn get_supported_open_types(&self) -> Vec<String> {
            Vec::new()
        }
        async fn open_resource(&self, _request: &OpenResourceRequest) -> OpenResourceResponse {
            OpenResourceResponse {
                can_open: false,
                action: None,
                error: None,
            }
        }
    }

    struct OpensWithUrl(&'static str);
    #[async_trait]
    impl ResourceOpener for OpensWithUrl {
        async fn get_supported_open_types(&self) -> Vec<String> {
            Vec::new()
        }
        async fn open_resource(&self, _request: &OpenResourceRequest) -> OpenResourceResponse {
            OpenResourceResponse {
                can_open: true,
                action: Some(OpenAction::Browser {
                    url: self.0.to_owned(),
                }),
                error: None,
            }
        }
    }

    #[tokio::test]
    async fn first_success_wins_without_requiring_later_candidates_consulted() {
        // A can't open, B can (browser url), C would also succeed but
        // must not be required to have been consulted.
        let candidates: Vec<Candidate<dyn ResourceOpener, OpenResourceRequest>> = vec![
            Candidate {
                plugin_name: "A".into(),
                capability: Arc::new(CannotOpen),
                request: OpenResourceRequest::default(),
                use_auth_env: false,
            },
            Candidate {
                plugin_name: "B".into(),
                capability: Arc::new(OpensWithUrl("https://example.com/b")),
                request: OpenResourceRequest::default(),
                use_auth_env: false,
            },
            Candidate {
                plugin_name: "C".into(),
                capability: Arc::new(OpensWithUrl("https://example.com/c")),
                request: OpenResourceRequest::default(),
                use_auth_env: false,
            },
        ];

        let result = open_resource(candidates, &HashMap::new()).await;
        let (plugin_name, response) = result.expect("B should have opened it");
        assert_eq!(plugin_name, "B");
        assert_eq!(
            response.action,
            Some(OpenAction::Browser {
                url: "https://example.com/b".to_owned()
            })
        );
    }

    #[tokio::test]
    async fn no_candidate_can_open_yields_none() {
        let candidates: Vec<Candidate<dyn ResourceOpener, OpenResourceRequest>> = vec![Candidate {
            plugin_name: "A".into(),
            capability: Arc::new(CannotOpen),
            request: OpenResourceRequest::default(),
            use_auth_env: false,
        }];
        let result = open_resource(candidates, &HashMap::new()).await;
        assert!(result.is_none());
    }
}
