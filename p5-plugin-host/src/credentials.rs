// SPDX-License-Identifier: Apache-2.0
//! `Credentials` and the in-memory `CredentialStore`.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

/// One plugin's authenticated environment, with its expiry policy.
///
/// `expires_at = None` means "never expires" (the wire's `ttl_seconds == 0`);
/// `always_refresh` means "treated as expired on every check regardless of
/// `expires_at`" (the wire's `ttl_seconds < 0`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub plugin_name: String,
    pub env: HashMap<String, String>,
    pub expires_at: Option<SystemTime>,
    pub always_refresh: bool,
}

impl Credentials {
    /// Build `Credentials` from a TTL hint per the wire encoding:
    /// `< 0` => always-refresh, `0` => never expires, `> 0` => seconds from
    /// `now` until expiry.
    pub fn from_ttl(
        plugin_name: impl Into<String>,
        env: HashMap<String, String>,
        ttl_seconds: i32,
        now: SystemTime,
    ) -> Self {
        let (expires_at, always_refresh) = match ttl_seconds.cmp(&0) {
            std::cmp::Ordering::Less => (None, true),
            std::cmp::Ordering::Equal => (None, false),
            std::cmp::Ordering::Greater => {
                (Some(now + Duration::from_secs(ttl_seconds as u64)), false)
            }
        };
        Credentials {
            plugin_name: plugin_name.into(),
            env,
            expires_at,
            always_refresh,
        }
    }

    /// `isExpired = alwaysRefresh || (expiresAt != zero && now > expiresAt)`.
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.always_refresh || self.expires_at.is_some_and(|at| now > at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }
}

/// In-memory mapping from plugin name to its current `Credentials`. All
/// mutation goes through `Manager`'s single-writer discipline; this type
/// itself imposes no locking, it is the payload the lock in `manager`
/// guards.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    entries: HashMap<String, Credentials>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, plugin_name: &str) -> Option<&Credentials> {
        self.entries.get(plugin_name)
    }

    /// A cache hit: present and not expired as of `now`.
    pub fn has_fresh(&self, plugin_name: &str, now: SystemTime) -> bool {
        self.entries
            .get(plugin_name)
            .is_some_and(|c| !c.is_expired_at(now))
    }

    pub fn upsert(&mut self, credentials: Credentials) {
        self.entries.insert(credentials.plugin_name.clone(), credentials);
    }

    pub fn remove(&mut self, plugin_name: &str) {
        self.entries.remove(plugin_name);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credentials> {
        self.entries.values()
    }

    pub fn plugin_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `GetMergedAuthEnv`: concatenate the env of every non-expired record
    /// (always-refresh records still count as current until the next
    /// refresh). Key collisions resolve last-writer-wins under unspecified
    /// iteration order.
    pub fn merged_auth_env(&self, now: SystemTime) -> HashMap<String, String> {
        let mut merged = HashMap::new();
        for creds in self.entries.values() {
            if creds.always_refresh || !creds.is_expired_at(now) {
                for (k, v) in &creds.env {
                    merged.insert(k.clone(), v.clone());
                }
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn always_refresh_is_expired_regardless_of_expires_at() {
        let now = SystemTime::now();
        let creds = Credentials {
            plugin_name: "aws".into(),
            env: HashMap::new(),
            expires_at: Some(now + Duration::from_secs(3600)),
            always_refresh: true,
        };
        assert!(creds.is_expired_at(now));
    }

    #[test]
    fn never_expires_when_no_expiry_and_not_always_refresh() {
        let now = SystemTime::now();
        let creds = Credentials {
            plugin_name: "aws".into(),
            env: HashMap::new(),
            expires_at: None,
            always_refresh: false,
        };
        assert!(!creds.is_expired_at(now));
    }

    #[test]
    fn past_expiry_is_expired_future_expiry_is_not() {
        let now = SystemTime::now();
        let past = Credentials {
            plugin_name: "aws".into(),
            env: HashMap::new(),
            expires_at: Some(now - Duration::from_secs(1)),
            always_refresh: false,
        };
        let future = Credentials {
            plugin_name: "aws".into(),
            env: HashMap::new(),
            expires_at: Some(now + Duration::from_secs(1)),
            always_refresh: false,
        };
        assert!(past.is_expired_at(now));
        assert!(!future.is_expired_at(now));
    }

    #[test]
    fn ttl_encoding_maps_sign_to_expiry_policy() {
        let now = SystemTime::now();
        let negative = Credentials::from_ttl("p", env(&[]), -1, now);
        assert!(negative.always_refresh);
        assert!(negative.is_expired_at(now));

        let zero = Credentials::from_ttl("p", env(&[]), 0, now);
        assert!(!zero.always_refresh);
        assert_eq!(zero.expires_at, None);
        assert!(!zero.is_expired_at(now));

        let hour = Credentials::from_ttl("p", env(&[]), 3600, now);
        assert_eq!(hour.expires_at, Some(now + Duration::from_secs(3600)));
        assert!(!hour.is_expired_at(now));
        assert!(hour.is_expired_at(now + Duration::from_secs(3601)));
    }

    #[test]
    fn merged_env_is_keywise_union_excluding_expired() {
        let now = SystemTime::now();
        let mut store = CredentialStore::new();
        store.upsert(Credentials {
            plugin_name: "aws".into(),
            env: env(&[("AWS_REGION", "us-west-2")]),
            expires_at: None,
            always_refresh: false,
        });
        store.upsert(Credentials {
            plugin_name: "stale".into(),
            env: env(&[("STALE_TOKEN", "x")]),
            expires_at: Some(now - Duration::from_secs(10)),
            always_refresh: false,
        });
        store.upsert(Credentials {
            plugin_name: "always".into(),
            env: env(&[("ALWAYS_TOKEN", "y")]),
            expires_at: None,
            always_refresh: true,
        });

        let merged = store.merged_auth_env(now);
        assert_eq!(merged.get("AWS_REGION").unwrap(), "us-west-2");
        assert_eq!(merged.get("ALWAYS_TOKEN").unwrap(), "y");
        assert!(!merged.contains_key("STALE_TOKEN"));
    }

    #[test]
    fn has_fresh_reflects_cache_hit_semantics() {
        let now = SystemTime::now();
        let mut store = CredentialStore::new();
        assert!(!store.has_fresh("aws", now));
        store.upsert(Credentials::from_ttl("aws", env(&[]), 3600, now));
        assert!(store.has_fresh("aws", now));
        store.remove("aws");
        assert!(!store.has_fresh("aws", now));
    }
}
