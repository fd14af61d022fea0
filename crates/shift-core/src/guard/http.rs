//! Guarded outbound HTTP
//!
//! Shift code makes its outbound calls through [`GuardedClient`], which
//! consults the run's network policy before connecting. Live runs pass
//! through; during a dry run every call is denied unless its host is
//! allow-listed. A denied call surfaces as
//! [`ShiftError::ExternalRequestBlocked`] naming the host, never as an
//! error type of the underlying HTTP stack.

use crate::error::{Result, ShiftError};
use crate::guard::allowlist::AllowList;
use reqwest::blocking::{Client, Response};
use std::sync::{Arc, Mutex};

/// Network policy in effect for the process.
#[derive(Debug, Clone, Default)]
pub enum NetworkPolicy {
    /// All outbound calls pass through
    #[default]
    Open,
    /// Deny everything except allow-listed hosts
    DenyExcept(AllowList),
}

/// Shared, swappable network policy.
///
/// The side-effect guard swaps a deny policy in at dry-run entry and
/// restores whatever was there before at exit, so nested guard contexts
/// round-trip correctly.
#[derive(Debug, Default)]
pub struct NetworkSwitch {
    policy: Mutex<NetworkPolicy>,
}

impl NetworkSwitch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Swap the policy, returning the prior one.
    pub fn swap(&self, policy: NetworkPolicy) -> NetworkPolicy {
        let mut current = self.policy.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *current, policy)
    }

    /// Check whether a call to `host` may proceed.
    pub fn check(&self, host: &str) -> Result<()> {
        let policy = self.policy.lock().unwrap_or_else(|e| e.into_inner());
        match &*policy {
            NetworkPolicy::Open => Ok(()),
            NetworkPolicy::DenyExcept(list) if list.allows(host) => Ok(()),
            NetworkPolicy::DenyExcept(_) => Err(ShiftError::ExternalRequestBlocked {
                host: host.to_string(),
            }),
        }
    }

    /// True when a deny policy is currently active.
    pub fn is_guarding(&self) -> bool {
        matches!(
            &*self.policy.lock().unwrap_or_else(|e| e.into_inner()),
            NetworkPolicy::DenyExcept(_)
        )
    }
}

/// HTTP client that enforces the run's network policy.
pub struct GuardedClient {
    client: Client,
    switch: Arc<NetworkSwitch>,
}

impl GuardedClient {
    pub fn new(switch: Arc<NetworkSwitch>) -> Self {
        Self {
            client: Client::new(),
            switch,
        }
    }

    /// Check a URL against the active policy without sending anything.
    pub fn check_allowed(&self, url: &str) -> Result<()> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ShiftError::config(format!("invalid URL '{url}': {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ShiftError::config(format!("URL '{url}' has no host")))?;
        self.switch.check(host)
    }

    /// GET a URL, subject to the active policy.
    pub fn get(&self, url: &str) -> Result<Response> {
        self.check_allowed(url)?;
        Ok(self.client.get(url).send()?)
    }

    /// POST a JSON body to a URL, subject to the active policy.
    pub fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<Response> {
        self.check_allowed(url)?;
        Ok(self.client.post(url).json(body).send()?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_open_policy_allows() {
        let switch = NetworkSwitch::new();
        assert!(switch.check("anywhere.test").is_ok());
        assert!(!switch.is_guarding());
    }

    #[test]
    fn test_deny_policy_blocks_unlisted_host() {
        let switch = NetworkSwitch::new();
        let list = AllowList::union(&["api.example.com".to_string()], &[]);
        switch.swap(NetworkPolicy::DenyExcept(list));

        assert!(switch.check("api.example.com").is_ok());
        let err = switch.check("evil.test").unwrap_err();
        match err {
            ShiftError::ExternalRequestBlocked { host } => assert_eq!(host, "evil.test"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_swap_returns_prior_policy() {
        let switch = NetworkSwitch::new();
        let prior = switch.swap(NetworkPolicy::DenyExcept(AllowList::default()));
        assert!(matches!(prior, NetworkPolicy::Open));
        assert!(switch.is_guarding());

        let prior = switch.swap(NetworkPolicy::Open);
        assert!(matches!(prior, NetworkPolicy::DenyExcept(_)));
        assert!(!switch.is_guarding());
    }

    #[test]
    fn test_guarded_client_blocks_before_connecting() {
        let switch = NetworkSwitch::new();
        switch.swap(NetworkPolicy::DenyExcept(AllowList::default()));
        let client = GuardedClient::new(Arc::clone(&switch));

        // Host does not resolve; the error must come from the guard, not
        // the network stack.
        let err = client
            .get("http://blocked.invalid/endpoint")
            .unwrap_err();
        assert!(matches!(err, ShiftError::ExternalRequestBlocked { .. }));
    }
}
