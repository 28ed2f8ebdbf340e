use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use engagement_core::{TenantId, UserId};

/// The seam to whatever table holds end-user sessions (spec §6.1:
/// "End-user bearer token validated against the user store"). The user
/// store itself is the domain database, out of scope for this core
/// (spec §1) — this trait is the minimal contract C6.1 needs against it.
#[async_trait]
pub trait EndUserTokenStore: Send + Sync {
    /// Resolves a bearer token to the `(user, tenant)` it authenticates,
    /// or `None` if the token is unknown, expired, or revoked.
    async fn resolve(&self, token: &str) -> Option<(UserId, TenantId)>;
}

/// Reference implementation for tests and standalone deployments that
/// don't wire a real session store in: a fixed map of token -> identity.
#[derive(Default)]
pub struct InMemoryUserTokenStore {
    tokens: RwLock<HashMap<String, (UserId, TenantId)>>,
}

impl InMemoryUserTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, token: impl Into<String>, user: UserId, tenant: TenantId) {
        self.tokens.write().unwrap().insert(token.into(), (user, tenant));
    }

    pub fn revoke(&self, token: &str) {
        self.tokens.write().unwrap().remove(token);
    }
}

#[async_trait]
impl EndUserTokenStore for InMemoryUserTokenStore {
    async fn resolve(&self, token: &str) -> Option<(UserId, TenantId)> {
        self.tokens.read().unwrap().get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issued_token_resolves_to_its_identity() {
        let store = InMemoryUserTokenStore::new();
        store.issue("tok-1", UserId::new("alice"), TenantId::new("org1"));
        let resolved = store.resolve("tok-1").await;
        assert_eq!(resolved, Some((UserId::new("alice"), TenantId::new("org1"))));
    }

    #[tokio::test]
    async fn revoked_token_no_longer_resolves() {
        let store = InMemoryUserTokenStore::new();
        store.issue("tok-1", UserId::new("alice"), TenantId::new("org1"));
        store.revoke("tok-1");
        assert_eq!(store.resolve("tok-1").await, None);
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_none() {
        let store = InMemoryUserTokenStore::new();
        assert_eq!(store.resolve("nope").await, None);
    }
}
