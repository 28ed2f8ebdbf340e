use axum::http::HeaderMap;
use engagement_core::{CoreError, Result};

use crate::end_user::EndUserTokenStore;
use crate::principal::Principal;

/// The two secrets an internal caller authenticates with (spec §6.1:
/// "a shared service-role bearer token" and "a shared `cron_secret`
/// header for scheduler-triggered endpoints").
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub service_role_token: String,
    pub cron_secret: String,
}

impl AuthConfig {
    pub fn new(service_role_token: impl Into<String>, cron_secret: impl Into<String>) -> Self {
        Self {
            service_role_token: service_role_token.into(),
            cron_secret: cron_secret.into(),
        }
    }

    /// Loads the two secrets from the environment; panics if either is
    /// unset, since an unset secret here would silently fail every
    /// internal/cron call closed rather than open.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("SERVICE_ROLE_TOKEN").expect("SERVICE_ROLE_TOKEN must be set"),
            std::env::var("CRON_SECRET").expect("CRON_SECRET must be set"),
        )
    }
}

const CRON_SECRET_HEADER: &str = "x-cron-secret";

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Constant-time equality so a timing side-channel can't be used to
/// recover the service-role token or cron secret byte by byte.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Resolves one of the two internal principals. Used directly by
/// endpoints that never accept end-user traffic (cron-triggered sync
/// ticks, proactive refresh) as well as as the first branch of
/// [`authenticate`].
pub fn authenticate_internal(headers: &HeaderMap, config: &AuthConfig) -> Result<Principal> {
    if let Some(secret) = headers.get(CRON_SECRET_HEADER).and_then(|v| v.to_str().ok()) {
        if constant_time_eq(secret, &config.cron_secret) {
            return Ok(Principal::Cron);
        }
    }

    if let Some(token) = bearer_token(headers) {
        if constant_time_eq(token, &config.service_role_token) {
            return Ok(Principal::ServiceRole);
        }
    }

    // Fail-closed rule (spec §6.1): if neither the service-role bearer
    // nor the cron_secret header is presented, the caller is rejected
    // outright rather than falling through to end-user auth.
    Err(CoreError::Unauthorized)
}

/// Resolves any of the three principals spec §6.1 defines, preferring
/// the internal callers over end-user bearer validation so a
/// service-role token is never accidentally looked up in the user
/// store.
pub async fn authenticate(
    headers: &HeaderMap,
    config: &AuthConfig,
    users: &dyn EndUserTokenStore,
) -> Result<Principal> {
    if let Ok(internal) = authenticate_internal(headers, config) {
        return Ok(internal);
    }

    let token = bearer_token(headers).ok_or(CoreError::Unauthorized)?;
    let (user, tenant) = users.resolve(token).await.ok_or(CoreError::Unauthorized)?;
    Ok(Principal::EndUser { user, tenant })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::end_user::InMemoryUserTokenStore;
    use axum::http::HeaderValue;
    use engagement_core::{TenantId, UserId};

    fn config() -> AuthConfig {
        AuthConfig::new("service-secret", "cron-secret")
    }

    #[test]
    fn service_role_bearer_resolves_to_service_role() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer service-secret"),
        );
        assert_eq!(authenticate_internal(&headers, &config()).unwrap(), Principal::ServiceRole);
    }

    #[test]
    fn cron_secret_header_resolves_to_cron() {
        let mut headers = HeaderMap::new();
        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static("cron-secret"));
        assert_eq!(authenticate_internal(&headers, &config()).unwrap(), Principal::Cron);
    }

    #[test]
    fn missing_both_fails_closed_with_unauthorized() {
        let headers = HeaderMap::new();
        assert!(matches!(authenticate_internal(&headers, &config()), Err(CoreError::Unauthorized)));
    }

    #[test]
    fn wrong_bearer_token_fails_closed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer not-the-secret"),
        );
        assert!(matches!(authenticate_internal(&headers, &config()), Err(CoreError::Unauthorized)));
    }

    #[tokio::test]
    async fn end_user_bearer_resolves_through_the_user_store() {
        let users = InMemoryUserTokenStore::new();
        users.issue("user-tok", UserId::new("alice"), TenantId::new("org1"));

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer user-tok"),
        );

        let principal = authenticate(&headers, &config(), &users).await.unwrap();
        assert_eq!(
            principal,
            Principal::EndUser {
                user: UserId::new("alice"),
                tenant: TenantId::new("org1"),
            }
        );
    }

    #[tokio::test]
    async fn unknown_bearer_token_is_rejected_not_silently_treated_as_end_user() {
        let users = InMemoryUserTokenStore::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer nonsense"),
        );
        assert!(matches!(authenticate(&headers, &config(), &users).await, Err(CoreError::Unauthorized)));
    }

    #[tokio::test]
    async fn service_role_bearer_never_falls_through_to_user_store_lookup() {
        let users = InMemoryUserTokenStore::new();
        users.issue("service-secret", UserId::new("bob"), TenantId::new("org2"));

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer service-secret"),
        );

        let principal = authenticate(&headers, &config(), &users).await.unwrap();
        assert_eq!(principal, Principal::ServiceRole);
    }
}
