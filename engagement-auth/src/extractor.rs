use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use engagement_core::CoreError;
use serde_json::json;

use crate::end_user::EndUserTokenStore;
use crate::principal::Principal;
use crate::service::{authenticate, authenticate_internal, AuthConfig};

/// What an `AppState` needs to expose for [`InternalOnly`] extraction.
pub trait AuthState {
    fn auth_config(&self) -> &AuthConfig;
}

/// What an `AppState` needs to expose for [`AnyPrincipal`] extraction,
/// i.e. endpoints end users call directly in addition to the two
/// internal callers.
pub trait EndUserAuthState: AuthState {
    fn end_user_store(&self) -> &dyn EndUserTokenStore;
}

fn unauthorized_response() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "error": "unauthorized" })),
    )
}

/// Extracts a [`Principal`] that is guaranteed to be one of the two
/// internal callers (service role or cron), rejecting end users with
/// 401 per the fail-closed rule on internal/cron endpoints (spec §6.1).
pub struct InternalOnly(pub Principal);

impl<S> FromRequestParts<S> for InternalOnly
where
    S: AuthState + Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match authenticate_internal(&parts.headers, state.auth_config()) {
            Ok(principal) => Ok(InternalOnly(principal)),
            Err(CoreError::Unauthorized) => Err(unauthorized_response()),
            Err(_) => Err(unauthorized_response()),
        }
    }
}

/// Extracts any of the three principals spec §6.1 defines: an end
/// user's bearer token validated against the user store, or either
/// internal caller.
pub struct AnyPrincipal(pub Principal);

impl<S> FromRequestParts<S> for AnyPrincipal
where
    S: EndUserAuthState + Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate(&parts.headers, state.auth_config(), state.end_user_store())
            .await
            .map(AnyPrincipal)
            .map_err(|_| unauthorized_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::end_user::InMemoryUserTokenStore;
    use axum::body::Body;
    use axum::http::{header, Request};

    struct TestState {
        auth: AuthConfig,
        users: InMemoryUserTokenStore,
    }

    impl AuthState for TestState {
        fn auth_config(&self) -> &AuthConfig {
            &self.auth
        }
    }

    impl EndUserAuthState for TestState {
        fn end_user_store(&self) -> &dyn EndUserTokenStore {
            &self.users
        }
    }

    #[tokio::test]
    async fn internal_only_rejects_end_user_bearer() {
        let state = TestState {
            auth: AuthConfig::new("svc", "cron"),
            users: InMemoryUserTokenStore::new(),
        };
        state.users.issue(
            "user-tok",
            engagement_core::UserId::new("alice"),
            engagement_core::TenantId::new("org1"),
        );

        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer user-tok")
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = req.into_parts();

        let result = InternalOnly::from_request_parts(&mut parts, &state).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn any_principal_accepts_end_user_bearer() {
        let state = TestState {
            auth: AuthConfig::new("svc", "cron"),
            users: InMemoryUserTokenStore::new(),
        };
        state.users.issue(
            "user-tok",
            engagement_core::UserId::new("alice"),
            engagement_core::TenantId::new("org1"),
        );

        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer user-tok")
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = req.into_parts();

        let AnyPrincipal(principal) = AnyPrincipal::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(matches!(principal, Principal::EndUser { .. }));
    }
}
