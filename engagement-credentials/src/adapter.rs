use async_trait::async_trait;
use chrono::Duration;
use serde_json::Value;

/// The result of a successful provider token exchange (spec §4.1
/// "provider adapter supplying `refresh(refresh_secret) -> (access_secret,
/// new_refresh_secret?, expires_in, extra_metadata?)`").
#[derive(Debug, Clone)]
pub struct RefreshedCredential {
    pub access_secret: String,
    pub new_refresh_secret: Option<String>,
    pub expires_in: Duration,
    pub extra_metadata: Option<Value>,
    /// Second-stage session token for two-step handshake integrations
    /// (the "Bullhorn-style case", spec §4.1).
    pub session_token: Option<String>,
    pub endpoint_hint: Option<String>,
}

/// Classification an adapter must produce for any refresh failure so C1
/// never has to interpret upstream-specific error shapes (spec §7:
/// "every error crossing a boundary is one of the kinds above").
#[derive(Debug, Clone)]
pub enum AdapterError {
    /// Network timeout, 5xx, rate limiting — caller MAY retry.
    Transient(String),
    /// Explicit revocation ("invalid_grant", expired/revoked token) — the
    /// credential transitions to `needs_reconnect` atomically (spec
    /// §4.1).
    Permanent(String),
}

impl AdapterError {
    pub fn message(&self) -> &str {
        match self {
            Self::Transient(m) | Self::Permanent(m) => m,
        }
    }
}

/// One per `IntegrationKind`. Adapters never see the credential store —
/// they only know how to turn a refresh secret into a new access secret
/// (spec §9: "pass explicit capability bundles ... through call
/// context").
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn refresh(
        &self,
        refresh_secret: &str,
    ) -> std::result::Result<RefreshedCredential, AdapterError>;

    /// Two-step handshakes (spec §4.1) additionally exchange the fresh
    /// access secret for a tenant-scoped session token; adapters that
    /// don't require this simply return `Ok(None)`.
    async fn exchange_session(
        &self,
        _access_secret: &str,
    ) -> std::result::Result<Option<(String, String)>, AdapterError> {
        Ok(None)
    }

    /// The initial OAuth authorization-code exchange behind `GET
    /// /oauth/{integration}/callback` (spec §6.1). Distinct from
    /// `refresh`, which only ever turns a refresh secret back into an
    /// access secret for an already-connected tenant. Adapters that the
    /// deployment hasn't wired a real code exchange for reject the
    /// connect attempt rather than silently no-op.
    async fn exchange_code(
        &self,
        _code: &str,
        _redirect_uri: &str,
        _pkce_verifier: Option<&str>,
    ) -> std::result::Result<RefreshedCredential, AdapterError> {
        Err(AdapterError::Permanent("code exchange not supported by this adapter".into()))
    }
}
