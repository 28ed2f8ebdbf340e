use std::fmt;

/// The abstract error taxonomy every component boundary converts into
/// before the error is allowed to cross a crate boundary (spec §7).
///
/// No component-specific error type (`CredentialError`, `SyncError`, ...)
/// is ever surfaced past its own crate; each carries a `From` conversion
/// into this taxonomy instead, the way `adk-mistralrs::MistralRsError`
/// wraps engine-specific failures behind one classified enum.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not connected: no {integration} credential for tenant {tenant}")]
    NotConnected { tenant: String, integration: String },

    #[error("needs reconnect: {reason}")]
    NeedsReconnect { reason: String },

    #[error("conflict skipped: {0}")]
    ConflictSkipped(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("permanent failure: {0}")]
    Permanent(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_connected(tenant: impl Into<String>, integration: impl Into<String>) -> Self {
        Self::NotConnected {
            tenant: tenant.into(),
            integration: integration.into(),
        }
    }

    pub fn needs_reconnect(reason: impl Into<String>) -> Self {
        Self::NeedsReconnect {
            reason: reason.into(),
        }
    }

    pub fn conflict_skipped(msg: impl Into<String>) -> Self {
        Self::ConflictSkipped(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Permanent(msg.into())
    }

    /// Batch operations (C1 proactive refresh, C2 tick, C5 aggregation)
    /// classify and continue rather than abort; this tells the caller
    /// whether the batch loop should retry this item later.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Whether a scheduled job should retry this failure with backoff
    /// (spec §7 propagation policy).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Unauthorized => ErrorCategory::Unauthorized,
            Self::Forbidden(_) => ErrorCategory::Forbidden,
            Self::NotConnected { .. } => ErrorCategory::NotConnected,
            Self::NeedsReconnect { .. } => ErrorCategory::NeedsReconnect,
            Self::ConflictSkipped(_) => ErrorCategory::ConflictSkipped,
            Self::Transient(_) => ErrorCategory::Transient,
            Self::Permanent(_) => ErrorCategory::Permanent,
            Self::Other(_) => ErrorCategory::Permanent,
        }
    }

    /// The HTTP status `engagement-server` maps this onto (spec §6.1).
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized => 401,
            Self::Forbidden(_) => 403,
            Self::NotConnected { .. } => 404,
            Self::NeedsReconnect { .. } => 409,
            Self::ConflictSkipped(_) => 200,
            Self::Transient(_) => 429,
            Self::Permanent(_) => 500,
            Self::Other(_) => 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Unauthorized,
    Forbidden,
    NotConnected,
    NeedsReconnect,
    ConflictSkipped,
    Transient,
    Permanent,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotConnected => "not_connected",
            Self::NeedsReconnect => "needs_reconnect",
            Self::ConflictSkipped => "conflict_skipped",
            Self::Transient => "transient",
            Self::Permanent => "permanent",
        };
        f.write_str(s)
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_recoverable_and_retryable() {
        let e = CoreError::transient("upstream timeout");
        assert!(e.is_recoverable());
        assert!(e.is_retryable());
        assert_eq!(e.http_status(), 429);
    }

    #[test]
    fn permanent_is_not_recoverable() {
        let e = CoreError::permanent("signature mismatch");
        assert!(!e.is_recoverable());
        assert!(!e.is_retryable());
    }

    #[test]
    fn conflict_skipped_is_not_a_user_facing_error() {
        let e = CoreError::conflict_skipped("internal newer");
        assert_eq!(e.http_status(), 200);
        assert_eq!(e.category(), ErrorCategory::ConflictSkipped);
    }

    #[test]
    fn needs_reconnect_maps_to_409() {
        let e = CoreError::needs_reconnect("invalid_grant");
        assert_eq!(e.http_status(), 409);
    }
}
