use engagement_core::{TenantId, UserId};

/// Who is making the call, resolved per spec §6.1: an end user
/// identified by a bearer token, or one of the two internal callers
/// (service role, or a scheduler authenticating with the shared cron
/// secret).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    EndUser { user: UserId, tenant: TenantId },
    ServiceRole,
    Cron,
}

impl Principal {
    /// True for the two machine callers the fail-closed rule on
    /// internal/cron endpoints is written against (spec §6.1: "if
    /// neither (2) nor (3) is presented ... respond 401").
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::ServiceRole | Self::Cron)
    }

    pub fn tenant(&self) -> Option<&TenantId> {
        match self {
            Self::EndUser { tenant, .. } => Some(tenant),
            Self::ServiceRole | Self::Cron => None,
        }
    }
}
