use derive_more::{AsRef, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Owning boundary for every row in the system; also the unit of
/// serialization for sync and credential refresh (spec §3, §5).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Display, From, AsRef, Deref, Into, Serialize, Deserialize,
)]
pub struct TenantId(String);

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Display, From, AsRef, Deref, Into, Serialize, Deserialize,
)]
pub struct UserId(String);

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Display, From, AsRef, Deref, Into, Serialize, Deserialize,
)]
pub struct SuggestionId(String);

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Display, From, AsRef, Deref, Into, Serialize, Deserialize,
)]
pub struct FeedbackId(String);

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Display, From, AsRef, Deref, Into, Serialize, Deserialize,
)]
pub struct GlobalTopicId(String);

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Display, From, AsRef, Deref, Into, Serialize, Deserialize,
)]
pub struct WorkQueueItemId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl SuggestionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl FeedbackId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl GlobalTopicId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl WorkQueueItemId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// The set of third-party integration families this core orchestrates.
///
/// Kept as a closed sum type (spec §9: "string-switch action routing"
/// re-architecture note applies equally to integration dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationKind {
    Fathom,
    GoogleWorkspace,
    HubSpot,
    Bullhorn,
    SavvyCal,
    Slack,
    Stripe,
}

impl IntegrationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fathom => "fathom",
            Self::GoogleWorkspace => "google_workspace",
            Self::HubSpot => "hubspot",
            Self::Bullhorn => "bullhorn",
            Self::SavvyCal => "savvycal",
            Self::Slack => "slack",
            Self::Stripe => "stripe",
        }
    }

    /// Integrations whose refresh token decays with use and therefore must
    /// be refreshed unconditionally during `refresh_proactively` rather than
    /// only when nearing expiry (spec §4.1).
    pub fn refresh_token_decays_with_use(&self) -> bool {
        matches!(self, Self::Bullhorn)
    }

    /// Integrations requiring the two-step session-token handshake described
    /// in spec §4.1 ("Bullhorn-style case").
    pub fn requires_session_handshake(&self) -> bool {
        matches!(self, Self::Bullhorn)
    }
}

impl fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the `{integration}` path segment of the §6.1 HTTP surface
/// (e.g. `POST /sync/fathom/tick`) back into the closed sum type.
impl std::str::FromStr for IntegrationKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fathom" => Ok(Self::Fathom),
            "google_workspace" => Ok(Self::GoogleWorkspace),
            "hubspot" => Ok(Self::HubSpot),
            "bullhorn" => Ok(Self::Bullhorn),
            "savvycal" => Ok(Self::SavvyCal),
            "slack" => Ok(Self::Slack),
            "stripe" => Ok(Self::Stripe),
            _ => Err(()),
        }
    }
}

/// Composite identity a credential, sync state, or mapping is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantIntegration {
    pub tenant: TenantId,
    pub integration: IntegrationKind,
}

impl TenantIntegration {
    pub fn new(tenant: TenantId, integration: IntegrationKind) -> Self {
        Self { tenant, integration }
    }
}

/// The closed set of recommendation action kinds (spec §4.4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SendEmail,
    DraftFollowUp,
    CreateTask,
    LogActivity,
    UpdateDeal,
    ScheduleMeeting,
    SendSlackMessage,
}

impl ActionKind {
    /// Has an external, user-visible side effect (spec §4.4.2 routing table,
    /// `never_auto_send` row).
    pub fn has_external_side_effect(&self) -> bool {
        matches!(self, Self::SendEmail | Self::SendSlackMessage | Self::ScheduleMeeting)
    }

    /// Eligible for `auto_execute` in principle (still gated by confidence
    /// and `auto_approve_threshold`).
    pub fn is_auto_executable(&self) -> bool {
        matches!(self, Self::LogActivity | Self::CreateTask)
    }

    pub fn default_always_hitl() -> Vec<ActionKind> {
        vec![Self::SendEmail, Self::SendSlackMessage]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integration_kind_round_trips_through_its_string_form() {
        for kind in [
            IntegrationKind::Fathom,
            IntegrationKind::GoogleWorkspace,
            IntegrationKind::HubSpot,
            IntegrationKind::Bullhorn,
            IntegrationKind::SavvyCal,
            IntegrationKind::Slack,
            IntegrationKind::Stripe,
        ] {
            let parsed: IntegrationKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn unknown_integration_segment_fails_to_parse() {
        assert!("not_a_real_integration".parse::<IntegrationKind>().is_err());
    }
}
